//! Flat, fixed-size address space shared by code, data and the dictionary.
//!
//! All access goes through bounds-checked byte/cell reads and writes on integer
//! offsets. The bytes live either in a memory-mapped image file or, for tests and
//! dry runs, in an owned buffer.

use log::debug;
use memmap2::MmapMut;

use crate::error::VmError;
use crate::header::{Header, NVRAM_HEADER};

/// Machine word: an unsigned 16-bit cell, stored little-endian.
pub type Cell = u16;

/// Size of a cell in bytes
pub const CELL_SIZE: usize = std::mem::size_of::<Cell>();

/// Largest address space a cell can address.
pub const MAX_MEMORY_SIZE: usize = Cell::MAX as usize + 1;

/// Memory must hold the header plus at least one byte of code, and every address
/// must fit in a cell.
pub fn check_size(size: usize) -> Result<(), VmError> {
    if size <= NVRAM_HEADER || size > MAX_MEMORY_SIZE {
        return Err(VmError::Config(format!(
            "memory size 0x{:x} must be in 0x{:x}..=0x{:x}",
            size,
            NVRAM_HEADER + 1,
            MAX_MEMORY_SIZE
        )));
    }
    Ok(())
}

/// Where the bytes of an address space live
#[derive(Debug)]
pub enum Backing {
    /// Shared mapping of an image file; writes reach the file when pages are flushed
    Mapped(MmapMut),
    /// Private heap buffer, not persisted
    Owned(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Mapped(map) => &map[..],
            Backing::Owned(vec) => &vec[..],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Backing::Mapped(map) => &mut map[..],
            Backing::Owned(vec) => &mut vec[..],
        }
    }
}

/// The VM address space together with its three cursors.
#[derive(Debug)]
pub struct AddressSpace {
    backing: Backing,
    /// Live cursor values; the header region only holds them after a checkpoint
    pub cursors: Header,
}

impl AddressSpace {
    /// Wrap an existing backing store. The cursors start out fresh.
    pub fn new(backing: Backing) -> Result<Self, VmError> {
        check_size(backing.bytes().len())?;
        Ok(AddressSpace {
            backing,
            cursors: Header::fresh(),
        })
    }

    /// A zero-filled, heap-backed address space
    pub fn anonymous(size: usize) -> Result<Self, VmError> {
        AddressSpace::new(Backing::Owned(vec![0; size]))
    }

    /// Capacity in bytes (`Msz`)
    pub fn size(&self) -> usize {
        self.backing.bytes().len()
    }

    pub fn bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.backing, Backing::Mapped(_))
    }

    /// Fail unless `[addr, addr + width)` lies inside the address space.
    pub fn check(&self, addr: usize, width: usize) -> Result<(), VmError> {
        let size = self.size();
        match addr.checked_add(width) {
            Some(end) if end <= size => Ok(()),
            _ => Err(VmError::OutOfBounds { addr, width, size }),
        }
    }

    pub fn read_byte(&self, addr: usize) -> Result<u8, VmError> {
        self.check(addr, 1)?;
        Ok(self.backing.bytes()[addr])
    }

    pub fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), VmError> {
        self.check(addr, 1)?;
        self.backing.bytes_mut()[addr] = value;
        Ok(())
    }

    pub fn read_cell(&self, addr: usize) -> Result<Cell, VmError> {
        self.check(addr, CELL_SIZE)?;
        let bytes = self.backing.bytes();
        Ok(Cell::from_le_bytes([bytes[addr], bytes[addr + 1]]))
    }

    pub fn write_cell(&mut self, addr: usize, value: Cell) -> Result<(), VmError> {
        self.check(addr, CELL_SIZE)?;
        self.backing.bytes_mut()[addr..addr + CELL_SIZE].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Reserve `width` bytes at `Cp` and advance it. `Cp` must remain addressable
    /// afterwards, so the final byte of memory is never handed out.
    fn reserve(&mut self, width: usize) -> Result<usize, VmError> {
        let at = self.cursors.cp as usize;
        let size = self.size();
        if at + width >= size {
            return Err(VmError::OutOfBounds {
                addr: at,
                width,
                size,
            });
        }
        self.cursors.cp = (at + width) as Cell;
        Ok(at)
    }

    /// Append a byte at `Cp`, returning the address it was written to
    pub fn compile_byte(&mut self, value: u8) -> Result<usize, VmError> {
        let at = self.reserve(1)?;
        self.backing.bytes_mut()[at] = value;
        Ok(at)
    }

    /// Append a cell at `Cp`, returning the address it was written to
    pub fn compile_cell(&mut self, value: Cell) -> Result<usize, VmError> {
        let at = self.reserve(CELL_SIZE)?;
        self.backing.bytes_mut()[at..at + CELL_SIZE].copy_from_slice(&value.to_le_bytes());
        Ok(at)
    }

    /// Overwrite the whole region with `value`
    pub fn fill(&mut self, value: u8) {
        self.backing.bytes_mut().fill(value);
    }

    /// Write the cursors into the header region and, for a mapped image, sync the
    /// mapping to the file.
    pub fn checkpoint(&mut self) -> Result<(), VmError> {
        let cursors = self.cursors;
        cursors.store(self)?;
        if let Backing::Mapped(map) = &self.backing {
            map.flush()?;
        }
        debug!(
            "checkpoint: Ip={:04x} Cp={:04x} Hp={:04x}",
            cursors.ip, cursors.cp, cursors.hp
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
