use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::error::VmError;
use crate::memory::{AddressSpace, Cell, CELL_SIZE};

/// Offset of the persisted instruction pointer
pub const NVRAM_IP: usize = 0;
/// Offset of the persisted compile pointer
pub const NVRAM_CP: usize = CELL_SIZE;
/// Offset of the persisted dictionary head
pub const NVRAM_HP: usize = 2 * CELL_SIZE;
/// First byte usable for program code
pub const NVRAM_HEADER: usize = 3 * CELL_SIZE;

/// The three machine cursors kept in the reserved image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Instruction pointer, next opcode to fetch
    pub ip: Cell,
    /// Compile pointer, next free byte for the assembler
    pub cp: Cell,
    /// Address of the most recent word header, 0 when the dictionary is empty
    pub hp: Cell,
}

impl Header {
    /// Cursors of a freshly created image.
    pub fn fresh() -> Header {
        Header {
            ip: NVRAM_HEADER as Cell,
            cp: NVRAM_HEADER as Cell,
            hp: 0,
        }
    }

    /// Read the cursors from the header region, rejecting any that point outside
    /// the program area.
    pub fn load(space: &AddressSpace) -> Result<Header, VmError> {
        let size = space.size();
        let header = Header {
            ip: space.read_cell(NVRAM_IP)?,
            cp: space.read_cell(NVRAM_CP)?,
            hp: space.read_cell(NVRAM_HP)?,
        };

        let in_program = |v: Cell| (v as usize) >= NVRAM_HEADER && (v as usize) < size;
        if !in_program(header.ip) {
            return Err(VmError::HeaderOutOfRange {
                field: "Ip",
                value: header.ip,
                size,
            });
        }
        if !in_program(header.cp) {
            return Err(VmError::HeaderOutOfRange {
                field: "Cp",
                value: header.cp,
                size,
            });
        }
        if header.hp != 0 && !in_program(header.hp) {
            return Err(VmError::HeaderOutOfRange {
                field: "Hp",
                value: header.hp,
                size,
            });
        }
        Ok(header)
    }

    /// Write the cursors into the header region.
    pub fn store(&self, space: &mut AddressSpace) -> Result<(), VmError> {
        space.write_cell(NVRAM_IP, self.ip)?;
        space.write_cell(NVRAM_CP, self.cp)?;
        space.write_cell(NVRAM_HP, self.hp)
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "
Instruction pointer:  {:#06x}
Compile pointer:      {:#06x}
Dictionary head:      {:#06x}
",
            self.ip, self.cp, self.hp,
        )
    }
}
