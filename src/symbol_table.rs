//! Single-pass label resolution for the assembler
//!
//! Labels map names to addresses in the address space. A reference to a name that
//! is not yet defined compiles a placeholder cell and records the placeholder's
//! address under that name; defining the name later patches every recorded site
//! in place. The address space is the final load address, so no relocation step
//! follows.
//!
//! The table only lives for one assembly pass. Its effects (patched cells) persist
//! in the image; the table itself does not.

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::VmError;
use crate::memory::{AddressSpace, Cell};

/// Name of the word whose definition selects the program entry point
pub const BOOTSTRAP_WORD: &str = "init";

/// Distinctive value compiled into a slot awaiting a forward definition
pub const PLACEHOLDER_CELL: Cell = Cell::MAX;

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    labels: IndexMap<String, Cell>, // Resolved addresses by name
    forwards: IndexMap<String, Vec<Cell>>, // Patch sites awaiting a definition
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to the current compile pointer, select it as entry point if it is
    /// the bootstrap word, and patch any forward references waiting on it.
    pub fn define(&mut self, space: &mut AddressSpace, name: &str) -> Result<Cell, VmError> {
        let addr = space.cursors.cp;
        debug!("define {} = 0x{:04x}", name, addr);

        if let Some(previous) = self.labels.insert(name.to_string(), addr) {
            warn!(
                "'{}' redefined: 0x{:04x} -> 0x{:04x}",
                name, previous, addr
            );
        }

        if name == BOOTSTRAP_WORD {
            debug!("entry point = 0x{:04x}", addr);
            space.cursors.ip = addr;
        }

        if let Some(sites) = self.forwards.shift_remove(name) {
            for site in sites {
                debug!("patch 0x{:04x} -> 0x{:04x} ({})", site, addr, name);
                space.write_cell(site as usize, addr)?;
            }
        }
        Ok(addr)
    }

    /// Compile the address of `name` at the compile pointer, or a placeholder to be
    /// patched when `name` is defined.
    pub fn reference(&mut self, space: &mut AddressSpace, name: &str) -> Result<(), VmError> {
        match self.labels.get(name) {
            Some(&addr) => {
                space.compile_cell(addr)?;
            }
            None => {
                let site = space.compile_cell(PLACEHOLDER_CELL)?;
                debug!("forward reference to {} at 0x{:04x}", name, site);
                self.forwards
                    .entry(name.to_string())
                    .or_default()
                    .push(site as Cell);
            }
        }
        Ok(())
    }

    /// Fail if any reference is still waiting for a definition.
    pub fn finalize(&self) -> Result<(), VmError> {
        if self.forwards.is_empty() {
            return Ok(());
        }
        for (name, sites) in &self.forwards {
            log::error!("unresolved forward: {} ({} site(s))", name, sites.len());
        }
        Err(VmError::UnresolvedReferences(
            self.forwards.keys().cloned().collect(),
        ))
    }

    pub fn address_of(&self, name: &str) -> Option<Cell> {
        self.labels.get(name).copied()
    }

    /// Patch sites still waiting on `name`
    pub fn pending(&self, name: &str) -> Option<&[Cell]> {
        self.forwards.get(name).map(|v| v.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, Cell)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
#[path = "symbol_table_tests.rs"]
mod tests;
