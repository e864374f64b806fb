// Assembler
// Appends bytecode, literals and word headers at the compile pointer

use log::{debug, info};

use crate::dictionary::{NFA_MAX, NO_ATTRIBUTES};
use crate::error::VmError;
use crate::memory::{AddressSpace, Cell};
use crate::opcodes::Opcode;
use crate::symbol_table::SymbolTable;

/// One step of the source stream, as produced by the lexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmEvent {
    /// Bind a name to the compile pointer
    DefineLabel(String),
    /// Emit a word header, then bind the name to the word's body
    DefineWord(String),
    EmitOpcode(Opcode),
    /// Raw data byte
    EmitByte(u8),
    EmitLiteral(Cell),
    /// Compile the address of a label, patched later if not yet defined
    ReferenceLabel(String),
}

pub struct Assembler<'a> {
    space: &'a mut AddressSpace,
    symbols: SymbolTable,
}

impl<'a> Assembler<'a> {
    pub fn new(space: &'a mut AddressSpace) -> Self {
        Assembler {
            space,
            symbols: SymbolTable::new(),
        }
    }

    /// Assemble a whole event stream: apply every event, append BYE and check
    /// that no reference is left unresolved.
    pub fn assemble<I>(mut self, events: I) -> Result<SymbolTable, VmError>
    where
        I: IntoIterator<Item = AsmEvent>,
    {
        for event in events {
            self.apply(event)?;
        }
        self.finish()
    }

    pub fn apply(&mut self, event: AsmEvent) -> Result<(), VmError> {
        match event {
            AsmEvent::DefineLabel(name) => {
                self.symbols.define(self.space, &name)?;
            }
            AsmEvent::DefineWord(name) => {
                self.header(&name)?;
                self.symbols.define(self.space, &name)?;
            }
            AsmEvent::EmitOpcode(op) => {
                let at = self.space.compile_byte(op.code())?;
                debug!("{:04x}: {:02x}\t{}", at, op.code(), op);
            }
            AsmEvent::EmitByte(b) => {
                let at = self.space.compile_byte(b)?;
                debug!("{:04x}: {:02x}", at, b);
            }
            AsmEvent::EmitLiteral(c) => {
                let at = self.space.compile_cell(c)?;
                debug!("{:04x}: {:04x}", at, c);
            }
            AsmEvent::ReferenceLabel(name) => {
                self.symbols.reference(self.space, &name)?;
            }
        }
        Ok(())
    }

    /// Emit a word header: LFA (previous head), AFA, then the length-prefixed name.
    /// The body (CFA) starts right after.
    fn header(&mut self, name: &str) -> Result<(), VmError> {
        if name.len() >= NFA_MAX {
            return Err(VmError::NameTooLong {
                name: name.to_string(),
                len: name.len(),
            });
        }
        if !name.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(VmError::InvalidName(name.to_string()));
        }
        let end = self.space.cursors.cp as usize + 2 + 1 + 1 + name.len();
        self.space.check(end, 1)?;

        let previous = self.space.cursors.hp;
        let lfa = self.space.compile_cell(previous)?;
        self.space.cursors.hp = lfa as Cell;
        self.space.compile_byte(NO_ATTRIBUTES)?;
        self.space.compile_byte(name.len() as u8)?;
        for b in name.bytes() {
            self.space.compile_byte(b)?;
        }
        debug!(
            "{:04x}: header '{}' LFA={:04x} CFA={:04x}",
            lfa, name, previous, self.space.cursors.cp
        );
        Ok(())
    }

    /// Append BYE and check for dangling forward references.
    pub fn finish(mut self) -> Result<SymbolTable, VmError> {
        self.apply(AsmEvent::EmitOpcode(Opcode::Bye))?;
        self.symbols.finalize()?;
        info!(
            "assembled: Ip={:04x} Cp={:04x} Hp={:04x}",
            self.space.cursors.ip, self.space.cursors.cp, self.space.cursors.hp
        );
        Ok(self.symbols)
    }
}

#[cfg(test)]
#[path = "assembler_tests.rs"]
mod tests;
