use crate::dictionary::{Dictionary, WordHeader};
use crate::error::VmError;
use crate::header::NVRAM_HEADER;
use crate::interpreter::instruction_size;
use crate::memory::{AddressSpace, Cell};
use crate::opcodes::Opcode;
use std::collections::HashMap;
use std::fmt::Write;

/// A decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub at: usize,
    pub opcode: Opcode,
    pub operand: Option<Cell>,
    pub size: usize,
}

pub struct Disassembler<'a> {
    space: &'a AddressSpace,
}

impl<'a> Disassembler<'a> {
    pub fn new(space: &'a AddressSpace) -> Self {
        Disassembler { space }
    }

    pub fn instruction_at(&self, addr: usize) -> Result<Decoded, VmError> {
        let byte = self.space.read_byte(addr)?;
        let opcode = Opcode::try_from(byte).map_err(|opcode| VmError::UnknownOpcode {
            ip: addr as Cell,
            opcode,
        })?;
        let operand = match opcode.operand_width() {
            0 => None,
            _ => Some(self.space.read_cell(addr + 1)?),
        };
        Ok(Decoded {
            at: addr,
            opcode,
            operand,
            size: instruction_size(opcode),
        })
    }

    /// Format a word header as its LFA / AFA / NFA fields
    fn format_header(&self, out: &mut String, word: &WordHeader) {
        let at = word.addr as usize;
        writeln!(out, "\n{:04x}:\t{}", word.cfa, word.name).unwrap();
        writeln!(out, "{:04x}: {:04x}\tLFA", at, word.link).unwrap();
        writeln!(out, "{:04x}: {:02x}\tAFA", at + 2, word.attributes).unwrap();
        writeln!(out, "{:04x}: {:02x}\tNFA '{}'", at + 3, word.name.len(), word.name).unwrap();
    }

    /// Render everything compiled so far, from the end of the header to `Cp`.
    pub fn listing(&self) -> Result<String, VmError> {
        let cursors = self.space.cursors;
        let dictionary = Dictionary::walk(self.space, cursors.hp)?;
        let headers: HashMap<usize, &WordHeader> = dictionary
            .words
            .iter()
            .map(|w| (w.addr as usize, w))
            .collect();

        let mut out = String::new();
        writeln!(
            out,
            "Ip={:04x} Cp={:04x} Hp={:04x}",
            cursors.ip, cursors.cp, cursors.hp
        )
        .unwrap();

        let end = cursors.cp as usize;
        let mut addr = NVRAM_HEADER;
        while addr < end {
            if let Some(word) = headers.get(&addr) {
                self.format_header(&mut out, word);
                addr = word.cfa as usize;
                continue;
            }
            match self.instruction_at(addr) {
                Ok(inst) => {
                    let marker = if addr == cursors.ip as usize { ">" } else { " " };
                    write!(
                        out,
                        "{}{:04x}: {:02x} {}",
                        marker,
                        addr,
                        inst.opcode.code(),
                        inst.opcode
                    )
                    .unwrap();
                    if let Some(operand) = inst.operand {
                        write!(out, " {:04x}", operand).unwrap();
                    }
                    writeln!(out).unwrap();
                    addr += inst.size;
                }
                Err(_) => {
                    writeln!(out, " {:04x}: {:02x} db", addr, self.space.bytes()[addr]).unwrap();
                    addr += 1;
                }
            }
        }
        Ok(out)
    }
}
