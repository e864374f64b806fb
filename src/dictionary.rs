use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::error::VmError;
use crate::memory::{AddressSpace, Cell, CELL_SIZE};

/// Names must be shorter than this (the length byte included)
pub const NFA_MAX: usize = 0x20;

/// AFA value written for ordinary words
pub const NO_ATTRIBUTES: u8 = 0x00;
/// AFA bit reserved for words executed at compile time
pub const IMMEDIATE: u8 = 0x01;

/// A decoded word header.
///
/// Layout at `addr`: `LFA` (cell, previous header or 0), `AFA` (byte),
/// `NFA` (length byte + name), then the body at `cfa`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordHeader {
    pub addr: Cell,
    pub link: Cell,
    pub attributes: u8,
    pub name: String,
    pub cfa: Cell,
}

impl WordHeader {
    pub fn read(space: &AddressSpace, addr: Cell) -> Result<WordHeader, VmError> {
        let at = addr as usize;
        let link = space.read_cell(at)?;
        let attributes = space.read_byte(at + CELL_SIZE)?;
        let len = space.read_byte(at + CELL_SIZE + 1)? as usize;
        if len >= NFA_MAX {
            return Err(VmError::CorruptDictionary { addr });
        }
        let start = at + CELL_SIZE + 2;
        space.check(start, len)?;
        let bytes = &space.bytes()[start..start + len];
        if !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(VmError::CorruptDictionary { addr });
        }
        let name = String::from_utf8_lossy(bytes).into_owned();
        Ok(WordHeader {
            addr,
            link,
            attributes,
            name,
            cfa: (start + len) as Cell,
        })
    }

    pub fn is_immediate(&self) -> bool {
        self.attributes & IMMEDIATE != 0
    }
}

impl Display for WordHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "{:04x}: {:<16} LFA={:04x} AFA={:02x} CFA={:04x}",
            self.addr, self.name, self.link, self.attributes, self.cfa
        )
    }
}

/// The word list, newest first, as reachable from a dictionary head.
#[derive(Debug, Clone)]
pub struct Dictionary {
    pub words: Vec<WordHeader>,
}

impl Dictionary {
    /// Follow LFA links from `hp` down to the 0 sentinel.
    ///
    /// Headers are appended, so each link must point strictly below its header;
    /// anything else means the image is corrupt.
    pub fn walk(space: &AddressSpace, hp: Cell) -> Result<Dictionary, VmError> {
        let mut words = Vec::new();
        let mut cur = hp;
        while cur != 0 {
            let header = WordHeader::read(space, cur)?;
            if header.link >= cur {
                return Err(VmError::CorruptDictionary { addr: cur });
            }
            cur = header.link;
            words.push(header);
        }
        Ok(Dictionary { words })
    }

    /// Most recent definition of `name`
    pub fn find(&self, name: &str) -> Option<&WordHeader> {
        self.words.iter().find(|w| w.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.words.iter().map(|w| w.name.as_str()).collect()
    }
}

impl Display for Dictionary {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        writeln!(f, "{} word(s):", self.words.len())?;
        for w in &self.words {
            writeln!(f, "{}", w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dictionary_tests.rs"]
mod tests;
