//! Opcodes of the virtual machine.
//!
//! Only the control-flow skeleton is defined here. New opcodes are added as new
//! variants; the interpreter's dispatch is an exhaustive match, so a missing
//! handler is a compile error rather than a runtime surprise.

use std::collections::HashMap;
use std::fmt;

use crate::memory::CELL_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// No operation. A zero-filled image is all NOPs.
    Nop = 0x00,
    /// Halt
    Bye = 0x01,
    /// Jump to the inline cell operand
    Jmp = 0x02,
    /// Pop a flag; jump to the inline operand if it is non-zero
    QJmp = 0x03,
    /// Push the return address and jump to the inline operand
    Call = 0x04,
    /// Pop the return stack into Ip
    Ret = 0x05,
    /// Push the inline cell operand onto the data stack
    Lit = 0x06,
}

pub const ALL_OPCODES: [Opcode; 7] = [
    Opcode::Nop,
    Opcode::Bye,
    Opcode::Jmp,
    Opcode::QJmp,
    Opcode::Call,
    Opcode::Ret,
    Opcode::Lit,
];

lazy_static! {
    static ref MNEMONICS: HashMap<&'static str, Opcode> = {
        let mut m = HashMap::new();
        for op in ALL_OPCODES.iter() {
            m.insert(op.mnemonic(), *op);
        }
        m
    };
}

impl Opcode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Bye => "bye",
            Opcode::Jmp => "jmp",
            Opcode::QJmp => "?jmp",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
            Opcode::Lit => "lit",
        }
    }

    /// Bytes of inline operand following the opcode byte
    pub fn operand_width(self) -> usize {
        match self {
            Opcode::Jmp | Opcode::QJmp | Opcode::Call | Opcode::Lit => CELL_SIZE,
            Opcode::Nop | Opcode::Bye | Opcode::Ret => 0,
        }
    }

    /// Look up an opcode by mnemonic, ignoring case
    pub fn from_mnemonic(name: &str) -> Option<Opcode> {
        MNEMONICS.get(name.to_ascii_lowercase().as_str()).copied()
    }
}

impl TryFrom<u8> for Opcode {
    /// The unrecognized byte
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        ALL_OPCODES
            .iter()
            .copied()
            .find(|op| op.code() == byte)
            .ok_or(byte)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
