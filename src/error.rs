// VM Error Handling

use std::fmt;

/// Broad class of a `VmError`. Every class is fatal to the running image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Assembly,
    Memory,
    Persistence,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    // Assembly errors
    Lexical { line: usize, message: String },
    NameTooLong { name: String, len: usize },
    InvalidName(String),
    UnresolvedReferences(Vec<String>),

    // Memory-safety errors
    OutOfBounds { addr: usize, width: usize, size: usize },
    ReturnStackOverflow { ip: u16, depth: usize },
    ReturnStackUnderflow { ip: u16 },
    DataStackOverflow { ip: u16, depth: usize },
    DataStackUnderflow { ip: u16 },
    UnknownOpcode { ip: u16, opcode: u8 },
    CorruptDictionary { addr: u16 },

    // Persistence errors
    SizeMismatch { path: String, expected: usize, found: u64 },
    HeaderOutOfRange { field: &'static str, value: u16, size: usize },
    Io(String),

    // Configuration errors
    Config(String),
}

impl VmError {
    pub fn class(&self) -> ErrorClass {
        match self {
            VmError::Lexical { .. }
            | VmError::NameTooLong { .. }
            | VmError::InvalidName(_)
            | VmError::UnresolvedReferences(_) => ErrorClass::Assembly,
            VmError::OutOfBounds { .. }
            | VmError::ReturnStackOverflow { .. }
            | VmError::ReturnStackUnderflow { .. }
            | VmError::DataStackOverflow { .. }
            | VmError::DataStackUnderflow { .. }
            | VmError::UnknownOpcode { .. }
            | VmError::CorruptDictionary { .. } => ErrorClass::Memory,
            VmError::SizeMismatch { .. } | VmError::HeaderOutOfRange { .. } | VmError::Io(_) => {
                ErrorClass::Persistence
            }
            VmError::Config(_) => ErrorClass::Config,
        }
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VmError::Lexical { line, message } => {
                write!(f, "Syntax error at line {}: {}", line, message)
            }
            VmError::NameTooLong { name, len } => {
                write!(f, "Word name '{}' is too long ({} bytes)", name, len)
            }
            VmError::InvalidName(name) => {
                write!(f, "Word name '{}' is not printable ASCII", name)
            }
            VmError::UnresolvedReferences(names) => {
                write!(f, "Unresolved forward reference(s): {}", names.join(", "))
            }
            VmError::OutOfBounds { addr, width, size } => {
                write!(
                    f,
                    "Address 0x{:04x} (+{} bytes) is outside memory of size 0x{:04x}",
                    addr, width, size
                )
            }
            VmError::ReturnStackOverflow { ip, depth } => {
                write!(f, "Return stack overflow at 0x{:04x} (depth {})", ip, depth)
            }
            VmError::ReturnStackUnderflow { ip } => {
                write!(f, "Return stack underflow at 0x{:04x}", ip)
            }
            VmError::DataStackOverflow { ip, depth } => {
                write!(f, "Data stack overflow at 0x{:04x} (depth {})", ip, depth)
            }
            VmError::DataStackUnderflow { ip } => {
                write!(f, "Data stack underflow at 0x{:04x}", ip)
            }
            VmError::UnknownOpcode { ip, opcode } => {
                write!(f, "Unknown opcode 0x{:02x} at 0x{:04x}", opcode, ip)
            }
            VmError::CorruptDictionary { addr } => {
                write!(f, "Corrupt word header at 0x{:04x}", addr)
            }
            VmError::SizeMismatch {
                path,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Image '{}' has size {} bytes, expected exactly {}",
                    path, found, expected
                )
            }
            VmError::HeaderOutOfRange { field, value, size } => {
                write!(
                    f,
                    "Image header field {} = 0x{:04x} is outside the program area (size 0x{:04x})",
                    field, value, size
                )
            }
            VmError::Io(msg) => write!(f, "IO error: {}", msg),
            VmError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for VmError {}

impl From<std::io::Error> for VmError {
    fn from(e: std::io::Error) -> Self {
        VmError::Io(e.to_string())
    }
}

impl From<toml::de::Error> for VmError {
    fn from(e: toml::de::Error) -> Self {
        VmError::Config(e.to_string())
    }
}
