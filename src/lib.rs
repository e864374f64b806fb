//! A small stack-machine VM whose whole address space lives in a memory-mapped
//! image file, so compiled code and machine state survive restarts.

#[macro_use]
extern crate lazy_static;

pub mod assembler;
pub mod config;
pub mod dictionary;
pub mod disassembler;
pub mod error;
pub mod header;
pub mod image;
pub mod interpreter;
pub mod lexer;
pub mod memory;
pub mod opcodes;
pub mod symbol_table;
pub mod trace;
pub mod vm;

pub use error::VmError;

use crate::assembler::Assembler;
use crate::image::Image;
use crate::lexer::Lexer;
use log::{error, info};

/// Assemble `source` into a freshly created image and checkpoint it.
///
/// On failure the image is removed so it is never resumed half-assembled.
pub fn assemble_into(mut image: Image, source: &str) -> Result<Image, VmError> {
    let result = Lexer::new(source)
        .tokenize()
        .and_then(|events| Assembler::new(image.space_mut()).assemble(events));
    match result {
        Ok(symbols) => {
            info!("Assembled {} label(s)", symbols.labels().count());
            image.checkpoint()?;
            Ok(image)
        }
        Err(e) => {
            if let Err(discard) = image.discard() {
                error!("Could not discard unfinished image: {}", discard);
            }
            Err(e)
        }
    }
}
