// Source Reader
// Turns assembly source text into a stream of assembler events
//
//   : name      define a word (header + label)
//   name:       define a plain label
//   ;           end of word body (compiles RET)
//   nop jmp ... opcode mnemonics, case-insensitive
//   42 -1 0x2a  cell literal
//   byte 7      raw byte
//   other       reference to a label
//   # or \      comment to end of line

use crate::assembler::AsmEvent;
use crate::error::VmError;
use crate::memory::Cell;
use crate::opcodes::Opcode;

pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input }
    }

    pub fn tokenize(&self) -> Result<Vec<AsmEvent>, VmError> {
        let mut events = Vec::new();

        for (index, raw) in self.input.lines().enumerate() {
            let line = index + 1;
            let code = match raw.find(|c: char| c == '#' || c == '\\') {
                Some(pos) => &raw[..pos],
                None => raw,
            };

            let mut words = code.split_whitespace();
            while let Some(word) = words.next() {
                if !word.is_ascii() {
                    return Err(error(line, format!("non-ASCII token '{}'", word)));
                }
                let event = match word {
                    ":" => {
                        let name = words
                            .next()
                            .ok_or_else(|| error(line, "':' without a word name".to_string()))?;
                        if !name.is_ascii() {
                            return Err(error(line, format!("non-ASCII word name '{}'", name)));
                        }
                        AsmEvent::DefineWord(name.to_string())
                    }
                    ";" => AsmEvent::EmitOpcode(Opcode::Ret),
                    _ if word.eq_ignore_ascii_case("byte") => {
                        let value = words
                            .next()
                            .ok_or_else(|| error(line, "'byte' without a value".to_string()))?;
                        AsmEvent::EmitByte(parse_byte(value).map_err(|m| error(line, m))?)
                    }
                    _ if word.len() > 1 && word.ends_with(':') => {
                        AsmEvent::DefineLabel(word[..word.len() - 1].to_string())
                    }
                    _ if looks_numeric(word) => {
                        AsmEvent::EmitLiteral(parse_cell(word).map_err(|m| error(line, m))?)
                    }
                    _ => match Opcode::from_mnemonic(word) {
                        Some(op) => AsmEvent::EmitOpcode(op),
                        None => AsmEvent::ReferenceLabel(word.to_string()),
                    },
                };
                events.push(event);
            }
        }

        Ok(events)
    }
}

fn error(line: usize, message: String) -> VmError {
    VmError::Lexical { line, message }
}

fn looks_numeric(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    digits.chars().next().map_or(false, |c| c.is_ascii_digit())
}

fn parse_number(word: &str) -> Result<i64, String> {
    let (negative, digits) = match word.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    let malformed = || format!("malformed number '{}'", word);
    let (radix, body) = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, digits),
    };
    // from_str_radix takes its own sign; only the leading '-' above is allowed
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return Err(malformed());
    }
    let value = i64::from_str_radix(body, radix).map_err(|_| malformed())?;
    Ok(if negative { -value } else { value })
}

/// Signed values are stored in two's complement
fn parse_cell(word: &str) -> Result<Cell, String> {
    let value = parse_number(word)?;
    if !(i16::MIN as i64..=Cell::MAX as i64).contains(&value) {
        return Err(format!("literal {} does not fit in a cell", word));
    }
    Ok(value as u16)
}

fn parse_byte(word: &str) -> Result<u8, String> {
    let value = parse_number(word)?;
    if !(0..=u8::MAX as i64).contains(&value) {
        return Err(format!("byte value {} out of range", word));
    }
    Ok(value as u8)
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
