//! Execution observers.
//!
//! The interpreter reports each executed instruction to its observers after the
//! state change is complete. Observers only render; they never alter the VM.

use std::io::Write;

use crate::interpreter::{ExecutionResult, StepEvent};
use crate::vm::VM;

pub trait Observer {
    fn on_step(&mut self, event: &StepEvent, vm: &VM);
}

/// Render a step as a single trace line, e.g. `000e: 02 jmp 0019`
pub fn format_step(event: &StepEvent, vm: &VM) -> String {
    let mut line = format!(
        "{:04x}: {:02x} {}",
        event.at,
        event.opcode.code(),
        event.opcode
    );
    if let Some(operand) = event.operand {
        line.push_str(&format!(" {:04x}", operand));
    }
    match event.result {
        ExecutionResult::Called | ExecutionResult::Returned => {
            line.push_str(&format!("\tR:{}", vm.rstack.depth()));
        }
        ExecutionResult::Halted => line.push_str("\thalt"),
        ExecutionResult::Continue | ExecutionResult::Jumped => {}
    }
    line
}

/// Writes one line per executed instruction
pub struct TraceObserver<W: Write> {
    out: W,
}

impl<W: Write> TraceObserver<W> {
    pub fn new(out: W) -> Self {
        TraceObserver { out }
    }
}

impl<W: Write> Observer for TraceObserver<W> {
    fn on_step(&mut self, event: &StepEvent, vm: &VM) {
        // Trace output is best effort; a closed pipe must not stop the machine
        if let Err(e) = writeln!(self.out, "{}", format_step(event, vm)) {
            log::warn!("trace output failed: {}", e);
        }
    }
}
