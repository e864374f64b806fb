use crate::error::VmError;
use crate::memory::Cell;
use crate::opcodes::Opcode;
use crate::trace::Observer;
use crate::vm::VM;
use log::{info, trace};

/// Result of executing an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Continue with the next instruction in sequence
    Continue,
    /// Ip was set to a jump target
    Jumped,
    /// Return address pushed, Ip at the callee
    Called,
    /// Ip restored from the return stack
    Returned,
    /// BYE executed; Ip stays on the BYE
    Halted,
}

/// What one call to `step` did. Observers render these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEvent {
    /// Address of the opcode
    pub at: Cell,
    pub opcode: Opcode,
    /// Inline operand, if the opcode has one
    pub operand: Option<Cell>,
    pub result: ExecutionResult,
}

/// How a bounded run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Halted,
    LimitReached,
}

/// The bytecode interpreter
pub struct Interpreter {
    /// The VM state
    pub vm: VM,
    /// Instructions executed so far
    instruction_count: u64,
    observers: Vec<Box<dyn Observer>>,
}

impl Interpreter {
    pub fn new(vm: VM) -> Self {
        Interpreter {
            vm,
            instruction_count: 0,
            observers: Vec::new(),
        }
    }

    /// Register an observer to be told about every executed instruction
    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    /// Run until BYE.
    pub fn run(&mut self) -> Result<(), VmError> {
        self.run_with_limit(None).map(|_| ())
    }

    /// Run until BYE or until `max_instructions` have executed.
    pub fn run_with_limit(&mut self, max_instructions: Option<u64>) -> Result<Outcome, VmError> {
        info!("Starting interpreter at Ip={:04x}", self.vm.ip());
        let mut executed = 0u64;
        loop {
            if let Some(limit) = max_instructions {
                if executed >= limit {
                    info!("Reached instruction limit of {}", limit);
                    return Ok(Outcome::LimitReached);
                }
            }
            let event = self.step()?;
            executed += 1;
            if event.result == ExecutionResult::Halted {
                info!(
                    "Halted at {:04x} after {} instructions",
                    event.at, self.instruction_count
                );
                return Ok(Outcome::Halted);
            }
        }
    }

    /// Fetch, decode and execute one instruction.
    ///
    /// Every target address and stack effect is validated before any state is
    /// changed, so a failing instruction leaves the VM exactly as it found it.
    pub fn step(&mut self) -> Result<StepEvent, VmError> {
        let at = self.vm.ip();
        let byte = self.vm.space.read_byte(at as usize)?;
        let opcode =
            Opcode::try_from(byte).map_err(|opcode| VmError::UnknownOpcode { ip: at, opcode })?;

        let operand_addr = at as usize + 1;
        let operand = match opcode.operand_width() {
            0 => None,
            _ => Some(self.vm.space.read_cell(operand_addr)?),
        };
        let next = operand_addr + opcode.operand_width();

        let result = self.execute(opcode, operand, next)?;
        self.instruction_count += 1;

        let event = StepEvent {
            at,
            opcode,
            operand,
            result,
        };
        trace!("{:04x}: {} {:?} -> {}", at, opcode, operand, self.vm);
        for observer in self.observers.iter_mut() {
            observer.on_step(&event, &self.vm);
        }
        Ok(event)
    }

    fn execute(
        &mut self,
        opcode: Opcode,
        operand: Option<Cell>,
        next: usize,
    ) -> Result<ExecutionResult, VmError> {
        let target = operand.unwrap_or(0) as usize;
        match opcode {
            Opcode::Nop => {
                self.vm.set_ip(next)?;
                Ok(ExecutionResult::Continue)
            }
            Opcode::Bye => Ok(ExecutionResult::Halted),
            Opcode::Jmp => {
                self.vm.set_ip(target)?;
                Ok(ExecutionResult::Jumped)
            }
            Opcode::QJmp => {
                self.vm.check_target(target)?;
                self.vm.check_target(next)?;
                if self.vm.pop()? != 0 {
                    self.vm.set_ip(target)?;
                    Ok(ExecutionResult::Jumped)
                } else {
                    self.vm.set_ip(next)?;
                    Ok(ExecutionResult::Continue)
                }
            }
            Opcode::Call => {
                self.vm.check_target(target)?;
                let return_addr = self.vm.check_target(next)?;
                self.vm.push_return(return_addr)?;
                self.vm.set_ip(target)?;
                Ok(ExecutionResult::Called)
            }
            Opcode::Ret => {
                let addr = self.vm.rstack.peek().ok_or(VmError::ReturnStackUnderflow {
                    ip: self.vm.ip(),
                })?;
                self.vm.check_target(addr as usize)?;
                self.vm.pop_return()?;
                self.vm.set_ip(addr as usize)?;
                Ok(ExecutionResult::Returned)
            }
            Opcode::Lit => {
                self.vm.check_target(next)?;
                // Literals are signed cells
                self.vm.push(target as Cell as i16 as i32)?;
                self.vm.set_ip(next)?;
                Ok(ExecutionResult::Continue)
            }
        }
    }
}

/// Size in bytes of the instruction starting with `opcode`
pub fn instruction_size(opcode: Opcode) -> usize {
    1 + opcode.operand_width()
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod tests;
