use crate::error::VmError;
use crate::memory::{AddressSpace, Cell};
use log::debug;
use std::fmt;

/// Default return stack capacity
pub const RETURN_STACK_SIZE: usize = 0x100;

/// Default data stack capacity
pub const DATA_STACK_SIZE: usize = 0x40;

/// Fixed-capacity stack. A stack of capacity `n` holds at most `n - 1` items.
#[derive(Debug, Clone)]
pub struct Stack<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T: Copy> Stack<T> {
    pub fn new(capacity: usize) -> Self {
        Stack {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() + 1 >= self.capacity
    }

    /// Returns false, leaving the stack untouched, when full
    pub fn push(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(value);
        true
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<T> {
        self.items.last().copied()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

/// Machine state: the address space (with its cursors) plus the transient stacks.
///
/// The stacks are never persisted; every VM starts with them empty.
pub struct VM {
    pub space: AddressSpace,
    /// Return addresses pushed by CALL
    pub rstack: Stack<Cell>,
    /// Host-width signed values, wide enough to hold intermediate arithmetic
    pub dstack: Stack<i32>,
}

impl VM {
    pub fn new(space: AddressSpace) -> Self {
        VM::with_stacks(space, RETURN_STACK_SIZE, DATA_STACK_SIZE)
    }

    pub fn with_stacks(space: AddressSpace, return_stack: usize, data_stack: usize) -> Self {
        debug!(
            "VM: memory 0x{:04x}, return stack {}, data stack {}",
            space.size(),
            return_stack,
            data_stack
        );
        VM {
            space,
            rstack: Stack::new(return_stack),
            dstack: Stack::new(data_stack),
        }
    }

    pub fn ip(&self) -> Cell {
        self.space.cursors.ip
    }

    /// Check that `addr` can be the next instruction address.
    pub fn check_target(&self, addr: usize) -> Result<Cell, VmError> {
        self.space.check(addr, 1)?;
        Ok(addr as Cell)
    }

    pub fn set_ip(&mut self, addr: usize) -> Result<(), VmError> {
        self.space.cursors.ip = self.check_target(addr)?;
        Ok(())
    }

    pub fn push_return(&mut self, addr: Cell) -> Result<(), VmError> {
        if !self.rstack.push(addr) {
            return Err(VmError::ReturnStackOverflow {
                ip: self.ip(),
                depth: self.rstack.depth(),
            });
        }
        Ok(())
    }

    pub fn pop_return(&mut self) -> Result<Cell, VmError> {
        self.rstack
            .pop()
            .ok_or(VmError::ReturnStackUnderflow { ip: self.ip() })
    }

    pub fn push(&mut self, value: i32) -> Result<(), VmError> {
        if !self.dstack.push(value) {
            return Err(VmError::DataStackOverflow {
                ip: self.ip(),
                depth: self.dstack.depth(),
            });
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Result<i32, VmError> {
        self.dstack
            .pop()
            .ok_or(VmError::DataStackUnderflow { ip: self.ip() })
    }
}

impl fmt::Display for VM {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = self.space.cursors;
        write!(
            f,
            "Ip={:04x} Cp={:04x} Hp={:04x} R:{:04x?} D:{:?}",
            c.ip,
            c.cp,
            c.hp,
            self.rstack.as_slice(),
            self.dstack.as_slice()
        )
    }
}
