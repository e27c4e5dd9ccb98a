//! LS-8 CPU registers.
//!
//! The LS-8 has:
//! - R0-R7: eight 8-bit general purpose registers
//! - R7 doubles as the stack pointer (SP)
//! - PC: program counter
//! - FL: comparison flags (Less, Greater, Equal)

use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Index of the register holding the stack pointer.
pub const STACK_POINTER: usize = 7;

/// Initial stack pointer value. The stack is empty while SP is here.
pub const STACK_START: u8 = 0xF4;

/// Outcome of the most recent compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Less,
    Greater,
    Equal,
}

impl From<Ordering> for Comparison {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Comparison::Less,
            Ordering::Greater => Comparison::Greater,
            Ordering::Equal => Comparison::Equal,
        }
    }
}

/// The FL register.
///
/// At most one of Less/Greater/Equal is ever set: the flags hold the
/// outcome of the last compare, or nothing before the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    last: Option<Comparison>,
}

impl Flags {
    /// Record the outcome of a compare, clearing the other two flags.
    pub fn set(&mut self, comparison: Comparison) {
        self.last = Some(comparison);
    }

    pub fn less(&self) -> bool {
        self.last == Some(Comparison::Less)
    }

    pub fn greater(&self) -> bool {
        self.last == Some(Comparison::Greater)
    }

    pub fn equal(&self) -> bool {
        self.last == Some(Comparison::Equal)
    }

    /// The last compare outcome, if any.
    pub fn comparison(&self) -> Option<Comparison> {
        self.last
    }

    /// The flags packed as `0b00000LGE`.
    pub fn bits(&self) -> u8 {
        match self.last {
            Some(Comparison::Less) => 0b100,
            Some(Comparison::Greater) => 0b010,
            Some(Comparison::Equal) => 0b001,
            None => 0,
        }
    }
}

/// The LS-8 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7. R7 is the stack pointer.
    pub r: [u8; REGISTER_COUNT],

    /// Program counter
    pub pc: usize,

    /// FL: comparison flags
    pub fl: Flags,
}

impl Registers {
    /// Create a new register file: everything zeroed except SP.
    pub fn new() -> Self {
        let mut r = [0; REGISTER_COUNT];
        r[STACK_POINTER] = STACK_START;

        Self {
            r,
            pc: 0,
            fl: Flags::default(),
        }
    }

    /// Reset all registers to their power-on values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read register `index`.
    pub fn get(&self, index: u8) -> Result<u8, RegisterError> {
        self.r
            .get(index as usize)
            .copied()
            .ok_or(RegisterError::InvalidRegister(index))
    }

    /// Write register `index`.
    pub fn set(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        let slot = self.r
            .get_mut(index as usize)
            .ok_or(RegisterError::InvalidRegister(index))?;
        *slot = value;
        Ok(())
    }

    /// Current stack pointer.
    pub fn sp(&self) -> u8 {
        self.r[STACK_POINTER]
    }

    /// Set the stack pointer.
    pub fn set_sp(&mut self, value: u8) {
        self.r[STACK_POINTER] = value;
    }

    /// Move the program counter forward by `len` bytes.
    /// Returns the old value.
    pub fn advance_pc(&mut self, len: usize) -> usize {
        let old = self.pc;
        self.pc += len;
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u8) {
        self.pc = addr as usize;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised by register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register R{0} (expected R0-R7)")]
    InvalidRegister(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_values() {
        let regs = Registers::new();

        assert_eq!(regs.r, [0, 0, 0, 0, 0, 0, 0, 0xF4]);
        assert_eq!(regs.sp(), STACK_START);
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.fl.bits(), 0);
    }

    #[test]
    fn test_register_bounds() {
        let mut regs = Registers::new();

        regs.set(3, 99).unwrap();
        assert_eq!(regs.get(3), Ok(99));
        assert_eq!(regs.get(8), Err(RegisterError::InvalidRegister(8)));
        assert_eq!(regs.set(200, 1), Err(RegisterError::InvalidRegister(200)));
    }

    #[test]
    fn test_stack_pointer_is_r7() {
        let mut regs = Registers::new();

        regs.set_sp(0x10);
        assert_eq!(regs.get(7), Ok(0x10));

        regs.set(7, 0x20).unwrap();
        assert_eq!(regs.sp(), 0x20);
    }

    #[test]
    fn test_flags_are_exclusive() {
        let mut fl = Flags::default();
        assert!(!fl.less() && !fl.greater() && !fl.equal());

        fl.set(Comparison::Less);
        assert!(fl.less() && !fl.greater() && !fl.equal());
        assert_eq!(fl.bits(), 0b100);

        fl.set(Comparison::from(Ordering::Equal));
        assert!(!fl.less() && !fl.greater() && fl.equal());
        assert_eq!(fl.bits(), 0b001);

        fl.set(Comparison::Greater);
        assert_eq!(fl.bits(), 0b010);
        assert_eq!(fl.comparison(), Some(Comparison::Greater));
    }

    #[test]
    fn test_advance_pc() {
        let mut regs = Registers::new();
        regs.pc = 10;

        let old = regs.advance_pc(3);
        assert_eq!(old, 10);
        assert_eq!(regs.pc, 13);

        regs.jump(0x42);
        assert_eq!(regs.pc, 0x42);
    }
}
