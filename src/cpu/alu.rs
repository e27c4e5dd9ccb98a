//! Arithmetic logic unit.
//!
//! Pure functions over two register values. Results wrap at 8 bits, the
//! width of an LS-8 register.

use crate::cpu::registers::Comparison;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// ALU operations, keyed by the low four identifier bits of their opcode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(TryFromPrimitive, IntoPrimitive)]
pub enum AluOp {
    /// R[a] := R[a] + R[b]
    Add = 0x0,
    /// R[a] := R[a] * R[b]
    Mul = 0x2,
    /// FL := compare(R[a], R[b])
    Cmp = 0x7,
}

impl AluOp {
    /// Resolve an opcode identifier to an operation.
    pub fn from_identifier(identifier: u8) -> Result<Self, AluError> {
        Self::try_from(identifier).map_err(|_| AluError::Unsupported(identifier))
    }
}

/// What an ALU operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOutput {
    /// New value for the destination register.
    Value(u8),
    /// New flags; registers are untouched.
    Flags(Comparison),
}

/// Apply `op` to `a` and `b`.
pub fn apply(op: AluOp, a: u8, b: u8) -> AluOutput {
    match op {
        AluOp::Add => AluOutput::Value(add(a, b)),
        AluOp::Mul => AluOutput::Value(multiply(a, b)),
        AluOp::Cmp => AluOutput::Flags(compare(a, b)),
    }
}

pub fn add(a: u8, b: u8) -> u8 {
    a.wrapping_add(b)
}

pub fn multiply(a: u8, b: u8) -> u8 {
    a.wrapping_mul(b)
}

/// Unsigned comparison of `a` against `b`.
pub fn compare(a: u8, b: u8) -> Comparison {
    a.cmp(&b).into()
}

/// Errors raised by the ALU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AluError {
    #[error("unsupported ALU operation {0:#06b}")]
    Unsupported(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        assert_eq!(apply(AluOp::Add, 2, 3), AluOutput::Value(5));
        assert_eq!(apply(AluOp::Add, 250, 10), AluOutput::Value(4));
    }

    #[test]
    fn test_multiply_wraps() {
        assert_eq!(apply(AluOp::Mul, 8, 9), AluOutput::Value(72));
        // 16 * 17 = 272 = 256 + 16
        assert_eq!(apply(AluOp::Mul, 16, 17), AluOutput::Value(16));
    }

    #[test]
    fn test_compare_is_unsigned() {
        assert_eq!(compare(1, 2), Comparison::Less);
        assert_eq!(compare(2, 1), Comparison::Greater);
        assert_eq!(compare(7, 7), Comparison::Equal);
        // 0x80 would be negative as i8
        assert_eq!(compare(0x80, 0x01), Comparison::Greater);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(AluOp::from_identifier(0x0), Ok(AluOp::Add));
        assert_eq!(AluOp::from_identifier(0x2), Ok(AluOp::Mul));
        assert_eq!(AluOp::from_identifier(0x7), Ok(AluOp::Cmp));
        assert_eq!(AluOp::from_identifier(0x3), Err(AluError::Unsupported(0x3)));
        assert_eq!(u8::from(AluOp::Cmp), 0x7);
    }
}
