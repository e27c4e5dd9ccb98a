//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 architecture:
//! - 256 bytes of memory
//! - 8 registers R0-R7, with R7 as the stack pointer
//! - Less/Greater/Equal flags set by CMP
//! - 13-instruction set with register operands

pub mod memory;
pub mod registers;
pub mod alu;
pub mod decode;
pub mod execute;
pub mod output;

pub use memory::{Memory, MemoryError};
pub use registers::{Flags, Registers, STACK_POINTER, STACK_START};
pub use alu::{AluError, AluOp};
pub use decode::{Instruction, Opcode, DecodeError};
pub use execute::{Cpu, CpuError, CpuState};
pub use output::Output;
