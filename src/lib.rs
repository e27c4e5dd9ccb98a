//! # LS-8 Emulator
//!
//! An emulator of the LS-8, a small 8-bit processor with eight registers,
//! a descending stack in memory and a thirteen-instruction set.
//!
//! Programs are text images with one binary byte per line, or assembly
//! source that [`assemble`] turns into such bytes.

pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Instruction, Opcode, Output};
pub use asm::{assemble, disassemble, AssemblerError, ProgramImage, LoadError, load_program, parse_program, save_program};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
