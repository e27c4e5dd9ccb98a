//! Loader, assembler and disassembler for LS-8 programs.
//!
//! This module provides:
//! - The program image format (one binary byte per line)
//! - A simple two-pass assembler (mnemonics → bytes)
//! - A disassembler (bytes → readable text)

pub mod assembler;
pub mod disasm;
pub mod program;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use program::{ProgramImage, LoadError, load_program, parse_program, save_program};
