//! WebAssembly bindings for the LS-8 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::Cpu;
use crate::asm::assembler::assemble;
use crate::asm::disasm::{disassemble, format_instruction};
use crate::asm::program::parse_program;
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::REGISTER_COUNT;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Vec<u8>,
    output: Vec<u8>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Load a program image (one binary byte per line).
    #[wasm_bindgen]
    pub fn load_program(&mut self, text: &str) -> Result<usize, JsError> {
        let image = parse_program(text)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.install(image.bytes)
    }

    /// Load a program from assembly source code.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let bytes = assemble(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.install(bytes)
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        if !self.cpu.is_running() {
            return Err(JsError::new("CPU is not running"));
        }

        let instr = self.cpu.step(&mut self.output)
            .map_err(|e| JsError::new(&e.to_string()))?;

        Ok(format_instruction(&instr))
    }

    /// Run until halt, error or max cycles. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu.run_limited(&mut self.output, max_cycles as u64)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.cpu.cycles)
    }

    /// Reset CPU to initial state with loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.output.clear();
        if let Err(e) = self.cpu.load_program(&self.program) {
            log::error!("reset failed to reload program: {}", e);
        }
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.cpu.regs.pc
    }

    #[wasm_bindgen]
    pub fn sp(&self) -> u8 {
        self.cpu.regs.sp()
    }

    /// Get register `index` (0-7); out-of-range indices read as 0.
    #[wasm_bindgen]
    pub fn register(&self, index: usize) -> u8 {
        if index < REGISTER_COUNT {
            self.cpu.regs.r[index]
        } else {
            0
        }
    }

    /// Flags as `00000LGE`.
    #[wasm_bindgen]
    pub fn flags(&self) -> u8 {
        self.cpu.regs.fl.bits()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Values printed by PRN since the last load or reset.
    #[wasm_bindgen]
    pub fn output(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.output.as_slice())
    }

    /// Get memory byte at `index`; out-of-range indices read as 0.
    #[wasm_bindgen]
    pub fn memory_at(&self, index: usize) -> u8 {
        if index < MEMORY_SIZE {
            self.cpu.mem.read(index).unwrap_or(0)
        } else {
            0
        }
    }

    /// Get all 256 bytes of memory.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.cpu.mem.as_slice())
    }

    /// Get the full CPU state as a JSON string.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl WasmCpu {
    fn install(&mut self, bytes: Vec<u8>) -> Result<usize, JsError> {
        let len = bytes.len();
        let mut cpu = Cpu::new();
        cpu.load_program(&bytes)
            .map_err(|e| JsError::new(&e.to_string()))?;

        self.cpu = cpu;
        self.program = bytes;
        self.output.clear();
        Ok(len)
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the program bytes.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<Vec<u8>, JsError> {
    assemble(source).map_err(|e| JsError::new(&e.to_string()))
}

/// Disassemble program bytes into a listing.
#[wasm_bindgen]
pub fn wasm_disassemble(bytes: &[u8]) -> String {
    disassemble(bytes)
}
