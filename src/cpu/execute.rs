//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! The loop never moves the PC on its own: every handler either advances
//! it by its instruction length or replaces it.

use crate::cpu::{Memory, Registers};
use crate::cpu::alu::{self, AluOp, AluOutput};
use crate::cpu::decode::{self, Instruction, DecodeError};
use crate::cpu::memory::MemoryError;
use crate::cpu::output::Output;
use crate::cpu::registers::{RegisterError, STACK_START};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Exit status for every fatal execution error.
pub const EXIT_EXECUTION_ERROR: i32 = 1;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
    /// CPU encountered a fatal error.
    Error,
}

/// The LS-8 CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU in its power-on state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Load a program into memory at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)
    }

    /// Read the byte at memory address `addr`.
    pub fn ram_read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.mem.read(addr)
    }

    /// Write `value` to memory address `addr`.
    pub fn ram_write(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        self.mem.write(addr, value)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. Any error
    /// leaves the CPU in [`CpuState::Error`].
    pub fn step(&mut self, out: &mut impl Output) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        match self.fetch_and_execute(out) {
            Ok(instr) => {
                self.cycles += 1;
                self.last_instr = Some(instr);
                Ok(instr)
            }
            Err(e) => {
                log::error!("fatal error at PC={:#04X}: {}", self.regs.pc, e);
                self.state = CpuState::Error;
                Err(e)
            }
        }
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self, out: &mut impl Output) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(out)?;
        }

        log::debug!("halted after {} instructions", self.cycles - start_cycles);
        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, out: &mut impl Output, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    fn fetch_and_execute(&mut self, out: &mut impl Output) -> Result<Instruction, CpuError> {
        // Fetch
        let pc = self.regs.pc;
        let byte = self.ram_read(pc)?;

        // Decode
        let opcode = decode::decode_opcode(byte, pc)?;
        let mut operands = [0u8; 2];
        for (i, operand) in operands.iter_mut().take(opcode.operand_count()).enumerate() {
            *operand = self.ram_read(pc + 1 + i)?;
        }
        let instr = decode::decode(opcode, &operands);
        log::trace!("{:#04X}: {:?}", pc, instr);

        // Execute
        self.execute(instr, out)?;
        Ok(instr)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction, out: &mut impl Output) -> Result<(), CpuError> {
        match instr {
            // ==================== Data Movement ====================

            Instruction::Ldi { reg, value } => {
                self.regs.set(reg, value)?;
                self.regs.advance_pc(3);
            }

            Instruction::Prn { reg } => {
                let value = self.regs.get(reg)?;
                out.emit(value).map_err(|e| CpuError::Output(e.to_string()))?;
                self.regs.advance_pc(2);
            }

            Instruction::Hlt => {
                self.state = CpuState::Halted;
            }

            // ==================== Stack ====================

            // PUSH R7 stores the decremented SP; POP R7 increments the popped value
            Instruction::Push { reg } => {
                self.regs.get(reg)?;
                let sp = self.decrement_sp()?;
                let value = self.regs.get(reg)?;
                self.ram_write(sp as usize, value)?;
                self.regs.advance_pc(2);
            }

            Instruction::Pop { reg } => {
                self.regs.get(reg)?;
                let value = self.ram_read(self.stack_top()? as usize)?;
                self.regs.set(reg, value)?;
                self.regs.set_sp(self.regs.sp().wrapping_add(1));
                self.regs.advance_pc(2);
            }

            // ==================== Control Flow ====================

            Instruction::Call { reg } => {
                self.regs.get(reg)?;
                let return_addr = self.regs.pc + 2;
                let return_addr = u8::try_from(return_addr)
                    .map_err(|_| CpuError::Memory(MemoryError::AddressOutOfRange(return_addr)))?;
                self.push(return_addr)?;
                let target = self.regs.get(reg)?;
                self.regs.jump(target);
            }

            Instruction::Ret => {
                let addr = self.pop()?;
                self.regs.jump(addr);
            }

            Instruction::Jmp { reg } => {
                let target = self.regs.get(reg)?;
                self.regs.jump(target);
            }

            Instruction::Jeq { reg } => {
                let target = self.regs.get(reg)?;
                if self.regs.fl.equal() {
                    self.regs.jump(target);
                } else {
                    self.regs.advance_pc(2);
                }
            }

            Instruction::Jne { reg } => {
                let target = self.regs.get(reg)?;
                if !self.regs.fl.equal() {
                    self.regs.jump(target);
                } else {
                    self.regs.advance_pc(2);
                }
            }

            // ==================== ALU ====================

            Instruction::Alu { op, a, b } => {
                self.alu(op, a, b)?;
            }
        }

        Ok(())
    }

    /// Apply an ALU operation to R[reg_a] and R[reg_b], then step past
    /// the three-byte instruction.
    pub fn alu(&mut self, op: AluOp, reg_a: u8, reg_b: u8) -> Result<(), CpuError> {
        let a = self.regs.get(reg_a)?;
        let b = self.regs.get(reg_b)?;

        match alu::apply(op, a, b) {
            AluOutput::Value(result) => self.regs.set(reg_a, result)?,
            AluOutput::Flags(comparison) => self.regs.fl.set(comparison),
        }

        self.regs.advance_pc(3);
        Ok(())
    }

    /// SP -= 1, returning the new SP.
    fn decrement_sp(&mut self) -> Result<u8, CpuError> {
        let sp = self.regs.sp();
        if sp == 0 {
            return Err(CpuError::StackOverflow { sp });
        }

        self.regs.set_sp(sp - 1);
        Ok(sp - 1)
    }

    /// Address of the top stack entry; fails on an empty stack.
    fn stack_top(&self) -> Result<u8, CpuError> {
        let sp = self.regs.sp();
        if sp >= STACK_START {
            return Err(CpuError::StackUnderflow { sp });
        }
        Ok(sp)
    }

    /// SP -= 1, then store `value` at SP.
    fn push(&mut self, value: u8) -> Result<(), CpuError> {
        let sp = self.decrement_sp()?;
        self.ram_write(sp as usize, value)?;
        Ok(())
    }

    /// Load the value at SP, then SP += 1.
    fn pop(&mut self) -> Result<u8, CpuError> {
        let sp = self.stack_top()?;
        let value = self.ram_read(sp as usize)?;
        self.regs.set_sp(sp + 1);
        Ok(value)
    }

    /// One-line snapshot: `TRACE: PC | op a b | R0 .. R7`, all hex.
    pub fn trace(&self) -> String {
        let pc = self.regs.pc;
        let byte = |addr: usize| self.ram_read(addr).unwrap_or(0);

        let mut line = format!(
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            pc,
            byte(pc),
            byte(pc + 1),
            byte(pc + 2)
        );
        for value in self.regs.r {
            line.push_str(&format!(" {:02X}", value));
        }
        line
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("stack overflow (SP={sp:#04X})")]
    StackOverflow { sp: u8 },

    #[error("stack underflow (SP={sp:#04X})")]
    StackUnderflow { sp: u8 },

    #[error("output error: {0}")]
    Output(String),
}

impl CpuError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        EXIT_EXECUTION_ERROR
    }
}
