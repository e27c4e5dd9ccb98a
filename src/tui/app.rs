//! Debugger application state and logic.

use crate::Cpu;
use crate::asm::disasm::{disassemble_at, format_instruction};
use crate::cpu::memory::MEMORY_SIZE;
use std::collections::HashSet;

/// Bytes shown per memory view row.
pub const MEMORY_ROW_WIDTH: usize = 8;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original program for reference.
    pub program: Vec<u8>,
    /// Values printed by PRN so far.
    pub output: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<usize>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// PC the current run started from; its breakpoint is skipped once.
    pub resume_pc: Option<usize>,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<u8>) -> Self {
        let mut app = Self {
            cpu: Cpu::new(),
            program,
            output: Vec::new(),
            breakpoints: HashSet::new(),
            running: false,
            resume_pc: None,
            should_quit: false,
            status: String::new(),
            mem_scroll: 0,
        };
        app.reset();
        app.status = "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into();
        app
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc;
        match self.cpu.step(&mut self.output) {
            Ok(instr) => {
                self.status = format!("PC={:02X}: {}", pc, format_instruction(&instr));
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.resume_pc = Some(self.cpu.regs.pc);
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("Stopped after {} cycles", self.cpu.cycles);
            return;
        }

        let pc = self.cpu.regs.pc;
        let resuming = self.resume_pc.take() == Some(pc);
        if self.breakpoints.contains(&pc) && !resuming {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02X}", pc);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02X}", pc);
        }
    }

    /// Reset CPU to initial state.
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.output.clear();
        if let Err(e) = self.cpu.load_program(&self.program) {
            self.status = format!("Failed to load program: {}", e);
        } else {
            self.status = "Reset. Ready.".into();
        }
        self.running = false;
        self.resume_pc = None;
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        let last_row = MEMORY_SIZE / MEMORY_ROW_WIDTH - 1;
        if self.mem_scroll < last_row {
            self.mem_scroll += 1;
        }
    }

    /// Disassembly starting at the current PC.
    ///
    /// Walking backwards through variable-length code is ambiguous, so the
    /// view begins at the PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let mem = self.cpu.mem.as_slice();
        let pc = self.cpu.regs.pc;
        let mut addr = pc;
        let mut rows = Vec::with_capacity(lines);

        while rows.len() < lines && addr < MEMORY_SIZE {
            let (text, len) = disassemble_at(mem, addr);
            rows.push((addr, text, addr == pc));
            addr += len.max(1);
        }

        rows
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u8>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create app
    let mut app = DebuggerApp::new(program);

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULT: [u8; 12] = [
        0b1000_0010, 0, 8,
        0b1000_0010, 1, 9,
        0b1010_0010, 0, 1,
        0b0100_0111, 0,
        0b0000_0001,
    ];

    #[test]
    fn test_step_collects_output() {
        let mut app = DebuggerApp::new(MULT.to_vec());
        for _ in 0..5 {
            app.step();
        }

        assert_eq!(app.output, vec![72]);
        assert!(app.cpu.is_halted());
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = DebuggerApp::new(MULT.to_vec());
        app.breakpoints.insert(6);

        app.run();
        for _ in 0..10 {
            app.tick();
        }

        assert!(!app.running);
        assert_eq!(app.cpu.regs.pc, 6);
        assert_eq!(app.status, "Breakpoint at PC=06");

        // Resuming steps past the breakpoint
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(app.cpu.is_halted());
    }

    #[test]
    fn test_status_text_does_not_affect_breakpoints() {
        let mut app = DebuggerApp::new(MULT.to_vec());
        app.breakpoints.insert(3);
        app.step();

        // Paused on a breakpoint at the resume PC: running skips it once
        app.run();
        app.status = "Paused.".into();
        app.tick();
        assert!(app.running);
        assert_eq!(app.cpu.regs.pc, 6);
        assert_eq!(app.resume_pc, None);

        // Later breakpoints still stop the run whatever the status says
        app.breakpoints.insert(9);
        app.status = "Running...".into();
        app.tick();
        app.tick();
        assert!(!app.running);
        assert_eq!(app.cpu.regs.pc, 9);
    }

    #[test]
    fn test_reset_reloads_program() {
        let mut app = DebuggerApp::new(MULT.to_vec());
        for _ in 0..5 {
            app.step();
        }

        app.reset();

        assert!(app.cpu.is_running());
        assert!(app.output.is_empty());
        assert_eq!(app.cpu.mem.read(0).unwrap(), MULT[0]);
    }

    #[test]
    fn test_disassembly_starts_at_pc() {
        let app = DebuggerApp::new(MULT.to_vec());
        let rows = app.get_disassembly(3);

        assert_eq!(rows[0], (0, "LDI R0,8".to_string(), true));
        assert_eq!(rows[1].0, 3);
        assert_eq!(rows[2], (6, "MUL R0,R1".to_string(), false));
    }
}
