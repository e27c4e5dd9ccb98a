//! LS-8 Emulator - CLI Entry Point
//!
//! `ls8-emu <program>` runs a program image (`.ls8`) or assembly source
//! (`.asm`) until it halts. Flags select tracing, disassembly, assembling
//! to an image, a JSON state dump, or the interactive debugger.

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Exit status for bad command-line usage.
const EXIT_USAGE: i32 = 1;

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of the LS-8 8-bit processor")]
struct Cli {
    /// Path to the program image (.ls8) or assembly source (.asm)
    program: String,

    /// Print a trace line before every instruction (to stderr)
    #[arg(short, long)]
    trace: bool,

    /// Stop after this many instructions
    #[arg(short, long)]
    max_cycles: Option<u64>,

    /// Print the disassembled program instead of running it
    #[arg(long, conflicts_with_all = ["assemble_to", "debug"])]
    disasm: bool,

    /// Write the program as a binary image to FILE instead of running it
    #[arg(long, value_name = "FILE", conflicts_with = "debug")]
    assemble_to: Option<String>,

    /// Print the final CPU state as JSON
    #[arg(long)]
    dump_state: bool,

    /// Open the interactive debugger
    #[arg(short, long)]
    debug: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(&e);
            if let Err(io_err) = e.print() {
                eprintln!("ls8-emu: failed to print usage: {}", io_err);
                std::process::exit(EXIT_USAGE);
            }
            std::process::exit(code);
        }
    };

    init_logging(cli.verbose);

    let image = match ls8::load_program(&cli.program) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("ls8-emu: {}", e);
            std::process::exit(e.exit_code());
        }
    };
    log::info!("loaded {} ({} bytes)", cli.program, image.len());

    if cli.disasm {
        print!("{}", ls8::disassemble(&image.bytes));
        return;
    }

    if let Some(out_path) = &cli.assemble_to {
        if let Err(e) = ls8::save_program(out_path, &image) {
            eprintln!("ls8-emu: {}", e);
            std::process::exit(e.exit_code());
        }
        log::info!("saved {} bytes to {}", image.len(), out_path);
        return;
    }

    if cli.debug {
        debug_program(image.bytes);
        return;
    }

    run_program(&cli, &image.bytes);
}

/// Exit status for a failed parse: 0 for `--help`/`--version`, else usage.
fn usage_exit_code(e: &clap::Error) -> i32 {
    if e.use_stderr() { EXIT_USAGE } else { 0 }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("ls8-emu: failed to initialize logging: {}", e);
    }
}

fn run_program(cli: &Cli, program: &[u8]) {
    use ls8::Cpu;
    use ls8::cpu::output;

    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load_program(program) {
        eprintln!("ls8-emu: failed to load {}: {}", cli.program, e);
        std::process::exit(ls8::asm::program::EXIT_LOAD_ERROR);
    }

    let mut out = output::stdout();
    let mut cycles = 0u64;
    while cpu.is_running() && cli.max_cycles.map_or(true, |max| cycles < max) {
        if cli.trace {
            eprintln!("{}", cpu.trace());
        }

        let pc = cpu.regs.pc;
        match cpu.step(&mut out) {
            Ok(_) => cycles += 1,
            Err(e) => {
                eprintln!("ls8-emu: error at PC={:#04X}: {}", pc, e);
                std::process::exit(e.exit_code());
            }
        }
    }

    if cpu.is_running() {
        log::warn!("reached max cycles limit ({}) without halting", cycles);
    } else {
        log::info!("halted after {} cycles", cycles);
    }

    if cli.dump_state {
        match serde_json::to_string_pretty(&cpu) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("ls8-emu: failed to serialize CPU state: {}", e);
                std::process::exit(1);
            }
        }
    }
}

#[cfg(feature = "tui")]
fn debug_program(program: Vec<u8>) {
    if let Err(e) = ls8::run_debugger(program) {
        eprintln!("ls8-emu: debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_program: Vec<u8>) {
    eprintln!("ls8-emu: built without the `tui` feature; the debugger is unavailable");
    std::process::exit(1);
}
