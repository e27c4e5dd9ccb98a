//! Program image format for LS-8 programs.
//!
//! A program image is a simple text format:
//! - One byte per line, written as 8 binary digits
//! - `#` starts a comment that runs to the end of the line
//! - Blank and comment-only lines are ignored
//!
//! Bytes are loaded into memory from address 0 in file order.

use crate::asm::assembler::{assemble, AssemblerError};
use crate::asm::disasm::listing;
use std::path::Path;
use std::io::Write;
use thiserror::Error;

/// Exit status for a program that cannot be loaded.
pub const EXIT_LOAD_ERROR: i32 = 2;

/// A loaded program image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    /// The program bytes, starting at address 0.
    pub bytes: Vec<u8>,
}

impl ProgramImage {
    /// Create a new empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an image from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Add a byte.
    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Get the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Parse the text of a program image.
pub fn parse_program(text: &str) -> Result<ProgramImage, LoadError> {
    let mut image = ProgramImage::new();

    for (line_num, line) in text.lines().enumerate() {
        let code = line.split('#').next().unwrap_or("").trim();

        // Skip empty lines and comments
        if code.is_empty() {
            continue;
        }

        if code.len() != 8 || !code.bytes().all(|c| c == b'0' || c == b'1') {
            return Err(LoadError::Parse {
                line: line_num + 1,
                message: format!("expected 8 binary digits, found `{}`", code),
            });
        }

        let byte = u8::from_str_radix(code, 2).map_err(|e| LoadError::Parse {
            line: line_num + 1,
            message: e.to_string(),
        })?;

        image.push(byte);
    }

    log::debug!("parsed program image: {} bytes", image.len());
    Ok(image)
}

/// Load a program from disk.
///
/// Files ending in `.asm` are assembled; anything else is read as a
/// program image.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<ProgramImage, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let is_asm = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("asm"));

    if is_asm {
        let bytes = assemble(&text)?;
        log::debug!("assembled {}: {} bytes", path.display(), bytes.len());
        Ok(ProgramImage::from_bytes(bytes))
    } else {
        parse_program(&text)
    }
}

/// Render bytes as a program image, annotating each instruction with its
/// address and disassembly.
pub fn render_program(bytes: &[u8]) -> String {
    let mut text = String::from("# LS-8 program image\n");
    text.push_str(&format!("# {} bytes\n\n", bytes.len()));

    for entry in listing(bytes) {
        for (i, byte) in bytes[entry.address..entry.address + entry.len].iter().enumerate() {
            if i == 0 {
                text.push_str(&format!("{:08b} # {:02X}: {}\n", byte, entry.address, entry.text));
            } else {
                text.push_str(&format!("{:08b}\n", byte));
            }
        }
    }

    text
}

/// Save a program image to disk.
pub fn save_program<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), LoadError> {
    let path = path.as_ref();
    let io_error = |e: std::io::Error| LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut file = std::fs::File::create(path).map_err(io_error)?;
    file.write_all(render_program(&image.bytes).as_bytes()).map_err(io_error)?;

    Ok(())
}

/// Errors that can occur while loading a program.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblerError),
}

impl LoadError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        EXIT_LOAD_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULT: &str = include_str!("../../demos/mult.ls8");

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "\
# header comment

10000010 # LDI R0,8
00000000
00001000

00000001 # HLT
";
        let image = parse_program(text).unwrap();

        assert_eq!(image.bytes, vec![0b1000_0010, 0, 8, 1]);
    }

    #[test]
    fn test_parse_demo() {
        let image = parse_program(MULT).unwrap();

        assert_eq!(
            image.bytes,
            vec![
                0b1000_0010, 0, 8,
                0b1000_0010, 1, 9,
                0b1010_0010, 0, 1,
                0b0100_0111, 0,
                0b0000_0001,
            ]
        );
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        let err = parse_program("00000001\n0000201x\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 2, .. }));

        let err = parse_program("101\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 1, .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_program("no/such/program.ls8").unwrap_err();

        match &err {
            LoadError::Io { path, .. } => assert_eq!(path, "no/such/program.ls8"),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_render_round_trip() {
        let image = parse_program(MULT).unwrap();

        let text = render_program(&image.bytes);

        assert!(text.contains("10100010 # 06: MUL R0,R1"));
        assert_eq!(parse_program(&text).unwrap().bytes, image.bytes);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("ls8-save-{}.ls8", std::process::id()));
        let image = ProgramImage::from_bytes(vec![0b1000_0010, 3, 200, 0b0000_0001]);

        save_program(&path, &image).unwrap();
        let loaded = load_program(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.bytes, image.bytes);
    }
}
