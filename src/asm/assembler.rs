//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment (`#` works too)
//! LABEL:          ; Define a label
//!     LDI R0,8    ; Load immediate
//!     LDI R2,LOOP ; Labels are valid immediates
//!     MUL R0,R1   ; Register operands are R0-R7 (SP = R7)
//!     CALL R2
//!     HLT
//!     DB 0x2A     ; Define a data byte
//! ```

use crate::cpu::decode::{encode, decode, Opcode};
use crate::cpu::registers::{REGISTER_COUNT, STACK_POINTER};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to program bytes.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> address).
    symbols: HashMap<String, usize>,
    /// Pending label references: (output_index, label, source_line).
    pending: Vec<(usize, String, usize)>,
    /// Output bytes.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve forward references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = line
            .split(|c: char| c == ';' || c == '#')
            .next()
            .unwrap_or("")
            .trim();

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if !is_label(&label) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label `{}`", &line[..colon_idx]),
                });
            }
            if self.symbols.insert(label.clone(), self.output.len()).is_some() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("label `{}` defined twice", label),
                });
            }
            log::debug!("[{}] label {} = {:#04X}", line_num, label, self.output.len());

            // Process rest of line if any
            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_statement(rest, line_num);
            }
            return Ok(());
        }

        self.process_statement(line, line_num)
    }

    fn process_statement(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((mnemonic, rest)) => (mnemonic, rest.trim()),
            None => (line, ""),
        };
        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };
        let mnemonic = mnemonic.to_uppercase();

        // Directives
        if mnemonic == "DB" {
            let [value] = operands.as_slice() else {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "DB requires exactly one value".into(),
                });
            };
            let value = self.parse_immediate(value, line_num)?;
            self.output.push(value);
            return Ok(());
        }

        // Instructions
        let opcode = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| {
            AssemblerError::UnknownMnemonic { line: line_num, mnemonic: mnemonic.clone() }
        })?;

        if operands.len() != opcode.operand_count() {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!(
                    "{} takes {} operand(s), found {}",
                    opcode,
                    opcode.operand_count(),
                    operands.len()
                ),
            });
        }

        let mut bytes = [0u8; 2];
        for (i, operand) in operands.iter().enumerate() {
            bytes[i] = if opcode == Opcode::Ldi && i == 1 {
                // Placeholder index: opcode byte + operand position
                self.with_pending(operand, self.output.len() + 1 + i, line_num)?
            } else {
                parse_register(operand, line_num)?
            };
        }

        let instr = decode(opcode, &bytes);
        self.output.extend(encode(&instr));
        Ok(())
    }

    /// Parse an immediate, deferring label references to pass 2.
    fn with_pending(&mut self, operand: &str, out_idx: usize, line_num: usize) -> Result<u8, AssemblerError> {
        if is_label(&operand.to_uppercase()) {
            self.pending.push((out_idx, operand.to_uppercase(), line_num));
            return Ok(0); // Placeholder, will be resolved in pass 2
        }
        self.parse_immediate(operand, line_num)
    }

    fn parse_immediate(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let value = parse_number(operand).ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number `{}`", operand),
        })?;

        u8::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, label, line_num) in &self.pending {
            let addr = *self.symbols.get(label)
                .ok_or_else(|| AssemblerError::UndefinedLabel {
                    line: *line_num,
                    label: label.clone(),
                })?;

            let addr = u8::try_from(addr).map_err(|_| AssemblerError::ValueOutOfRange {
                line: *line_num,
                value: addr as i64,
            })?;
            self.output[*out_idx] = addr;
        }
        Ok(())
    }
}

fn is_label(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_register(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let upper = operand.to_uppercase();
    if upper == "SP" {
        return Ok(STACK_POINTER as u8);
    }

    upper
        .strip_prefix('R')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|&n| (n as usize) < REGISTER_COUNT)
        .ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("expected register R0-R7, found `{}`", operand),
        })
}

fn parse_number(operand: &str) -> Option<i64> {
    let lower = operand.to_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        lower.parse::<i64>().ok()
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::program::parse_program;

    #[test]
    fn test_assemble_mult() {
        let source = r#"
            ; print 8 * 9
            LDI R0,8
            LDI R1,9
            MUL R0,R1
            PRN R0
            HLT
        "#;

        let bytes = assemble(source).unwrap();
        let expected = parse_program(include_str!("../../demos/mult.ls8")).unwrap();
        assert_eq!(bytes, expected.bytes);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
            LDI R1, Sub   # forward reference
            CALL R1
            HLT
        Sub:
            LDI R0, 0x2A
            PRN R0
            RET
        "#;

        let bytes = assemble(source).unwrap();
        assert_eq!(bytes[0..3], [0b1000_0010, 1, 6]);
        assert_eq!(bytes[3..5], [0b0101_0000, 1]);
        assert_eq!(bytes[6..9], [0b1000_0010, 0, 42]);
        assert_eq!(bytes.len(), 12);
    }

    #[test]
    fn test_assemble_stack_pointer_alias() {
        let bytes = assemble("PUSH SP\nPOP r3").unwrap();
        assert_eq!(bytes, vec![0b0100_0101, 7, 0b0100_0110, 3]);
    }

    #[test]
    fn test_assemble_data() {
        let bytes = assemble("DB 42\nDB 0b101\nDB 0xff").unwrap();
        assert_eq!(bytes, vec![42, 5, 255]);
    }

    #[test]
    fn test_assemble_errors() {
        assert!(matches!(
            assemble("DIV R0,R1"),
            Err(AssemblerError::UnknownMnemonic { line: 1, .. })
        ));
        assert!(matches!(
            assemble("HLT\nPRN R8"),
            Err(AssemblerError::SyntaxError { line: 2, .. })
        ));
        assert!(matches!(
            assemble("LDI R0,256"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 256 })
        ));
        assert!(matches!(
            assemble("LDI R0,NOWHERE"),
            Err(AssemblerError::UndefinedLabel { line: 1, .. })
        ));
        assert!(matches!(
            assemble("MUL R0"),
            Err(AssemblerError::SyntaxError { line: 1, .. })
        ));
    }
}
