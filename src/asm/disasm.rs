//! Disassembler for LS-8 programs.
//!
//! Converts program bytes back to assembly the assembler accepts.

use crate::cpu::decode::{decode_bytes, Instruction};

/// One decoded line of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Address of the first byte.
    pub address: usize,
    /// Number of bytes covered.
    pub len: usize,
    /// Assembly text.
    pub text: String,
}

/// Disassemble the instruction starting at `address`.
///
/// Returns the text and the number of bytes it covers. Bytes that do not
/// start a complete instruction come back as a `DB` data byte.
pub fn disassemble_at(bytes: &[u8], address: usize) -> (String, usize) {
    let Some(rest) = bytes.get(address..) else {
        return (String::new(), 0);
    };

    match decode_bytes(rest, address) {
        Ok(Some(instr)) => (format_instruction(&instr), instr.len()),
        Ok(None) | Err(_) => match rest.first() {
            Some(byte) => (format!("DB {:#04X}", byte), 1),
            None => (String::new(), 0),
        },
    }
}

/// Walk `bytes` from address 0, one entry per instruction.
pub fn listing(bytes: &[u8]) -> Vec<ListingEntry> {
    let mut entries = Vec::new();
    let mut address = 0;

    while address < bytes.len() {
        let (text, len) = disassemble_at(bytes, address);
        entries.push(ListingEntry { address, len, text });
        address += len;
    }

    entries
}

/// Disassemble a whole program.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 Disassembly\n");
    output.push_str("; ----------------\n\n");

    for entry in listing(bytes) {
        let raw: Vec<String> = bytes[entry.address..entry.address + entry.len]
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect();
        output.push_str(&format!("{:02X}: {:<12} ; {}\n", entry.address, entry.text, raw.join(" ")));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let mnemonic = instr.opcode().mnemonic();
    match instr {
        Instruction::Hlt | Instruction::Ret => mnemonic.to_string(),

        Instruction::Prn { reg }
        | Instruction::Push { reg }
        | Instruction::Pop { reg }
        | Instruction::Call { reg }
        | Instruction::Jmp { reg }
        | Instruction::Jeq { reg }
        | Instruction::Jne { reg } => format!("{} R{}", mnemonic, reg),

        Instruction::Ldi { reg, value } => format!("{} R{},{}", mnemonic, reg, value),

        Instruction::Alu { a, b, .. } => format!("{} R{},R{}", mnemonic, a, b),
    }
}
