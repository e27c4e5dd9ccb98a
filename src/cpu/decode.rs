//! Instruction decoder for the LS-8.
//!
//! Every opcode byte has the layout `AABCDDDD`:
//! - `AA`: number of operand bytes that follow (0-2)
//! - `B`: the instruction is handled by the ALU
//! - `C`: the instruction sets the PC itself
//! - `DDDD`: instruction identifier

use crate::cpu::alu::{AluError, AluOp};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Serialize, Deserialize};
use thiserror::Error;

const OPERAND_COUNT_SHIFT: u32 = 6;
const IDENTIFIER_MASK: u8 = 0b0000_1111;

/// Bits shared by every two-operand ALU opcode.
const ALU_FAMILY_MASK: u8 = 0b1110_0000;
const ALU_FAMILY: u8 = 0b1010_0000;

/// The LS-8 opcode table.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(TryFromPrimitive, IntoPrimitive)]
pub enum Opcode {
    Hlt = 0b0000_0001,
    Ret = 0b0001_0001,
    Push = 0b0100_0101,
    Pop = 0b0100_0110,
    Prn = 0b0100_0111,
    Call = 0b0101_0000,
    Jmp = 0b0101_0100,
    Jeq = 0b0101_0101,
    Jne = 0b0101_0110,
    Ldi = 0b1000_0010,
    Add = 0b1010_0000,
    Mul = 0b1010_0010,
    Cmp = 0b1010_0111,
}

impl Opcode {
    pub const ALL: [Opcode; 13] = [
        Opcode::Hlt,
        Opcode::Ret,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Prn,
        Opcode::Call,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
        Opcode::Ldi,
        Opcode::Add,
        Opcode::Mul,
        Opcode::Cmp,
    ];

    /// Number of operand bytes following the opcode.
    pub fn operand_count(self) -> usize {
        operand_count(self.into())
    }

    /// Total instruction length in bytes.
    pub fn len(self) -> usize {
        1 + self.operand_count()
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Ret => "RET",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Prn => "PRN",
            Opcode::Call => "CALL",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
            Opcode::Ldi => "LDI",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Cmp => "CMP",
        }
    }

    /// Look an opcode up by its mnemonic (case-insensitive).
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Decoded LS-8 instruction.
///
/// Register operands are kept as raw bytes; the executor validates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Data Movement ====================

    /// Load immediate: R[reg] := value
    Ldi { reg: u8, value: u8 },

    /// Print register to the output sink
    Prn { reg: u8 },

    /// Halt execution
    Hlt,

    // ==================== Stack ====================

    /// SP -= 1; [SP] := R[reg]
    Push { reg: u8 },

    /// R[reg] := [SP]; SP += 1
    Pop { reg: u8 },

    // ==================== Control Flow ====================

    /// Push return address, PC := R[reg]
    Call { reg: u8 },

    /// PC := pop
    Ret,

    /// PC := R[reg]
    Jmp { reg: u8 },

    /// Jump if the Equal flag is set
    Jeq { reg: u8 },

    /// Jump if the Equal flag is clear
    Jne { reg: u8 },

    // ==================== ALU ====================

    /// ALU operation on R[a] and R[b]
    Alu { op: AluOp, a: u8, b: u8 },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Prn { .. } => Opcode::Prn,
            Instruction::Hlt => Opcode::Hlt,
            Instruction::Push { .. } => Opcode::Push,
            Instruction::Pop { .. } => Opcode::Pop,
            Instruction::Call { .. } => Opcode::Call,
            Instruction::Ret => Opcode::Ret,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jeq { .. } => Opcode::Jeq,
            Instruction::Jne { .. } => Opcode::Jne,
            Instruction::Alu { op: AluOp::Add, .. } => Opcode::Add,
            Instruction::Alu { op: AluOp::Mul, .. } => Opcode::Mul,
            Instruction::Alu { op: AluOp::Cmp, .. } => Opcode::Cmp,
        }
    }

    /// Length of the encoded instruction in bytes.
    pub fn len(&self) -> usize {
        self.opcode().len()
    }
}

/// Number of operand bytes announced by any opcode byte, known or not.
pub fn operand_count(byte: u8) -> usize {
    (byte >> OPERAND_COUNT_SHIFT) as usize
}

/// Resolve the opcode byte fetched from `address`.
///
/// Bytes in the two-operand ALU family are routed to the ALU, which may
/// not implement them; anything else must be in the opcode table.
pub fn decode_opcode(byte: u8, address: usize) -> Result<Opcode, DecodeError> {
    if byte & ALU_FAMILY_MASK == ALU_FAMILY {
        AluOp::from_identifier(byte & IDENTIFIER_MASK).map_err(|source| {
            DecodeError::UnsupportedAluOp { opcode: byte, address, source }
        })?;
    }

    Opcode::try_from(byte).map_err(|_| DecodeError::UnknownOpcode { opcode: byte, address })
}

/// Build an instruction from its opcode and operand bytes.
///
/// `operands` must hold at least `opcode.operand_count()` bytes.
pub fn decode(opcode: Opcode, operands: &[u8]) -> Instruction {
    let a = operands.first().copied().unwrap_or(0);
    let b = operands.get(1).copied().unwrap_or(0);

    match opcode {
        Opcode::Hlt => Instruction::Hlt,
        Opcode::Ret => Instruction::Ret,
        Opcode::Push => Instruction::Push { reg: a },
        Opcode::Pop => Instruction::Pop { reg: a },
        Opcode::Prn => Instruction::Prn { reg: a },
        Opcode::Call => Instruction::Call { reg: a },
        Opcode::Jmp => Instruction::Jmp { reg: a },
        Opcode::Jeq => Instruction::Jeq { reg: a },
        Opcode::Jne => Instruction::Jne { reg: a },
        Opcode::Ldi => Instruction::Ldi { reg: a, value: b },
        Opcode::Add => Instruction::Alu { op: AluOp::Add, a, b },
        Opcode::Mul => Instruction::Alu { op: AluOp::Mul, a, b },
        Opcode::Cmp => Instruction::Alu { op: AluOp::Cmp, a, b },
    }
}

/// Decode the instruction at the start of `bytes`, if it is complete.
pub fn decode_bytes(bytes: &[u8], address: usize) -> Result<Option<Instruction>, DecodeError> {
    let Some(&byte) = bytes.first() else {
        return Ok(None);
    };
    let opcode = decode_opcode(byte, address)?;
    let operands = &bytes[1..];
    if operands.len() < opcode.operand_count() {
        return Ok(None);
    }
    Ok(Some(decode(opcode, operands)))
}

/// Encode an instruction back to bytes.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let opcode = u8::from(instr.opcode());
    match *instr {
        Instruction::Hlt | Instruction::Ret => vec![opcode],
        Instruction::Push { reg }
        | Instruction::Pop { reg }
        | Instruction::Prn { reg }
        | Instruction::Call { reg }
        | Instruction::Jmp { reg }
        | Instruction::Jeq { reg }
        | Instruction::Jne { reg } => vec![opcode, reg],
        Instruction::Ldi { reg, value } => vec![opcode, reg, value],
        Instruction::Alu { a, b, .. } => vec![opcode, a, b],
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no instruction {opcode:#010b} at address {address:#04X}")]
    UnknownOpcode { opcode: u8, address: usize },

    #[error("{source} (opcode {opcode:#010b}) at address {address:#04X}")]
    UnsupportedAluOp {
        opcode: u8,
        address: usize,
        #[source]
        source: AluError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_layout() {
        assert_eq!(Opcode::Hlt.len(), 1);
        assert_eq!(Opcode::Ret.len(), 1);
        assert_eq!(Opcode::Prn.len(), 2);
        assert_eq!(Opcode::Jeq.len(), 2);
        assert_eq!(Opcode::Ldi.len(), 3);
        assert_eq!(Opcode::Cmp.len(), 3);

        // Every ALU opcode sits in the family the decoder routes to the ALU
        for op in [Opcode::Add, Opcode::Mul, Opcode::Cmp] {
            assert_eq!(u8::from(op) & ALU_FAMILY_MASK, ALU_FAMILY);
        }
    }

    #[test]
    fn test_decode_opcode_known() {
        assert_eq!(decode_opcode(0b0000_0001, 0), Ok(Opcode::Hlt));
        assert_eq!(decode_opcode(0b1000_0010, 0), Ok(Opcode::Ldi));
        assert_eq!(decode_opcode(0b1010_0010, 0), Ok(Opcode::Mul));
    }

    #[test]
    fn test_decode_opcode_unknown() {
        let err = decode_opcode(0b1111_1111, 0x10).unwrap_err();
        assert_eq!(err, DecodeError::UnknownOpcode { opcode: 0xFF, address: 0x10 });

        assert!(matches!(
            decode_opcode(0x00, 0),
            Err(DecodeError::UnknownOpcode { opcode: 0, .. })
        ));
    }

    #[test]
    fn test_decode_opcode_unsupported_alu() {
        // DIV-shaped: two operands, ALU flag, identifier 3
        let err = decode_opcode(0b1010_0011, 4).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnsupportedAluOp {
                opcode: 0b1010_0011,
                address: 4,
                source: AluError::Unsupported(3),
            }
        );
    }

    #[test]
    fn test_decode_bytes() {
        assert_eq!(
            decode_bytes(&[0b1000_0010, 1, 9], 0),
            Ok(Some(Instruction::Ldi { reg: 1, value: 9 }))
        );
        assert_eq!(
            decode_bytes(&[0b1010_0111, 0, 1], 0),
            Ok(Some(Instruction::Alu { op: AluOp::Cmp, a: 0, b: 1 }))
        );
        // truncated
        assert_eq!(decode_bytes(&[0b1000_0010, 1], 0), Ok(None));
        assert_eq!(decode_bytes(&[], 0), Ok(None));
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(&Instruction::Hlt), vec![0b0000_0001]);
        assert_eq!(encode(&Instruction::Prn { reg: 0 }), vec![0b0100_0111, 0]);
        assert_eq!(
            encode(&Instruction::Alu { op: AluOp::Mul, a: 0, b: 1 }),
            vec![0b1010_0010, 0, 1]
        );
        assert_eq!(Instruction::Ldi { reg: 0, value: 8 }.len(), 3);
    }

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(Opcode::from_mnemonic("ldi"), Some(Opcode::Ldi));
        assert_eq!(Opcode::from_mnemonic("JNE"), Some(Opcode::Jne));
        assert_eq!(Opcode::from_mnemonic("DIV"), None);
    }
}
