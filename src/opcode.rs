use std::fmt;
use std::str::FromStr;

use num_derive::{FromPrimitive, ToPrimitive};
use util::ParseEnumError;

/// Number of opcodes in the instruction set. Anything at or above this value
/// in the opcode byte of an encoded instruction is rejected.
pub const NUM_OP_CODES: u8 = 23;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, FromPrimitive, ToPrimitive)]
pub enum OpCode {
    //  Mnemonic | Operands | Effect
    //-----------+----------+--------------------------------------------------
    MOV, // | a, b     | frame[b] = value(a)
    //-----------+----------+--------------------------------------------------
    // Arithmetic (results land in the A register, frame slot 0)
    ADD, // | a, b     | A = value(a) + value(b)
    SUB, // | a, b     | A = value(a) - value(b)
    MUL, // | a, b     | A = value(a) * value(b)
    DIV, // | a, b     | A = value(a) / value(b); value(b) == 0 is fatal
    MAG, // | a        | A = |value(a)|
    FAC, // | a        | A = gamma(value(a) + 1)
    POW, // | a, b     | A = value(a) ^ value(b)
    //-----------+----------+--------------------------------------------------
    // In-place compound assignment
    INC, // | a, b     | frame[a] += value(b)
    DEC, // | a, b     | frame[a] -= value(b)
    MAS, // | a, b     | frame[a] *= value(b)
    DAS, // | a, b     | frame[a] /= value(b)
    PAS, // | a, b     | frame[a] ^= value(b)
    //-----------+----------+--------------------------------------------------
    // Comparisons (set the boolean flag)
    CLT, // | a, b     | flag = value(a) < value(b)
    CGT, // | a, b     | flag = value(a) > value(b)
    CEQ, // | a, b     | flag = value(a) == value(b)
    CNE, // | a, b     | flag = value(a) != value(b)
    //-----------+----------+--------------------------------------------------
    // Control flow (jump targets are absolute within the current frame)
    JPZ, // | t        | if !flag { ip = t }
    JMP, // | t        | ip = t
    HLT, // |          | stop execution
    JSR, // | f        | push a call frame for descriptor f
    RET, // |          | transfer A to the caller and pop the current frame
    PUT, // | a, b     | next-frame[b] = value(a); marshals call arguments
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::MOV => "MOV",
            OpCode::ADD => "ADD",
            OpCode::SUB => "SUB",
            OpCode::MUL => "MUL",
            OpCode::DIV => "DIV",
            OpCode::MAG => "MAG",
            OpCode::FAC => "FAC",
            OpCode::POW => "POW",
            OpCode::INC => "INC",
            OpCode::DEC => "DEC",
            OpCode::MAS => "MAS",
            OpCode::DAS => "DAS",
            OpCode::PAS => "PAS",
            OpCode::CLT => "CLT",
            OpCode::CGT => "CGT",
            OpCode::CEQ => "CEQ",
            OpCode::CNE => "CNE",
            OpCode::JPZ => "JPZ",
            OpCode::JMP => "JMP",
            OpCode::HLT => "HLT",
            OpCode::JSR => "JSR",
            OpCode::RET => "RET",
            OpCode::PUT => "PUT",
        }
    }

    pub fn number_of_arguments(self) -> usize {
        match self {
            OpCode::MOV
            | OpCode::ADD
            | OpCode::SUB
            | OpCode::MUL
            | OpCode::DIV
            | OpCode::POW
            | OpCode::INC
            | OpCode::DEC
            | OpCode::MAS
            | OpCode::DAS
            | OpCode::PAS
            | OpCode::CLT
            | OpCode::CGT
            | OpCode::CEQ
            | OpCode::CNE
            | OpCode::PUT => 2,
            OpCode::MAG | OpCode::FAC | OpCode::JPZ | OpCode::JMP | OpCode::JSR => 1,
            OpCode::HLT | OpCode::RET => 0,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for OpCode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<OpCode, ParseEnumError> {
        let code = match s.to_uppercase().as_str() {
            "MOV" => OpCode::MOV,
            "ADD" => OpCode::ADD,
            "SUB" => OpCode::SUB,
            "MUL" => OpCode::MUL,
            "DIV" => OpCode::DIV,
            "MAG" => OpCode::MAG,
            "FAC" => OpCode::FAC,
            "POW" => OpCode::POW,
            "INC" => OpCode::INC,
            "DEC" => OpCode::DEC,
            "MAS" => OpCode::MAS,
            "DAS" => OpCode::DAS,
            "PAS" => OpCode::PAS,
            "CLT" => OpCode::CLT,
            "CGT" => OpCode::CGT,
            "CEQ" => OpCode::CEQ,
            "CNE" => OpCode::CNE,
            "JPZ" => OpCode::JPZ,
            "JMP" => OpCode::JMP,
            "HLT" => OpCode::HLT,
            "JSR" => OpCode::JSR,
            "RET" => OpCode::RET,
            "PUT" => OpCode::PUT,
            _ => return Err(ParseEnumError::new(s, "OpCode")),
        };
        Ok(code)
    }
}
