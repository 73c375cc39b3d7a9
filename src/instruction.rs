use std::fmt;

use num_traits::{FromPrimitive, ToPrimitive};

use crate::{constants, OpCode, NUM_OP_CODES};

/// An 8-bit operand of an instruction.
///
/// `Direct` indices address cells of the live call frame, `Immediate` indices
/// address the program's read-only immediate-value pool. Jump-style opcodes
/// reuse `Direct` to carry instruction indices and frame ids.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MemoryIndex {
    Direct(u8),
    Immediate(u8),
}

impl MemoryIndex {
    pub fn value(self) -> u8 {
        match self {
            MemoryIndex::Direct(value) | MemoryIndex::Immediate(value) => value,
        }
    }

    pub fn is_immediate(self) -> bool {
        match self {
            MemoryIndex::Immediate(_) => true,
            MemoryIndex::Direct(_) => false,
        }
    }
}

impl Default for MemoryIndex {
    fn default() -> MemoryIndex {
        MemoryIndex::Direct(0)
    }
}

impl fmt::Display for MemoryIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MemoryIndex::Direct(value) => write!(f, "${}", value),
            MemoryIndex::Immediate(value) => write!(f, "#{}", value),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Instruction {
    op_code: OpCode,
    a: MemoryIndex,
    b: MemoryIndex,
}

impl Instruction {
    pub fn new(op_code: OpCode, a: MemoryIndex, b: MemoryIndex) -> Instruction {
        Instruction { op_code, a, b }
    }

    /// Constructs an instruction without operands (`HLT`, `RET`).
    pub fn nullary(op_code: OpCode) -> Instruction {
        Instruction::new(op_code, MemoryIndex::default(), MemoryIndex::default())
    }

    pub fn unary(op_code: OpCode, a: MemoryIndex) -> Instruction {
        Instruction::new(op_code, a, MemoryIndex::default())
    }

    pub fn op_code(self) -> OpCode {
        self.op_code
    }

    pub fn a(self) -> MemoryIndex {
        self.a
    }

    pub fn b(self) -> MemoryIndex {
        self.b
    }

    pub fn set_a(&mut self, a: MemoryIndex) {
        self.a = a;
    }

    pub fn set_b(&mut self, b: MemoryIndex) {
        self.b = b;
    }

    pub fn to_binary(self) -> u32 {
        let mut flags = 0u32;
        if self.a.is_immediate() {
            flags |= constants::DATA1_IMMEDIATE_FLAG;
        }
        if self.b.is_immediate() {
            flags |= constants::DATA2_IMMEDIATE_FLAG;
        }

        (u32::from(self.op_code.to_u8().unwrap_or(0)) << constants::OPCODE_OFFSET)
            | (u32::from(self.a.value()) << constants::DATA1_OFFSET)
            | (u32::from(self.b.value()) << constants::DATA2_OFFSET)
            | flags
    }

    /// Decodes an instruction from its 32-bit representation. Returns `None`
    /// if the opcode byte does not name a known opcode.
    pub fn from_binary(data: u32) -> Option<Instruction> {
        let op_code_value = ((data >> constants::OPCODE_OFFSET) & constants::BYTE_MASK) as u8;
        if op_code_value >= NUM_OP_CODES {
            return None;
        }
        let op_code = OpCode::from_u8(op_code_value)?;

        let data1 = ((data >> constants::DATA1_OFFSET) & constants::BYTE_MASK) as u8;
        let data2 = ((data >> constants::DATA2_OFFSET) & constants::BYTE_MASK) as u8;

        let a = if data & constants::DATA1_IMMEDIATE_FLAG != 0 {
            MemoryIndex::Immediate(data1)
        } else {
            MemoryIndex::Direct(data1)
        };
        let b = if data & constants::DATA2_IMMEDIATE_FLAG != 0 {
            MemoryIndex::Immediate(data2)
        } else {
            MemoryIndex::Direct(data2)
        };

        Some(Instruction::new(op_code, a, b))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let num_args = self.op_code.number_of_arguments();

        write!(f, "{}", self.op_code)?;
        if num_args > 0 {
            write!(f, " {}", self.a)?;
        }
        if num_args > 1 {
            write!(f, " {}", self.b)?;
        }
        Ok(())
    }
}
