// Instruction layout
//
//          +--------+--------+--------+--------+
//          |31      |        |        |       0|
//          +--------+--------+--------+--------+
//          | opcode | data1  | data2  | flags  |
//          +--------+--------+--------+--------+
//
// The flags byte tags each data byte as either a direct index into the
// current call frame or an index into the immediate-value pool.

pub const OPCODE_OFFSET: u32 = 24;
pub const DATA1_OFFSET: u32 = 16;
pub const DATA2_OFFSET: u32 = 8;

pub const BYTE_MASK: u32 = 0xFF;

pub const DATA1_IMMEDIATE_FLAG: u32 = 0b01;
pub const DATA2_IMMEDIATE_FLAG: u32 = 0b10;

/// Memory slot 0 of every call frame: the implicit destination of all
/// arithmetic opcodes.
pub const A_INDEX: u8 = 0;

/// Upper bound on memory cells per call frame, fixed by the 8-bit operand
/// encoding.
pub const MAX_FRAME_SIZE: usize = 256;

pub const DEFAULT_MEMORY_SIZE: usize = 1024;
pub const DEFAULT_CALL_DEPTH: usize = 64;
