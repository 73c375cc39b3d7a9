//! Data model and virtual machine for RASM, the bytecode produced by the
//! [rsc](../rsc/index.html) compiler.
//!
//! A RASM [`Program`](struct.Program.html) is a list of call frames, each a
//! flat instruction vector over double-precision memory cells, plus a shared
//! pool of immediate values and the names of the script's input and output
//! variables. The [`vm`](vm/index.html) module executes such programs on a
//! caller-sized memory arena with a bounded call-frame stack.

pub mod constants;
mod instruction;
mod opcode;
mod program;
pub mod vm;

pub use self::instruction::{Instruction, MemoryIndex};
pub use self::opcode::{OpCode, NUM_OP_CODES};
pub use self::program::{CallFrame, Program};
pub use self::vm::{
    execute, execute_with, run, ExecutionError, ExecutionOptions, ExecutionStats, VMState,
};
