//! Execution of RASM programs.
//!
//! One [`VMState`](struct.VMState.html) owns a linear memory arena of
//! doubles and a bounded call-frame stack, both sized by the caller. The
//! program itself stays read-only and may be shared between concurrently
//! running states. All operand accesses are validated before the dispatch
//! loop starts, so the loop itself only has to watch for runtime faults
//! (division by zero, floating-point faults, call-stack exhaustion).

use std::error::Error as StdError;
use std::fmt;

use log::debug;

use crate::{constants, CallFrame, Instruction, MemoryIndex, OpCode, Program};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExecutionError {
    MismatchedInputs,
    MismatchedOutputs,
    UnknownOpCode,
    DivideByZero,
    InvalidOperand,
    StackOverflow,
    StackUnderflow,
    MemoryOverflow,
    FpException,
    InvalidInstructionAccess,
    LastInstructionNotHlt,
}

impl ExecutionError {
    pub fn reason(self) -> &'static str {
        match self {
            ExecutionError::MismatchedInputs => {
                "number of input values does not match the program's input identifiers"
            }
            ExecutionError::MismatchedOutputs => {
                "number of output slots does not match the program's output identifiers"
            }
            ExecutionError::UnknownOpCode => "unknown instruction opcode",
            ExecutionError::DivideByZero => "division by zero",
            ExecutionError::InvalidOperand => "invalid operand to mathematical function",
            ExecutionError::StackOverflow => "call stack overflow",
            ExecutionError::StackUnderflow => "call stack underflow",
            ExecutionError::MemoryOverflow => "memory arena exhausted",
            ExecutionError::FpException => "floating-point exception",
            ExecutionError::InvalidInstructionAccess => {
                "instruction accesses an index outside its call frame"
            }
            ExecutionError::LastInstructionNotHlt => {
                "last instruction of the main frame is not HLT"
            }
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl StdError for ExecutionError {}

#[derive(Clone, Copy, Debug)]
pub struct ExecutionOptions {
    /// Total number of memory cells available to the program.
    pub memory_size: usize,
    /// Maximum depth of the call-frame stack, main frame included.
    pub max_call_depth: usize,
}

impl Default for ExecutionOptions {
    fn default() -> ExecutionOptions {
        ExecutionOptions {
            memory_size: constants::DEFAULT_MEMORY_SIZE,
            max_call_depth: constants::DEFAULT_CALL_DEPTH,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub instructions_executed: u64,
    pub function_calls: u64,
}

struct ActiveFrame {
    descriptor: usize,
    instruction_pointer: usize,
}

pub struct VMState<'a> {
    program: &'a Program,
    memory: Vec<f64>,
    call_stack: Vec<ActiveFrame>,
    max_call_depth: usize,
    stack_pointer: usize,
    flag: bool,
    stats: ExecutionStats,
}

impl<'a> VMState<'a> {
    /// Validates the program against the given limits and prepares a fresh
    /// state with the main frame's memory region zero-initialized.
    pub fn new(
        program: &'a Program,
        options: &ExecutionOptions,
    ) -> Result<VMState<'a>, ExecutionError> {
        validate(program, options)?;

        let mut call_stack = Vec::with_capacity(options.max_call_depth);
        call_stack.push(ActiveFrame {
            descriptor: 0,
            instruction_pointer: 0,
        });

        Ok(VMState {
            program,
            memory: vec![0.0; options.memory_size],
            call_stack,
            max_call_depth: options.max_call_depth,
            stack_pointer: 0,
            flag: false,
            stats: ExecutionStats::default(),
        })
    }

    /// Copies the input values into main-frame cells `1..=n` in declaration
    /// order.
    pub fn set_inputs(&mut self, inputs: &[f64]) -> Result<(), ExecutionError> {
        if inputs.len() != self.program.num_inputs() {
            return Err(ExecutionError::MismatchedInputs);
        }
        for (slot, value) in self.memory[1..=inputs.len()].iter_mut().zip(inputs) {
            *slot = *value;
        }
        Ok(())
    }

    /// Copies the output cells into `outputs` in declaration order.
    pub fn read_outputs(&self, outputs: &mut [f64]) -> Result<(), ExecutionError> {
        if outputs.len() != self.program.num_outputs() {
            return Err(ExecutionError::MismatchedOutputs);
        }
        let base = 1 + self.program.num_inputs();
        outputs.copy_from_slice(&self.memory[base..base + outputs.len()]);
        Ok(())
    }

    pub fn memory(&self) -> &[f64] {
        &self.memory
    }

    pub fn stats(&self) -> ExecutionStats {
        self.stats
    }

    fn descriptor(&self) -> &'a CallFrame {
        // The call stack is never empty: RET refuses to pop the main frame.
        &self.program.call_frames[self.call_stack[self.call_stack.len() - 1].descriptor]
    }

    fn value_of(&self, index: MemoryIndex) -> f64 {
        match index {
            MemoryIndex::Immediate(value) => self.program.immediate_values[value as usize],
            MemoryIndex::Direct(value) => self.memory[self.stack_pointer + value as usize],
        }
    }

    fn location(&mut self, index: MemoryIndex) -> &mut f64 {
        &mut self.memory[self.stack_pointer + index.value() as usize]
    }

    fn set_result(&mut self, value: f64) -> Result<(), ExecutionError> {
        self.memory[self.stack_pointer] = check_arithmetic(value)?;
        Ok(())
    }

    fn jump(&mut self, target: MemoryIndex) {
        let top = self.call_stack.len() - 1;
        self.call_stack[top].instruction_pointer = target.value() as usize;
    }

    fn call(&mut self, target: MemoryIndex) -> Result<(), ExecutionError> {
        let callee = target.value() as usize;
        let new_stack_pointer = self.stack_pointer + self.descriptor().size as usize;
        let callee_size = self.program.call_frames[callee].size as usize;

        if self.call_stack.len() == self.max_call_depth {
            return Err(ExecutionError::StackOverflow);
        }
        if new_stack_pointer + callee_size > self.memory.len() {
            return Err(ExecutionError::MemoryOverflow);
        }

        self.stack_pointer = new_stack_pointer;
        self.call_stack.push(ActiveFrame {
            descriptor: callee,
            instruction_pointer: 0,
        });
        self.stats.function_calls += 1;
        Ok(())
    }

    fn ret(&mut self) -> Result<(), ExecutionError> {
        if self.call_stack.len() == 1 {
            return Err(ExecutionError::StackUnderflow);
        }

        // Slot 0 of the returning frame holds the call's result; transfer it
        // into the caller's A register.
        let result = self.memory[self.stack_pointer];
        self.call_stack.pop();
        self.stack_pointer -= self.descriptor().size as usize;
        self.memory[self.stack_pointer] = result;
        Ok(())
    }

    fn put(&mut self, a: MemoryIndex, b: MemoryIndex) -> Result<(), ExecutionError> {
        let target = self.stack_pointer + self.descriptor().size as usize + b.value() as usize;
        if target >= self.memory.len() {
            return Err(ExecutionError::MemoryOverflow);
        }
        self.memory[target] = self.value_of(a);
        Ok(())
    }

    /// Runs the dispatch loop until `HLT` or a fatal error. Fatal errors are
    /// one-way: no instruction is retried and no output is written.
    pub fn run(&mut self) -> Result<(), ExecutionError> {
        loop {
            let frame = self.descriptor();
            let top = self.call_stack.len() - 1;
            let instruction_pointer = self.call_stack[top].instruction_pointer;

            let instruction = match frame.instructions.get(instruction_pointer) {
                Some(instruction) => *instruction,
                None => return Err(ExecutionError::InvalidInstructionAccess),
            };
            self.call_stack[top].instruction_pointer = instruction_pointer + 1;
            self.stats.instructions_executed += 1;

            let a = instruction.a();
            let b = instruction.b();

            match instruction.op_code() {
                OpCode::MOV => {
                    let value = self.value_of(a);
                    *self.location(b) = value;
                }
                OpCode::ADD => self.set_result(self.value_of(a) + self.value_of(b))?,
                OpCode::SUB => self.set_result(self.value_of(a) - self.value_of(b))?,
                OpCode::MUL => self.set_result(self.value_of(a) * self.value_of(b))?,
                OpCode::DIV => {
                    let divisor = self.value_of(b);
                    if divisor == 0.0 {
                        return Err(ExecutionError::DivideByZero);
                    }
                    self.set_result(self.value_of(a) / divisor)?;
                }
                OpCode::MAG => self.set_result(self.value_of(a).abs())?,
                OpCode::FAC => self.set_result(factorial(self.value_of(a))?)?,
                OpCode::POW => self.set_result(self.value_of(a).powf(self.value_of(b)))?,
                OpCode::INC => {
                    let rhs = self.value_of(b);
                    let value = check_arithmetic(*self.location(a) + rhs)?;
                    *self.location(a) = value;
                }
                OpCode::DEC => {
                    let rhs = self.value_of(b);
                    let value = check_arithmetic(*self.location(a) - rhs)?;
                    *self.location(a) = value;
                }
                OpCode::MAS => {
                    let rhs = self.value_of(b);
                    let value = check_arithmetic(*self.location(a) * rhs)?;
                    *self.location(a) = value;
                }
                OpCode::DAS => {
                    let divisor = self.value_of(b);
                    if divisor == 0.0 {
                        return Err(ExecutionError::DivideByZero);
                    }
                    let value = check_arithmetic(*self.location(a) / divisor)?;
                    *self.location(a) = value;
                }
                OpCode::PAS => {
                    let rhs = self.value_of(b);
                    let value = check_arithmetic(self.location(a).powf(rhs))?;
                    *self.location(a) = value;
                }
                // CEQ/CNE compare bitwise so that comparisons stay total.
                OpCode::CLT => self.flag = self.value_of(a) < self.value_of(b),
                OpCode::CGT => self.flag = self.value_of(a) > self.value_of(b),
                OpCode::CEQ => self.flag = self.value_of(a).to_bits() == self.value_of(b).to_bits(),
                OpCode::CNE => self.flag = self.value_of(a).to_bits() != self.value_of(b).to_bits(),
                OpCode::JPZ => {
                    if !self.flag {
                        self.jump(a);
                    }
                }
                OpCode::JMP => self.jump(a),
                OpCode::HLT => return Ok(()),
                OpCode::JSR => self.call(a)?,
                OpCode::RET => self.ret()?,
                OpCode::PUT => self.put(a, b)?,
            }
        }
    }
}

/// Classifies a freshly produced arithmetic result the way a host with
/// IEEE-754 exception flags would: a NaN is a domain fault, an infinity an
/// overflow fault.
fn check_arithmetic(value: f64) -> Result<f64, ExecutionError> {
    if value.is_nan() {
        return Err(ExecutionError::InvalidOperand);
    }
    if value.is_infinite() {
        return Err(ExecutionError::FpException);
    }
    Ok(value)
}

fn factorial(value: f64) -> Result<f64, ExecutionError> {
    // The gamma function has poles at the non-positive integers.
    if value < 0.0 && value.fract() == 0.0 {
        return Err(ExecutionError::InvalidOperand);
    }
    Ok(libm::tgamma(value + 1.0))
}

fn check_value_operand(
    index: MemoryIndex,
    frame: &CallFrame,
    program: &Program,
) -> Result<(), ExecutionError> {
    let in_range = match index {
        MemoryIndex::Immediate(value) => (value as usize) < program.immediate_values.len(),
        MemoryIndex::Direct(value) => value < frame.size,
    };
    if in_range {
        Ok(())
    } else {
        Err(ExecutionError::InvalidInstructionAccess)
    }
}

fn check_location_operand(index: MemoryIndex, frame: &CallFrame) -> Result<(), ExecutionError> {
    match index {
        MemoryIndex::Direct(value) if value < frame.size => Ok(()),
        _ => Err(ExecutionError::InvalidInstructionAccess),
    }
}

fn check_instruction(
    instruction: Instruction,
    frame: &CallFrame,
    program: &Program,
) -> Result<(), ExecutionError> {
    let a = instruction.a();
    let b = instruction.b();

    match instruction.op_code() {
        OpCode::MOV => {
            check_value_operand(a, frame, program)?;
            check_location_operand(b, frame)
        }
        OpCode::ADD
        | OpCode::SUB
        | OpCode::MUL
        | OpCode::DIV
        | OpCode::POW
        | OpCode::CLT
        | OpCode::CGT
        | OpCode::CEQ
        | OpCode::CNE => {
            check_value_operand(a, frame, program)?;
            check_value_operand(b, frame, program)
        }
        OpCode::INC | OpCode::DEC | OpCode::MAS | OpCode::DAS | OpCode::PAS => {
            check_location_operand(a, frame)?;
            check_value_operand(b, frame, program)
        }
        OpCode::MAG | OpCode::FAC => check_value_operand(a, frame, program),
        OpCode::JPZ | OpCode::JMP => match a {
            MemoryIndex::Direct(target) if (target as usize) < frame.instructions.len() => Ok(()),
            _ => Err(ExecutionError::InvalidInstructionAccess),
        },
        OpCode::JSR => match a {
            MemoryIndex::Direct(target) if (target as usize) < program.call_frames.len() => Ok(()),
            _ => Err(ExecutionError::InvalidInstructionAccess),
        },
        OpCode::PUT => {
            check_value_operand(a, frame, program)?;
            // The destination lies in the callee frame, whose size is only
            // known at the matching JSR; the arena bound is checked there.
            match b {
                MemoryIndex::Direct(_) => Ok(()),
                MemoryIndex::Immediate(_) => Err(ExecutionError::InvalidInstructionAccess),
            }
        }
        OpCode::HLT | OpCode::RET => Ok(()),
    }
}

/// Static validation run once before execution: every operand of every
/// instruction must stay within its frame, the immediate pool, the frame
/// table or the instruction list, frame 0 must end in `HLT`, every other
/// frame in `RET`, and the main frame must fit the arena.
fn validate(program: &Program, options: &ExecutionOptions) -> Result<(), ExecutionError> {
    let main_frame = match program.main_frame() {
        Some(frame) => frame,
        None => return Err(ExecutionError::InvalidInstructionAccess),
    };

    match main_frame.instructions.last().map(|i| i.op_code()) {
        Some(OpCode::HLT) => {}
        _ => return Err(ExecutionError::LastInstructionNotHlt),
    }

    if options.max_call_depth == 0 {
        return Err(ExecutionError::StackOverflow);
    }
    if (main_frame.size as usize) > options.memory_size {
        return Err(ExecutionError::MemoryOverflow);
    }

    // Input and output identifiers occupy the lowest non-accumulator cells
    // of the main frame, so the frame must span them.
    let io_cells = 1 + program.num_inputs() + program.num_outputs();
    if (main_frame.size as usize) < io_cells {
        return Err(ExecutionError::InvalidInstructionAccess);
    }

    for frame in &program.call_frames[1..] {
        match frame.instructions.last().map(|i| i.op_code()) {
            Some(OpCode::RET) => {}
            _ => return Err(ExecutionError::InvalidInstructionAccess),
        }
    }

    for frame in &program.call_frames {
        if frame.size == 0 {
            return Err(ExecutionError::InvalidInstructionAccess);
        }
        for instruction in &frame.instructions {
            check_instruction(*instruction, frame, program)?;
        }
    }

    Ok(())
}

/// Executes `program` with default limits, writing the results into
/// `outputs`.
pub fn execute(
    program: &Program,
    inputs: &[f64],
    outputs: &mut [f64],
) -> Result<ExecutionStats, ExecutionError> {
    execute_with(program, inputs, outputs, &ExecutionOptions::default())
}

/// Executes `program` under the given limits.
///
/// The input and output slices must match the program's declared identifier
/// counts exactly; on any error no output is written.
pub fn execute_with(
    program: &Program,
    inputs: &[f64],
    outputs: &mut [f64],
    options: &ExecutionOptions,
) -> Result<ExecutionStats, ExecutionError> {
    if inputs.len() != program.num_inputs() {
        return Err(ExecutionError::MismatchedInputs);
    }
    if outputs.len() != program.num_outputs() {
        return Err(ExecutionError::MismatchedOutputs);
    }

    let mut state = VMState::new(program, options)?;
    state.set_inputs(inputs)?;
    state.run()?;
    state.read_outputs(outputs)?;

    debug!(
        "executed {} instructions ({} function calls)",
        state.stats.instructions_executed, state.stats.function_calls
    );

    Ok(state.stats())
}

/// Convenience wrapper that allocates the output vector.
pub fn run(program: &Program, inputs: &[f64]) -> Result<Vec<f64>, ExecutionError> {
    let mut outputs = vec![0.0; program.num_outputs()];
    execute(program, inputs, &mut outputs)?;
    Ok(outputs)
}
