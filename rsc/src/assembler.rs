//! Lowering of the AST to a RASM [`Program`](../../rvm/struct.Program.html).
//!
//! Each call frame is assembled with its own context: a name map for the
//! visible scope chain, a pool of reusable intermediate cells and a scope
//! stack that rolls both back when a scope exits. Immediate values live in
//! one pool shared by all frames.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error as StdError;
use std::fmt;

use log::debug;

use rvm::{constants, CallFrame, Instruction, MemoryIndex, OpCode, Program};

use crate::ast::{ArithmeticOp, Ast, AstNode, RelationalOp, UnaryOp};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AssemblerError {
    DuplicateName,
    UnresolvedIdentifier,
    UnknownArithmeticExpression,
    InvalidScopePop,
    NotImplemented,
    FrameTooLarge,
    TooManyImmediates,
}

impl AssemblerError {
    pub fn reason(self) -> &'static str {
        match self {
            AssemblerError::DuplicateName => "duplicate variable name",
            AssemblerError::UnresolvedIdentifier => "unresolved identifier",
            AssemblerError::UnknownArithmeticExpression => "unknown arithmetic expression",
            AssemblerError::InvalidScopePop => "scope pop without a matching scope push",
            AssemblerError::NotImplemented => "construct is not implemented",
            AssemblerError::FrameTooLarge => {
                "call frame exceeds the addressable range of the instruction encoding"
            }
            AssemblerError::TooManyImmediates => "too many distinct immediate values",
        }
    }
}

impl fmt::Display for AssemblerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl StdError for AssemblerError {}

/// Program-wide pool of numeric literals, deduplicated by bit pattern.
#[derive(Default)]
struct ImmediatePool {
    indices: HashMap<u64, MemoryIndex>,
    values: Vec<f64>,
}

impl ImmediatePool {
    fn allocate(&mut self, value: f64) -> Result<MemoryIndex, AssemblerError> {
        if let Some(index) = self.indices.get(&value.to_bits()) {
            return Ok(*index);
        }
        if self.values.len() >= constants::MAX_FRAME_SIZE {
            return Err(AssemblerError::TooManyImmediates);
        }
        let index = MemoryIndex::Immediate(self.values.len() as u8);
        self.indices.insert(value.to_bits(), index);
        self.values.push(value);
        Ok(index)
    }
}

struct ScopeData {
    names: Vec<String>,
    saved_index: usize,
}

struct AssemblingContext<'a> {
    instructions: Vec<Instruction>,
    names: HashMap<String, MemoryIndex>,
    scopes: Vec<ScopeData>,
    /// Spill slots as `(free, index)` pairs; all slots are released between
    /// top-level statements.
    intermediates: Vec<(bool, MemoryIndex)>,
    /// Every cell that was ever handed out as an intermediate or bound to a
    /// name. Scope rollback can assign one cell both roles over the frame's
    /// lifetime, and such cells must not take part in mov fusion.
    ever_intermediates: HashSet<u8>,
    ever_names: HashSet<u8>,
    current_index: usize,
    max_index: usize,
    immediates: &'a mut ImmediatePool,
    function_frames: &'a BTreeMap<String, usize>,
}

impl<'a> AssemblingContext<'a> {
    fn new(
        immediates: &'a mut ImmediatePool,
        function_frames: &'a BTreeMap<String, usize>,
    ) -> AssemblingContext<'a> {
        AssemblingContext {
            instructions: Vec::new(),
            names: HashMap::new(),
            scopes: Vec::new(),
            intermediates: Vec::new(),
            ever_intermediates: HashSet::new(),
            ever_names: HashSet::new(),
            // Index 0 is reserved for the A register.
            current_index: 1,
            max_index: 1,
            immediates,
            function_frames,
        }
    }

    fn a_index(&self) -> MemoryIndex {
        MemoryIndex::Direct(constants::A_INDEX)
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    fn instruction_index(&self) -> usize {
        self.instructions.len()
    }

    fn new_index(&mut self) -> Result<MemoryIndex, AssemblerError> {
        if self.current_index >= constants::MAX_FRAME_SIZE {
            return Err(AssemblerError::FrameTooLarge);
        }
        let index = MemoryIndex::Direct(self.current_index as u8);
        self.current_index += 1;
        self.max_index = self.max_index.max(self.current_index);
        Ok(index)
    }

    fn has_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    fn memory_index_for(&self, name: &str) -> Option<MemoryIndex> {
        self.names.get(name).copied()
    }

    fn allocate_variable(&mut self, name: &str) -> Result<MemoryIndex, AssemblerError> {
        let index = self.new_index()?;
        self.ever_names.insert(index.value());
        self.names.insert(name.to_owned(), index);
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.push(name.to_owned());
        }
        Ok(index)
    }

    fn allocate_intermediate(&mut self) -> Result<MemoryIndex, AssemblerError> {
        for (free, index) in self.intermediates.iter_mut() {
            if *free {
                *free = false;
                return Ok(*index);
            }
        }
        let index = self.new_index()?;
        self.ever_intermediates.insert(index.value());
        self.intermediates.push((false, index));
        Ok(index)
    }

    fn free_intermediates(&mut self) {
        for (free, _) in self.intermediates.iter_mut() {
            *free = true;
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(ScopeData {
            names: Vec::new(),
            saved_index: self.current_index,
        });
    }

    /// Drops the innermost scope: its names disappear and their memory
    /// indices become available again.
    fn pop_scope(&mut self) -> Result<(), AssemblerError> {
        let scope = self.scopes.pop().ok_or(AssemblerError::InvalidScopePop)?;
        for name in &scope.names {
            self.names.remove(name);
        }
        self.intermediates
            .retain(|(_, index)| (index.value() as usize) < scope.saved_index);
        self.current_index = scope.saved_index;
        Ok(())
    }

    fn patch_jump(&mut self, at: usize, target: usize) -> Result<(), AssemblerError> {
        if target >= constants::MAX_FRAME_SIZE {
            return Err(AssemblerError::FrameTooLarge);
        }
        self.instructions[at].set_a(MemoryIndex::Direct(target as u8));
        Ok(())
    }

    fn frame_size(&self) -> u8 {
        self.max_index as u8
    }

    /// Cells that only ever served as intermediates; only these are safe
    /// fusion candidates for the peephole pass.
    fn intermediate_indices(&self) -> HashSet<u8> {
        self.ever_intermediates
            .difference(&self.ever_names)
            .copied()
            .collect()
    }

    fn assemble_body(&mut self, nodes: &[AstNode]) -> Result<(), AssemblerError> {
        for node in nodes {
            self.assemble_node(node)?;
        }
        Ok(())
    }

    /// Lowers one node, returning the memory index that holds its value.
    /// Statement-like nodes return the A register index, which callers
    /// ignore.
    fn assemble_node(&mut self, node: &AstNode) -> Result<MemoryIndex, AssemblerError> {
        match node {
            AstNode::Assignment { lhs, rhs } => {
                let rhs_index = self.assemble_node(rhs)?;
                let lhs_index = self.assemble_node(lhs)?;
                self.emit(Instruction::new(OpCode::MOV, rhs_index, lhs_index));
                Ok(self.a_index())
            }
            AstNode::Arithmetic { lhs, rhs, op } => {
                let lhs_index = self.assemble_node(lhs)?;
                let rhs_index = self.assemble_node(rhs)?;
                let op_code = match op {
                    ArithmeticOp::Add => OpCode::ADD,
                    ArithmeticOp::Subtract => OpCode::SUB,
                    ArithmeticOp::Multiply => OpCode::MUL,
                    ArithmeticOp::Divide => OpCode::DIV,
                    ArithmeticOp::Power => OpCode::POW,
                };
                self.emit(Instruction::new(op_code, lhs_index, rhs_index));

                let result_index = self.allocate_intermediate()?;
                self.emit(Instruction::new(OpCode::MOV, self.a_index(), result_index));
                Ok(result_index)
            }
            AstNode::Update { lhs, rhs, op } => {
                let rhs_index = self.assemble_node(rhs)?;
                let lhs_index = self.assemble_node(lhs)?;
                let op_code = match op {
                    ArithmeticOp::Add => OpCode::INC,
                    ArithmeticOp::Subtract => OpCode::DEC,
                    ArithmeticOp::Multiply => OpCode::MAS,
                    ArithmeticOp::Divide => OpCode::DAS,
                    ArithmeticOp::Power => OpCode::PAS,
                };
                self.emit(Instruction::new(op_code, lhs_index, rhs_index));
                Ok(self.a_index())
            }
            AstNode::VariableDecl { name, .. } => {
                if self.has_name(name) {
                    return Err(AssemblerError::DuplicateName);
                }
                self.allocate_variable(name)
            }
            AstNode::VariableRef { name } => self
                .memory_index_for(name)
                .ok_or(AssemblerError::UnresolvedIdentifier),
            AstNode::NumericConstant { value } => self.immediates.allocate(*value),
            AstNode::BoolConstant { value } => {
                // Comparing the literal against zero drives the flag, so a
                // literal condition behaves like any other boolean
                // expression.
                let value_index = self
                    .immediates
                    .allocate(if *value { 1.0 } else { 0.0 })?;
                let zero_index = self.immediates.allocate(0.0)?;
                self.emit(Instruction::new(OpCode::CNE, value_index, zero_index));
                Ok(self.a_index())
            }
            AstNode::Unary { operand, op } => {
                let value_index = self.assemble_node(operand)?;
                match op {
                    UnaryOp::Plus => return Ok(value_index),
                    UnaryOp::Minus => {
                        let invert_index = self.immediates.allocate(-1.0)?;
                        self.emit(Instruction::new(OpCode::MUL, value_index, invert_index));
                    }
                    UnaryOp::Factorial => {
                        self.emit(Instruction::unary(OpCode::FAC, value_index));
                    }
                    UnaryOp::Magnitude => {
                        self.emit(Instruction::unary(OpCode::MAG, value_index));
                    }
                }

                let result_index = self.allocate_intermediate()?;
                self.emit(Instruction::new(OpCode::MOV, self.a_index(), result_index));
                Ok(result_index)
            }
            AstNode::Relational { lhs, rhs, op } => {
                let lhs_index = self.assemble_node(lhs)?;
                let rhs_index = self.assemble_node(rhs)?;
                let op_code = match op {
                    RelationalOp::Equals => OpCode::CEQ,
                    RelationalOp::NotEquals => OpCode::CNE,
                    RelationalOp::LessThan => OpCode::CLT,
                    RelationalOp::GreaterThan => OpCode::CGT,
                };
                self.emit(Instruction::new(op_code, lhs_index, rhs_index));
                Ok(self.a_index())
            }
            AstNode::Conditional {
                condition,
                body,
                else_body,
            } => {
                self.assemble_node(condition)?;
                let skip_body = self.emit(Instruction::unary(OpCode::JPZ, MemoryIndex::default()));

                self.push_scope();
                self.assemble_body(body)?;
                self.pop_scope()?;

                if else_body.is_empty() {
                    let target = self.instruction_index();
                    self.patch_jump(skip_body, target)?;
                } else {
                    let skip_else =
                        self.emit(Instruction::unary(OpCode::JMP, MemoryIndex::default()));
                    let target = self.instruction_index();
                    self.patch_jump(skip_body, target)?;

                    self.push_scope();
                    self.assemble_body(else_body)?;
                    self.pop_scope()?;
                    let target = self.instruction_index();
                    self.patch_jump(skip_else, target)?;
                }
                Ok(self.a_index())
            }
            AstNode::Loop { condition, body } => {
                let condition_start = self.instruction_index();
                self.assemble_node(condition)?;
                let exit_jump = self.emit(Instruction::unary(OpCode::JPZ, MemoryIndex::default()));

                self.push_scope();
                self.assemble_body(body)?;
                self.pop_scope()?;

                let back_jump = self.emit(Instruction::unary(OpCode::JMP, MemoryIndex::default()));
                self.patch_jump(back_jump, condition_start)?;
                let target = self.instruction_index();
                self.patch_jump(exit_jump, target)?;
                Ok(self.a_index())
            }
            AstNode::InlinePush => {
                self.push_scope();
                Ok(self.a_index())
            }
            AstNode::InlinePop => {
                self.pop_scope()?;
                Ok(self.a_index())
            }
            AstNode::FunctionCall { callee, arguments } => {
                let frame_id = *self
                    .function_frames
                    .get(callee)
                    .ok_or(AssemblerError::UnresolvedIdentifier)?;

                // Every call emitted from this frame stages its arguments in
                // the same scratch region, so a slot must not be written
                // until no argument evaluation (and with it no nested call)
                // remains. Evaluate everything first, then marshal.
                let mut argument_indices = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_indices.push(self.assemble_node(argument)?);
                }

                for (slot, value_index) in argument_indices.into_iter().enumerate() {
                    if slot + 1 >= constants::MAX_FRAME_SIZE {
                        return Err(AssemblerError::FrameTooLarge);
                    }
                    self.emit(Instruction::new(
                        OpCode::PUT,
                        value_index,
                        MemoryIndex::Direct((slot + 1) as u8),
                    ));
                }
                self.emit(Instruction::unary(
                    OpCode::JSR,
                    MemoryIndex::Direct(frame_id as u8),
                ));

                let result_index = self.allocate_intermediate()?;
                self.emit(Instruction::new(OpCode::MOV, self.a_index(), result_index));
                Ok(result_index)
            }
            AstNode::FunctionReturn { value } => {
                let value_index = self.assemble_node(value)?;
                self.emit(Instruction::new(OpCode::MOV, value_index, self.a_index()));
                self.emit(Instruction::nullary(OpCode::RET));
                Ok(self.a_index())
            }
        }
    }
}

fn is_jump(op_code: OpCode) -> bool {
    op_code == OpCode::JMP || op_code == OpCode::JPZ
}

fn is_jump_target(instructions: &[Instruction], index: usize) -> bool {
    instructions
        .iter()
        .any(|instruction| {
            is_jump(instruction.op_code()) && instruction.a().value() as usize == index
        })
}

/// Rewrites jump operands to account for the removal of the instruction
/// that sat at `removed`: every target strictly greater than it moves down
/// by one.
fn fix_jumps_after_removal(instructions: &mut [Instruction], removed: usize) {
    for instruction in instructions.iter_mut() {
        if !is_jump(instruction.op_code()) {
            continue;
        }
        let target = instruction.a().value() as usize;
        if target > removed {
            instruction.set_a(MemoryIndex::Direct((target - 1) as u8));
        }
    }
}

/// Linear fix-up of an emitted instruction list.
///
/// Removes self-moves and fuses `MOV a -> t; MOV t -> b` pairs into
/// `MOV a -> b`. Fusion is restricted to intermediate destinations (named
/// cells must keep their stores) and to pairs no jump lands between.
pub(crate) fn peephole(instructions: &mut Vec<Instruction>, intermediates: &HashSet<u8>) {
    let mut index = 0;
    while index < instructions.len() {
        if instructions[index].op_code() != OpCode::MOV {
            index += 1;
            continue;
        }

        if instructions[index].a() == instructions[index].b() {
            instructions.remove(index);
            fix_jumps_after_removal(instructions, index);
            continue;
        }

        if index + 1 < instructions.len() && instructions[index + 1].op_code() == OpCode::MOV {
            let first_dest = instructions[index].b();
            let second_source = instructions[index + 1].a();

            let fusable = first_dest == second_source
                && !first_dest.is_immediate()
                && intermediates.contains(&first_dest.value())
                && !is_jump_target(instructions, index + 1);

            if fusable {
                let second_dest = instructions[index + 1].b();
                instructions.remove(index + 1);
                fix_jumps_after_removal(instructions, index + 1);
                instructions[index].set_b(second_dest);
                continue;
            }
        }

        index += 1;
    }
}

/// Lowers an AST to an executable program: the main body becomes call
/// frame 0, each function its own frame in mangled-name order.
pub fn assemble(ast: &Ast) -> Result<Program, AssemblerError> {
    if ast.functions.len() + 1 > constants::MAX_FRAME_SIZE {
        return Err(AssemblerError::FrameTooLarge);
    }

    let function_frames: BTreeMap<String, usize> = ast
        .functions
        .keys()
        .enumerate()
        .map(|(position, name)| (name.clone(), position + 1))
        .collect();

    let mut immediates = ImmediatePool::default();
    let mut call_frames = Vec::with_capacity(ast.functions.len() + 1);
    let mut frame_intermediates = Vec::with_capacity(ast.functions.len() + 1);

    {
        let mut context = AssemblingContext::new(&mut immediates, &function_frames);

        for name in &ast.config_block.input_identifiers {
            if context.has_name(name) {
                return Err(AssemblerError::DuplicateName);
            }
            context.allocate_variable(name)?;
        }
        for name in &ast.config_block.output_identifiers {
            if context.has_name(name) {
                return Err(AssemblerError::DuplicateName);
            }
            context.allocate_variable(name)?;
        }

        for node in &ast.nodes {
            context.free_intermediates();
            context.assemble_node(node)?;
        }
        context.emit(Instruction::nullary(OpCode::HLT));

        for (name, index) in &context.names {
            debug!("{} -> {}", index, name);
        }

        frame_intermediates.push(context.intermediate_indices());
        call_frames.push(CallFrame {
            size: context.frame_size(),
            instructions: context.instructions,
        });
    }

    for function in ast.functions.values() {
        let mut context = AssemblingContext::new(&mut immediates, &function_frames);

        for argument in &function.arguments {
            if context.has_name(argument) {
                return Err(AssemblerError::DuplicateName);
            }
            context.allocate_variable(argument)?;
        }

        for node in &function.body {
            context.free_intermediates();
            context.assemble_node(node)?;
        }

        frame_intermediates.push(context.intermediate_indices());
        call_frames.push(CallFrame {
            size: context.frame_size(),
            instructions: context.instructions,
        });
    }

    for (frame, intermediates) in call_frames.iter_mut().zip(&frame_intermediates) {
        peephole(&mut frame.instructions, intermediates);
    }

    Ok(Program {
        input_identifiers: ast.config_block.input_identifiers.clone(),
        output_identifiers: ast.config_block.output_identifiers.clone(),
        immediate_values: immediates.values,
        call_frames,
    })
}
