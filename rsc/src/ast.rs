use std::collections::BTreeMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnaryOp {
    Plus,
    Minus,
    Factorial,
    Magnitude,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RelationalOp {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
}

/// The type an expression produces when evaluated.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueType {
    None,
    Boolean,
    Number,
    VariableRef,
}

#[derive(Clone, PartialEq, Debug)]
pub enum AstNode {
    Assignment {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
    },
    Arithmetic {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        op: ArithmeticOp,
    },
    Update {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        op: ArithmeticOp,
    },
    VariableDecl {
        name: String,
        is_const: bool,
    },
    VariableRef {
        name: String,
    },
    NumericConstant {
        value: f64,
    },
    BoolConstant {
        value: bool,
    },
    Unary {
        operand: Box<AstNode>,
        op: UnaryOp,
    },
    Conditional {
        condition: Box<AstNode>,
        body: Vec<AstNode>,
        else_body: Vec<AstNode>,
    },
    Relational {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        op: RelationalOp,
    },
    Loop {
        condition: Box<AstNode>,
        body: Vec<AstNode>,
    },
    InlinePush,
    InlinePop,
    FunctionCall {
        /// Mangled callee name, see [`mangle_function_name`](fn.mangle_function_name.html).
        callee: String,
        arguments: Vec<AstNode>,
    },
    FunctionReturn {
        value: Box<AstNode>,
    },
}

impl AstNode {
    pub fn value_type(&self) -> ValueType {
        match self {
            AstNode::Assignment { .. }
            | AstNode::Update { .. }
            | AstNode::Conditional { .. }
            | AstNode::Loop { .. }
            | AstNode::InlinePush
            | AstNode::InlinePop
            | AstNode::FunctionReturn { .. } => ValueType::None,
            AstNode::Arithmetic { .. }
            | AstNode::VariableRef { .. }
            | AstNode::NumericConstant { .. }
            | AstNode::Unary { .. }
            | AstNode::FunctionCall { .. } => ValueType::Number,
            AstNode::VariableDecl { .. } => ValueType::VariableRef,
            AstNode::BoolConstant { .. } | AstNode::Relational { .. } => ValueType::Boolean,
        }
    }

    /// Whether the expression denotes an assignable storage location.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self,
            AstNode::VariableDecl { .. } | AstNode::VariableRef { .. }
        )
    }

    /// Whether evaluating the expression can alter visible state.
    pub fn has_side_effect(&self) -> bool {
        match self {
            AstNode::Assignment { .. }
            | AstNode::Update { .. }
            | AstNode::VariableDecl { .. }
            | AstNode::Conditional { .. }
            | AstNode::Loop { .. }
            | AstNode::InlinePush
            | AstNode::InlinePop
            | AstNode::FunctionCall { .. }
            | AstNode::FunctionReturn { .. } => true,
            AstNode::Arithmetic { .. }
            | AstNode::VariableRef { .. }
            | AstNode::NumericConstant { .. }
            | AstNode::BoolConstant { .. }
            | AstNode::Unary { .. }
            | AstNode::Relational { .. } => false,
        }
    }
}

/// Parsed `[[config]]` section: the ordered input and output identifier
/// lists plus any free-form configuration entries.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ConfigBlock {
    pub input_identifiers: Vec<String>,
    pub output_identifiers: Vec<String>,
    pub config_vars: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct FunctionData {
    pub mangled_name: String,
    pub arguments: Vec<String>,
    pub body: Vec<AstNode>,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Ast {
    pub config_block: ConfigBlock,
    pub nodes: Vec<AstNode>,
    /// Functions keyed by mangled name; ordered so that call-frame ids are
    /// assigned deterministically.
    pub functions: BTreeMap<String, FunctionData>,
}

/// Functions are overloadable by arity, so the callee recorded in the AST
/// carries the argument count.
pub fn mangle_function_name(name: &str, arity: usize) -> String {
    format!("{}${}", name, arity)
}
