//! Compiler for the RaychelScript expression language, targeting the
//! [rvm](../rvm/index.html) bytecode virtual machine.
//!
//! The pipeline is strictly one-directional: source text is lexed into
//! newline-separated token lines, parsed into an AST, optionally optimized,
//! and assembled into a RASM [`Program`](../rvm/struct.Program.html). The
//! main entry points are [`compile`](fn.compile.html) and
//! [`compile_with`](fn.compile_with.html).
//!
//! # The RaychelScript Language
//!
//! A script is made up of a `[[config]]` block followed by a `[[body]]`
//! block. Lines are terminated by newlines, `#` starts a line comment and
//! all other whitespace is insignificant.
//!
//! ## `[[config]]` Block
//!
//! Each config line starts with an identifier. `input` and `output` declare
//! the script's interface and are mandatory; any other name introduces a
//! free-form config entry.
//!
//!  Line | Meaning
//! ------|--------
//! `input a, b`  | Input variables, bound to the caller's values in order
//! `output c`    | Output variables, copied back to the caller in order
//! `name v, ...` | Free-form entry, kept in the AST for embedders
//!
//! ## `[[body]]` Block
//!
//! Every body line is an expression statement or part of a construct:
//!
//!  Construct | Syntax
//! -----------|-------
//! Conditional | `if <cond>` ... (`else` ...)? `endif`
//! Loop        | `while <cond>` ... `endwhile`
//! Function    | `fn name(arg, ...)` ... `endfn`, body ends with `return <expr>`
//!
//! Functions are only legal at the top level and may be overloaded by
//! argument count.
//!
//! ## Expressions
//!
//! Arithmetic uses `+ - * / ^` with the usual precedence; `^` is
//! right-associative. `-x` and `+x` are unary, `x!` is the factorial and
//! `|x|` the magnitude of `x`. Comparisons are `== != < >` and produce
//! booleans, which only appear in conditions. `let x` declares a constant,
//! `var x` a mutable variable; both are usually combined with an
//! assignment as in `var i = 0`. Compound assignments `+= -= *= /= ^=`
//! update a variable in place.
//!
//! ```text
//! [[config]]
//! input n
//! output s
//!
//! [[body]]
//! fn square(x)
//!     return x * x
//! endfn
//!
//! var i = 0
//! s = 0
//! while i < n
//!     s += square(i)
//!     i += 1
//! endwhile
//! ```

pub mod assembler;
pub mod ast;
mod body;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod token;

use std::error::Error as StdError;
use std::fmt;

use rvm::Program;

pub use crate::assembler::AssemblerError;
pub use crate::lexer::LexerError;
pub use crate::optimizer::OptimizationLevel;
pub use crate::parser::ParserError;

/// A failure in one of the pipeline stages. The `Display` impl prints the
/// stage name along with the reason.
#[derive(Clone, PartialEq, Debug)]
pub enum Error {
    Lexer(LexerError),
    Parser(ParserError),
    Assembler(AssemblerError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Lexer(error) => write!(f, "lexer: {}", error),
            Error::Parser(error) => write!(f, "parser: {}", error),
            Error::Assembler(error) => write!(f, "assembler: {}", error),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Lexer(error) => Some(error),
            Error::Parser(error) => Some(error),
            Error::Assembler(error) => Some(error),
        }
    }
}

impl From<LexerError> for Error {
    fn from(error: LexerError) -> Error {
        Error::Lexer(error)
    }
}

impl From<ParserError> for Error {
    fn from(error: ParserError) -> Error {
        Error::Parser(error)
    }
}

impl From<AssemblerError> for Error {
    fn from(error: AssemblerError) -> Error {
        Error::Assembler(error)
    }
}

/// Compiles a source string at the given optimization level.
pub fn compile_with(source: &str, level: OptimizationLevel) -> Result<Program, Error> {
    let lines = lexer::lex(source)?;
    let ast = parser::parse(&lines)?;
    let ast = optimizer::optimize(ast, &optimizer::passes_for_level(level));
    let program = assembler::assemble(&ast)?;
    Ok(program)
}

/// Compiles a source string with light optimizations.
pub fn compile(source: &str) -> Result<Program, Error> {
    compile_with(source, OptimizationLevel::Light)
}
