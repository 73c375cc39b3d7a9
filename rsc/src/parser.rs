use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use log::debug;

use crate::ast::{Ast, ConfigBlock};
use crate::body;
use crate::lexer::LineTokens;
use crate::token::{Token, TokenKind};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParserError {
    NoInput,
    InvalidConfig,
    InvalidConstruct,
    InvalidDeclaration,
    InvalidNumericConstant,
    MismatchedConditional,
    MismatchedElse,
    MismatchedLoop,
    MismatchedHeaderFooterType,
    InvalidFunctionArgumentList,
    MismatchedEndfn,
    DuplicateFunction,
    InvalidFunctionDefinition,
    ReturnInInvalidScope,
    AssignToNonValueRef,
    AssignRhsNotNumberType,
    ArithOpNotNumberType,
    OpAssignLhsNotIdentifier,
    UnaryOpRhsNotNumberType,
    ConditionalConditionNotBooleanType,
    RelationalOpLhsNotNumberType,
    RelationalOpRhsNotNumberType,
    LoopConditionNotBooleanType,
    FunctionArgumentNotNumberType,
    ReturnExpressionNotNumberType,
    MissingReturn,
}

impl ParserError {
    pub fn reason(self) -> &'static str {
        match self {
            ParserError::NoInput => "no input",
            ParserError::InvalidConfig => "error in configuration block",
            ParserError::InvalidConstruct => "invalid construct",
            ParserError::InvalidDeclaration => "invalid variable declaration",
            ParserError::InvalidNumericConstant => "invalid numeric constant",
            ParserError::MismatchedConditional => "mismatched if/endif",
            ParserError::MismatchedElse => "invalid else construct",
            ParserError::MismatchedLoop => "mismatched while/endwhile",
            ParserError::MismatchedHeaderFooterType => {
                "type of construct header does not match type of construct footer"
            }
            ParserError::InvalidFunctionArgumentList => "invalid function argument list",
            ParserError::MismatchedEndfn => "mismatched fn/endfn",
            ParserError::DuplicateFunction => "duplicate function definition",
            ParserError::InvalidFunctionDefinition => "function definition at non-global scope",
            ParserError::ReturnInInvalidScope => "return statement outside of a function",
            ParserError::AssignToNonValueRef => {
                "trying to assign to something that is not a value reference"
            }
            ParserError::AssignRhsNotNumberType => {
                "right-hand side of assignment does not have 'number' type"
            }
            ParserError::ArithOpNotNumberType => {
                "operand in arithmetic expression does not have 'number' type"
            }
            ParserError::OpAssignLhsNotIdentifier => {
                "left-hand side of operator-assign expression is not an identifier"
            }
            ParserError::UnaryOpRhsNotNumberType => {
                "operand of unary operator does not have 'number' type"
            }
            ParserError::ConditionalConditionNotBooleanType => {
                "condition of conditional construct does not have 'boolean' type"
            }
            ParserError::RelationalOpLhsNotNumberType => {
                "left-hand side of relational operator does not have 'number' type"
            }
            ParserError::RelationalOpRhsNotNumberType => {
                "right-hand side of relational operator does not have 'number' type"
            }
            ParserError::LoopConditionNotBooleanType => {
                "condition of loop does not have 'boolean' type"
            }
            ParserError::FunctionArgumentNotNumberType => {
                "argument expression of function call does not have 'number' type"
            }
            ParserError::ReturnExpressionNotNumberType => {
                "subexpression of return statement does not have 'number' type"
            }
            ParserError::MissingReturn => "function does not end with a return statement",
        }
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl StdError for ParserError {}

fn is_block_header(line: &[Token], name: &str) -> bool {
    line.len() == 5
        && line[0].kind == TokenKind::LeftBracket
        && line[1].kind == TokenKind::LeftBracket
        && line[2].kind == TokenKind::Identifier
        && line[2].content_str() == name
        && line[3].kind == TokenKind::RightBracket
        && line[4].kind == TokenKind::RightBracket
}

/// Parses the values of one config line: identifiers (or numbers for
/// free-form entries) separated by commas.
fn parse_config_values(tokens: &[Token], identifiers_only: bool) -> Result<Vec<String>, ParserError> {
    let mut values = Vec::new();
    let mut expect_value = true;

    for token in tokens {
        if expect_value {
            let is_valid = token.kind == TokenKind::Identifier
                || (!identifiers_only && token.kind == TokenKind::Number);
            if !is_valid {
                return Err(ParserError::InvalidConfig);
            }
            values.push(token.content_str().to_owned());
            expect_value = false;
        } else {
            if token.kind != TokenKind::Comma {
                return Err(ParserError::InvalidConfig);
            }
            expect_value = true;
        }
    }

    // Catches empty lists and trailing commas alike.
    if expect_value {
        return Err(ParserError::InvalidConfig);
    }
    Ok(values)
}

fn parse_config_block(lines: &[LineTokens]) -> Result<ConfigBlock, ParserError> {
    let mut block = ConfigBlock::default();

    for line in lines {
        let first = &line[0];
        if first.kind != TokenKind::Identifier {
            return Err(ParserError::InvalidConfig);
        }

        match first.content_str() {
            "input" => {
                if !block.input_identifiers.is_empty() {
                    return Err(ParserError::InvalidConfig);
                }
                block.input_identifiers = parse_config_values(&line[1..], true)?;
            }
            "output" => {
                if !block.output_identifiers.is_empty() {
                    return Err(ParserError::InvalidConfig);
                }
                block.output_identifiers = parse_config_values(&line[1..], true)?;
            }
            name => {
                if block.config_vars.contains_key(name) {
                    return Err(ParserError::InvalidConfig);
                }
                let values = parse_config_values(&line[1..], false)?;
                block.config_vars.insert(name.to_owned(), values);
            }
        }
    }

    if block.input_identifiers.is_empty() || block.output_identifiers.is_empty() {
        return Err(ParserError::InvalidConfig);
    }
    Ok(block)
}

/// Parses token lines into an AST.
///
/// The source must consist of a `[[config]]` block followed by a `[[body]]`
/// block; see the crate documentation for the language surface.
pub fn parse(lines: &[LineTokens]) -> Result<Ast, ParserError> {
    if lines.is_empty() {
        return Err(ParserError::NoInput);
    }

    if !is_block_header(&lines[0], "config") {
        return Err(ParserError::InvalidConfig);
    }

    let body_start = lines
        .iter()
        .position(|line| is_block_header(line, "body"))
        .ok_or(ParserError::InvalidConfig)?;

    let config_block = parse_config_block(&lines[1..body_start])?;
    debug!(
        "config: {} input(s), {} output(s)",
        config_block.input_identifiers.len(),
        config_block.output_identifiers.len()
    );

    let mut ast = Ast {
        config_block,
        nodes: Vec::new(),
        functions: BTreeMap::new(),
    };
    body::parse_body_block(&lines[body_start + 1..], &mut ast)?;
    Ok(ast)
}
