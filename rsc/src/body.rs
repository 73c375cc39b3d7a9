//! Parsing of `[[body]]` lines: expressions, control-flow constructs and
//! function definitions.

use crate::ast::{
    mangle_function_name, ArithmeticOp, Ast, AstNode, FunctionData, RelationalOp, UnaryOp,
    ValueType,
};
use crate::lexer::LineTokens;
use crate::parser::ParserError;
use crate::token::{Token, TokenKind};

type ParseResult = Result<AstNode, ParserError>;

fn is_md_op(kind: TokenKind) -> bool {
    kind == TokenKind::Star || kind == TokenKind::Slash
}

fn is_as_op(kind: TokenKind) -> bool {
    kind == TokenKind::Plus || kind == TokenKind::Minus
}

fn is_arith_op(kind: TokenKind) -> bool {
    is_as_op(kind) || is_md_op(kind) || kind == TokenKind::Caret
}

fn arithmetic_op(kind: TokenKind) -> ArithmeticOp {
    match kind {
        TokenKind::Plus => ArithmeticOp::Add,
        TokenKind::Minus => ArithmeticOp::Subtract,
        TokenKind::Star => ArithmeticOp::Multiply,
        TokenKind::Slash => ArithmeticOp::Divide,
        _ => ArithmeticOp::Power,
    }
}

/// A single element of a token pattern.
///
/// `Expression` is a wildcard that matches all tokens up to the next
/// element of the pattern (or to the end of the line in last position),
/// `AnyArithOp` matches one arithmetic operator token.
#[derive(Clone, Copy)]
enum Pattern {
    Kind(TokenKind),
    AnyArithOp,
    Expression,
}

/// Matches a token line against a pattern, returning one sub-slice per
/// pattern element. The whole line must be consumed for the pattern to
/// match.
fn match_token_pattern<'t>(tokens: &'t [Token], pattern: &[Pattern]) -> Option<Vec<&'t [Token]>> {
    if tokens.len() < pattern.len() {
        return None;
    }

    let mut matches = Vec::with_capacity(pattern.len());
    let mut position = 0;

    for (index, element) in pattern.iter().enumerate() {
        match element {
            Pattern::Expression => {
                if index == pattern.len() - 1 {
                    matches.push(&tokens[position..]);
                    position = tokens.len();
                    break;
                }
                // Wildcards run up to the first occurrence of the next
                // pattern element, which is always a concrete kind.
                let escape = match pattern[index + 1] {
                    Pattern::Kind(kind) => kind,
                    _ => return None,
                };
                let start = position;
                while position < tokens.len() && tokens[position].kind != escape {
                    position += 1;
                }
                matches.push(&tokens[start..position]);
            }
            Pattern::AnyArithOp => {
                if position >= tokens.len() || !is_arith_op(tokens[position].kind) {
                    return None;
                }
                matches.push(&tokens[position..=position]);
                position += 1;
            }
            Pattern::Kind(kind) => {
                if position >= tokens.len() || tokens[position].kind != *kind {
                    return None;
                }
                matches.push(&tokens[position..=position]);
                position += 1;
            }
        }
    }

    if position == tokens.len() {
        Some(matches)
    } else {
        None
    }
}

/// Index of the closing parenthesis matching the opening one at `open`.
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Clone, Copy, PartialEq)]
enum Tier {
    MulDiv,
    Power,
}

/// Finds the operator that becomes the root of the expression: the
/// rightmost operator of the lowest precedence tier outside parentheses.
///
/// `+`/`-` bind loosest, then `*`/`/`, then `^`. Scanning right to left
/// makes the additive and multiplicative tiers left-associative; for `^`
/// the scan keeps updating, so the leftmost power operator wins and the
/// operator is right-associative.
fn find_arithmetic_operator(tokens: &[Token]) -> Result<Option<usize>, ParserError> {
    let mut depth = 0i32;
    let mut inside_magnitude = false;
    let mut best: Option<(usize, Tier)> = None;

    for index in (0..tokens.len()).rev() {
        let kind = tokens[index].kind;

        // Magnitude bars enclose a complete expression; operators between
        // them must not become the root. Balanced bars toggle cleanly even
        // under parentheses.
        if kind == TokenKind::Pipe {
            inside_magnitude = !inside_magnitude;
            continue;
        }

        if depth == 0 && !inside_magnitude && is_arith_op(kind) {
            if is_as_op(kind) {
                return Ok(Some(index));
            }
            if is_md_op(kind) {
                match best {
                    None | Some((_, Tier::Power)) => best = Some((index, Tier::MulDiv)),
                    Some((_, Tier::MulDiv)) => {}
                }
            } else {
                // Caret: keep updating so the leftmost one becomes the root.
                match best {
                    None | Some((_, Tier::Power)) => best = Some((index, Tier::Power)),
                    Some((_, Tier::MulDiv)) => {}
                }
            }
            continue;
        }

        match kind {
            TokenKind::RightParen => depth += 1,
            TokenKind::LeftParen => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParserError::InvalidConstruct);
                }
            }
            TokenKind::Number | TokenKind::Identifier | TokenKind::Bang => {}
            _ if depth > 0 || inside_magnitude => {}
            _ => return Ok(None),
        }
    }

    if depth != 0 {
        return Err(ParserError::InvalidConstruct);
    }
    Ok(best.map(|(index, _)| index))
}

fn require_number(node: AstNode, error: ParserError) -> ParseResult {
    if node.value_type() == ValueType::Number {
        Ok(node)
    } else {
        Err(error)
    }
}

fn parse_relational(lhs: &[Token], rhs: &[Token], op: RelationalOp) -> ParseResult {
    let lhs = require_number(
        parse_expression(lhs)?,
        ParserError::RelationalOpLhsNotNumberType,
    )?;
    let rhs = require_number(
        parse_expression(rhs)?,
        ParserError::RelationalOpRhsNotNumberType,
    )?;
    Ok(AstNode::Relational {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        op,
    })
}

fn parse_assignment(lhs: &[Token], rhs: &[Token]) -> ParseResult {
    let lhs = parse_expression(lhs)?;
    if !lhs.is_lvalue() {
        return Err(ParserError::AssignToNonValueRef);
    }
    let rhs = require_number(
        parse_expression(rhs)?,
        ParserError::AssignRhsNotNumberType,
    )?;
    Ok(AstNode::Assignment {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn parse_op_assign(lhs: &Token, rhs: &[Token], op: ArithmeticOp) -> ParseResult {
    if lhs.kind != TokenKind::Identifier {
        return Err(ParserError::OpAssignLhsNotIdentifier);
    }
    let rhs = require_number(
        parse_expression(rhs)?,
        ParserError::ArithOpNotNumberType,
    )?;
    Ok(AstNode::Update {
        lhs: Box::new(AstNode::VariableRef {
            name: lhs.content_str().to_owned(),
        }),
        rhs: Box::new(rhs),
        op,
    })
}

fn parse_unary(operand: &[Token], op: UnaryOp) -> ParseResult {
    let operand = require_number(
        parse_expression(operand)?,
        ParserError::UnaryOpRhsNotNumberType,
    )?;
    Ok(AstNode::Unary {
        operand: Box::new(operand),
        op,
    })
}

/// Splits call-argument tokens at commas that sit outside any nested
/// parentheses.
fn split_arguments(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => depth -= 1,
            TokenKind::Comma if depth == 0 => {
                parts.push(&tokens[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

fn parse_function_call(tokens: &[Token]) -> Result<Option<AstNode>, ParserError> {
    if tokens.len() < 3
        || tokens[0].kind != TokenKind::Identifier
        || tokens[1].kind != TokenKind::LeftParen
    {
        return Ok(None);
    }
    match matching_paren(tokens, 1) {
        Some(close) if close == tokens.len() - 1 => {
            let mut arguments = Vec::new();
            for argument in split_arguments(&tokens[2..close]) {
                let node = require_number(
                    parse_expression(argument)?,
                    ParserError::FunctionArgumentNotNumberType,
                )?;
                arguments.push(node);
            }
            Ok(Some(AstNode::FunctionCall {
                callee: mangle_function_name(tokens[0].content_str(), arguments.len()),
                arguments,
            }))
        }
        _ => Ok(None),
    }
}

pub(crate) fn parse_expression(tokens: &[Token]) -> ParseResult {
    use Pattern::{AnyArithOp, Expression, Kind};

    if tokens.is_empty() {
        return Err(ParserError::NoInput);
    }

    // Parenthesised expressions.
    if tokens[0].kind == TokenKind::LeftParen {
        if let Some(close) = matching_paren(tokens, 0) {
            if close == tokens.len() - 1 {
                return parse_expression(&tokens[1..close]);
            }
        }
    }

    // Operator-assign expressions.
    if let Some(matches) = match_token_pattern(
        tokens,
        &[
            Kind(TokenKind::Identifier),
            AnyArithOp,
            Kind(TokenKind::Equal),
            Expression,
        ],
    ) {
        let op = arithmetic_op(matches[1][0].kind);
        return parse_op_assign(&matches[0][0], matches[3], op);
    }

    // Equality comparisons, which must be tried before assignment so a
    // leading `=` of `==` is not taken for an assignment.
    if let Some(matches) = match_token_pattern(
        tokens,
        &[
            Expression,
            Kind(TokenKind::Equal),
            Kind(TokenKind::Equal),
            Expression,
        ],
    ) {
        return parse_relational(matches[0], matches[3], RelationalOp::Equals);
    }
    if let Some(matches) = match_token_pattern(
        tokens,
        &[
            Expression,
            Kind(TokenKind::Bang),
            Kind(TokenKind::Equal),
            Expression,
        ],
    ) {
        return parse_relational(matches[0], matches[3], RelationalOp::NotEquals);
    }

    // Assignment expressions.
    if let Some(matches) =
        match_token_pattern(tokens, &[Expression, Kind(TokenKind::Equal), Expression])
    {
        return parse_assignment(matches[0], matches[2]);
    }

    // Ordering comparisons.
    if let Some(matches) =
        match_token_pattern(tokens, &[Expression, Kind(TokenKind::LeftAngle), Expression])
    {
        return parse_relational(matches[0], matches[2], RelationalOp::LessThan);
    }
    if let Some(matches) = match_token_pattern(
        tokens,
        &[Expression, Kind(TokenKind::RightAngle), Expression],
    ) {
        return parse_relational(matches[0], matches[2], RelationalOp::GreaterThan);
    }

    // Magnitude expressions, before the operator search: the bars enclose
    // a full expression, which the search must not split.
    if let Some(matches) = match_token_pattern(
        tokens,
        &[Kind(TokenKind::Pipe), Expression, Kind(TokenKind::Pipe)],
    ) {
        return parse_unary(matches[1], UnaryOp::Magnitude);
    }

    // Arithmetic operators.
    if let Some(op_index) = find_arithmetic_operator(tokens)? {
        let kind = tokens[op_index].kind;
        let lhs_tokens = &tokens[..op_index];
        let rhs_tokens = &tokens[op_index + 1..];

        if lhs_tokens.is_empty() {
            let op = match kind {
                TokenKind::Plus => UnaryOp::Plus,
                TokenKind::Minus => UnaryOp::Minus,
                _ => return Err(ParserError::InvalidConstruct),
            };
            return parse_unary(rhs_tokens, op);
        }

        let lhs = require_number(
            parse_expression(lhs_tokens)?,
            ParserError::ArithOpNotNumberType,
        )?;
        let rhs = require_number(
            parse_expression(rhs_tokens)?,
            ParserError::ArithOpNotNumberType,
        )?;
        return Ok(AstNode::Arithmetic {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            op: arithmetic_op(kind),
        });
    }

    // Leaf nodes.
    match tokens {
        [token] if token.kind == TokenKind::Number => {
            let value: f64 = token
                .content_str()
                .parse()
                .map_err(|_| ParserError::InvalidNumericConstant)?;
            return Ok(AstNode::NumericConstant { value });
        }
        [token] if token.kind == TokenKind::True => {
            return Ok(AstNode::BoolConstant { value: true });
        }
        [token] if token.kind == TokenKind::False => {
            return Ok(AstNode::BoolConstant { value: false });
        }
        [token] if token.kind == TokenKind::Identifier => {
            return Ok(AstNode::VariableRef {
                name: token.content_str().to_owned(),
            });
        }
        [declaration, name]
            if declaration.kind == TokenKind::Declaration
                && name.kind == TokenKind::Identifier =>
        {
            return Ok(AstNode::VariableDecl {
                name: name.content_str().to_owned(),
                is_const: declaration.content_str() == "let",
            });
        }
        [declaration, ..] if declaration.kind == TokenKind::Declaration => {
            return Err(ParserError::InvalidDeclaration);
        }
        _ => {}
    }

    if let Some(call) = parse_function_call(tokens)? {
        return Ok(call);
    }

    if let Some(matches) = match_token_pattern(tokens, &[Expression, Kind(TokenKind::Bang)]) {
        return parse_unary(matches[0], UnaryOp::Factorial);
    }

    Err(ParserError::InvalidConstruct)
}

enum OpenConstruct {
    Conditional {
        condition: AstNode,
        body: Vec<AstNode>,
        else_body: Vec<AstNode>,
        in_else: bool,
    },
    Loop {
        condition: AstNode,
        body: Vec<AstNode>,
    },
    Function {
        name: String,
        arguments: Vec<String>,
        body: Vec<AstNode>,
    },
}

fn push_node(stack: &mut Vec<OpenConstruct>, ast: &mut Ast, node: AstNode) {
    match stack.last_mut() {
        Some(OpenConstruct::Conditional {
            body,
            else_body,
            in_else,
            ..
        }) => {
            if *in_else {
                else_body.push(node);
            } else {
                body.push(node);
            }
        }
        Some(OpenConstruct::Loop { body, .. }) => body.push(node),
        Some(OpenConstruct::Function { body, .. }) => body.push(node),
        None => ast.nodes.push(node),
    }
}

fn parse_function_header(line: &[Token]) -> Result<(String, Vec<String>), ParserError> {
    if line.len() < 4 || line[1].kind != TokenKind::Identifier {
        return Err(ParserError::InvalidFunctionDefinition);
    }
    if line[2].kind != TokenKind::LeftParen || matching_paren(line, 2) != Some(line.len() - 1) {
        return Err(ParserError::InvalidFunctionArgumentList);
    }

    let mut arguments = Vec::new();
    for part in split_arguments(&line[3..line.len() - 1]) {
        match part {
            [token] if token.kind == TokenKind::Identifier => {
                let name = token.content_str().to_owned();
                if arguments.contains(&name) {
                    return Err(ParserError::InvalidFunctionArgumentList);
                }
                arguments.push(name);
            }
            _ => return Err(ParserError::InvalidFunctionArgumentList),
        }
    }

    Ok((line[1].content_str().to_owned(), arguments))
}

fn parse_body_line(
    line: &[Token],
    stack: &mut Vec<OpenConstruct>,
    ast: &mut Ast,
) -> Result<(), ParserError> {
    let first = &line[0];

    match first.kind {
        TokenKind::If => {
            let condition = parse_expression(&line[1..])?;
            if condition.value_type() != ValueType::Boolean {
                return Err(ParserError::ConditionalConditionNotBooleanType);
            }
            stack.push(OpenConstruct::Conditional {
                condition,
                body: Vec::new(),
                else_body: Vec::new(),
                in_else: false,
            });
        }
        TokenKind::Else => {
            if line.len() != 1 {
                return Err(ParserError::MismatchedElse);
            }
            match stack.last_mut() {
                Some(OpenConstruct::Conditional { in_else, .. }) if !*in_else => *in_else = true,
                _ => return Err(ParserError::MismatchedElse),
            }
        }
        TokenKind::Endif => {
            if line.len() != 1 {
                return Err(ParserError::MismatchedConditional);
            }
            match stack.pop() {
                Some(OpenConstruct::Conditional {
                    condition,
                    body,
                    else_body,
                    ..
                }) => {
                    push_node(
                        stack,
                        ast,
                        AstNode::Conditional {
                            condition: Box::new(condition),
                            body,
                            else_body,
                        },
                    );
                }
                Some(construct) => {
                    stack.push(construct);
                    return Err(ParserError::MismatchedHeaderFooterType);
                }
                None => return Err(ParserError::MismatchedConditional),
            }
        }
        TokenKind::While => {
            let condition = parse_expression(&line[1..])?;
            if condition.value_type() != ValueType::Boolean {
                return Err(ParserError::LoopConditionNotBooleanType);
            }
            stack.push(OpenConstruct::Loop {
                condition,
                body: Vec::new(),
            });
        }
        TokenKind::Endwhile => {
            if line.len() != 1 {
                return Err(ParserError::MismatchedLoop);
            }
            match stack.pop() {
                Some(OpenConstruct::Loop { condition, body }) => {
                    push_node(
                        stack,
                        ast,
                        AstNode::Loop {
                            condition: Box::new(condition),
                            body,
                        },
                    );
                }
                Some(construct) => {
                    stack.push(construct);
                    return Err(ParserError::MismatchedHeaderFooterType);
                }
                None => return Err(ParserError::MismatchedLoop),
            }
        }
        TokenKind::Identifier if first.content_str() == "fn" && line.len() > 1 => {
            if !stack.is_empty() {
                return Err(ParserError::InvalidFunctionDefinition);
            }
            let (name, arguments) = parse_function_header(line)?;
            stack.push(OpenConstruct::Function {
                name,
                arguments,
                body: Vec::new(),
            });
        }
        TokenKind::Identifier if first.content_str() == "endfn" && line.len() == 1 => {
            match stack.pop() {
                Some(OpenConstruct::Function {
                    name,
                    arguments,
                    body,
                }) => {
                    match body.last() {
                        Some(AstNode::FunctionReturn { .. }) => {}
                        _ => return Err(ParserError::MissingReturn),
                    }
                    let mangled_name = mangle_function_name(&name, arguments.len());
                    if ast.functions.contains_key(&mangled_name) {
                        return Err(ParserError::DuplicateFunction);
                    }
                    ast.functions.insert(
                        mangled_name.clone(),
                        FunctionData {
                            mangled_name,
                            arguments,
                            body,
                        },
                    );
                }
                Some(construct) => {
                    stack.push(construct);
                    return Err(ParserError::MismatchedEndfn);
                }
                None => return Err(ParserError::MismatchedEndfn),
            }
        }
        TokenKind::Identifier if first.content_str() == "return" => {
            if line.len() == 1 {
                return Err(ParserError::InvalidConstruct);
            }
            let inside_function = stack
                .iter()
                .any(|construct| matches!(construct, OpenConstruct::Function { .. }));
            if !inside_function {
                return Err(ParserError::ReturnInInvalidScope);
            }
            let value = require_number(
                parse_expression(&line[1..])?,
                ParserError::ReturnExpressionNotNumberType,
            )?;
            push_node(
                stack,
                ast,
                AstNode::FunctionReturn {
                    value: Box::new(value),
                },
            );
        }
        _ => {
            let node = parse_expression(line)?;
            push_node(stack, ast, node);
        }
    }

    Ok(())
}

pub(crate) fn parse_body_block(lines: &[LineTokens], ast: &mut Ast) -> Result<(), ParserError> {
    let mut stack = Vec::new();

    for line in lines {
        parse_body_line(line, &mut stack, ast)?;
    }

    match stack.last() {
        None => Ok(()),
        Some(OpenConstruct::Conditional { .. }) => Err(ParserError::MismatchedConditional),
        Some(OpenConstruct::Loop { .. }) => Err(ParserError::MismatchedLoop),
        Some(OpenConstruct::Function { .. }) => Err(ParserError::MismatchedEndfn),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::lex;
    use matches::assert_matches;

    fn parse_line(source: &str) -> ParseResult {
        let lines = lex(source).unwrap();
        parse_expression(&lines[0])
    }

    fn parse_body(source: &str) -> Result<Ast, ParserError> {
        let lines = lex(source).unwrap();
        let mut ast = Ast::default();
        parse_body_block(&lines, &mut ast)?;
        Ok(ast)
    }

    #[test]
    fn numeric_constant() {
        assert_eq!(
            parse_line("42.5").unwrap(),
            AstNode::NumericConstant { value: 42.5 }
        );
    }

    #[test]
    fn additive_operators_are_left_associative() {
        // a - b + c must parse as (a - b) + c.
        let node = parse_line("a - b + c").unwrap();
        match node {
            AstNode::Arithmetic { lhs, op, .. } => {
                assert_eq!(op, ArithmeticOp::Add);
                assert_matches!(
                    *lhs,
                    AstNode::Arithmetic {
                        op: ArithmeticOp::Subtract,
                        ..
                    }
                );
            }
            _ => panic!("expected arithmetic node"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        // a + b * c must parse as a + (b * c).
        let node = parse_line("a + b * c").unwrap();
        match node {
            AstNode::Arithmetic { rhs, op, .. } => {
                assert_eq!(op, ArithmeticOp::Add);
                assert_matches!(
                    *rhs,
                    AstNode::Arithmetic {
                        op: ArithmeticOp::Multiply,
                        ..
                    }
                );
            }
            _ => panic!("expected arithmetic node"),
        }
    }

    #[test]
    fn power_is_right_associative() {
        // a ^ b ^ c must parse as a ^ (b ^ c).
        let node = parse_line("a ^ b ^ c").unwrap();
        match node {
            AstNode::Arithmetic { lhs, rhs, op } => {
                assert_eq!(op, ArithmeticOp::Power);
                assert_matches!(*lhs, AstNode::VariableRef { .. });
                assert_matches!(
                    *rhs,
                    AstNode::Arithmetic {
                        op: ArithmeticOp::Power,
                        ..
                    }
                );
            }
            _ => panic!("expected arithmetic node"),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        // (a + b) * c keeps the addition below the multiplication.
        let node = parse_line("(a + b) * c").unwrap();
        match node {
            AstNode::Arithmetic { lhs, op, .. } => {
                assert_eq!(op, ArithmeticOp::Multiply);
                assert_matches!(
                    *lhs,
                    AstNode::Arithmetic {
                        op: ArithmeticOp::Add,
                        ..
                    }
                );
            }
            _ => panic!("expected arithmetic node"),
        }
    }

    #[test]
    fn unary_operators() {
        assert_matches!(
            parse_line("-a").unwrap(),
            AstNode::Unary {
                op: UnaryOp::Minus,
                ..
            }
        );
        assert_matches!(
            parse_line("+a").unwrap(),
            AstNode::Unary {
                op: UnaryOp::Plus,
                ..
            }
        );
        assert_matches!(
            parse_line("a!").unwrap(),
            AstNode::Unary {
                op: UnaryOp::Factorial,
                ..
            }
        );
        assert_matches!(
            parse_line("|a + b|").unwrap(),
            AstNode::Unary {
                op: UnaryOp::Magnitude,
                ..
            }
        );
    }

    #[test]
    fn assignment_and_declaration() {
        let node = parse_line("var x = 3").unwrap();
        match node {
            AstNode::Assignment { lhs, .. } => {
                assert_eq!(
                    *lhs,
                    AstNode::VariableDecl {
                        name: "x".to_owned(),
                        is_const: false,
                    }
                );
            }
            _ => panic!("expected assignment node"),
        }

        assert_matches!(
            parse_line("let y").unwrap(),
            AstNode::VariableDecl { is_const: true, .. }
        );
    }

    #[test]
    fn compound_assignment() {
        assert_matches!(
            parse_line("x += 1").unwrap(),
            AstNode::Update {
                op: ArithmeticOp::Add,
                ..
            }
        );
        assert_matches!(
            parse_line("x ^= 2").unwrap(),
            AstNode::Update {
                op: ArithmeticOp::Power,
                ..
            }
        );
    }

    #[test]
    fn relational_operators() {
        assert_matches!(
            parse_line("a < b").unwrap(),
            AstNode::Relational {
                op: RelationalOp::LessThan,
                ..
            }
        );
        assert_matches!(
            parse_line("a == b").unwrap(),
            AstNode::Relational {
                op: RelationalOp::Equals,
                ..
            }
        );
        assert_matches!(
            parse_line("a != b").unwrap(),
            AstNode::Relational {
                op: RelationalOp::NotEquals,
                ..
            }
        );
    }

    #[test]
    fn relational_operators_do_not_chain() {
        assert_matches!(
            parse_line("a < b < c"),
            Err(ParserError::RelationalOpRhsNotNumberType)
        );
    }

    #[test]
    fn function_calls() {
        let node = parse_line("f(a, g(b), 1)").unwrap();
        match node {
            AstNode::FunctionCall { callee, arguments } => {
                assert_eq!(callee, "f$3");
                assert_eq!(arguments.len(), 3);
                assert_matches!(
                    arguments[1],
                    AstNode::FunctionCall { .. }
                );
            }
            _ => panic!("expected call node"),
        }
    }

    #[test]
    fn attribute_table() {
        let assignment = parse_line("x = 1").unwrap();
        assert_eq!(assignment.value_type(), ValueType::None);
        assert!(assignment.has_side_effect());
        assert!(!assignment.is_lvalue());

        let reference = parse_line("x").unwrap();
        assert_eq!(reference.value_type(), ValueType::Number);
        assert!(reference.is_lvalue());
        assert!(!reference.has_side_effect());

        let declaration = parse_line("var x").unwrap();
        assert_eq!(declaration.value_type(), ValueType::VariableRef);
        assert!(declaration.is_lvalue());
        assert!(declaration.has_side_effect());

        let relational = parse_line("a < b").unwrap();
        assert_eq!(relational.value_type(), ValueType::Boolean);
        assert!(!relational.has_side_effect());

        let call = parse_line("f(x)").unwrap();
        assert_eq!(call.value_type(), ValueType::Number);
        assert!(call.has_side_effect());
    }

    #[test]
    fn type_errors() {
        assert_matches!(parse_line("1 = 2"), Err(ParserError::AssignToNonValueRef));
        assert_matches!(
            parse_line("x = a < b"),
            Err(ParserError::AssignRhsNotNumberType)
        );
        assert_matches!(
            parse_line("true + 1"),
            Err(ParserError::ArithOpNotNumberType)
        );
        assert_matches!(
            parse_line("f(true)"),
            Err(ParserError::FunctionArgumentNotNumberType)
        );
    }

    #[test]
    fn conditionals_and_loops() {
        let ast = parse_body("if a > 0\nx = 1\nelse\nx = 2\nendif").unwrap();
        match &ast.nodes[0] {
            AstNode::Conditional {
                body, else_body, ..
            } => {
                assert_eq!(body.len(), 1);
                assert_eq!(else_body.len(), 1);
            }
            _ => panic!("expected conditional node"),
        }

        let ast = parse_body("while i < n\ni += 1\nendwhile").unwrap();
        assert_matches!(&ast.nodes[0], AstNode::Loop { .. });
    }

    #[test]
    fn conditions_must_be_boolean() {
        assert_matches!(
            parse_body("if x\nendif"),
            Err(ParserError::ConditionalConditionNotBooleanType)
        );
        assert_matches!(
            parse_body("while 1\nendwhile"),
            Err(ParserError::LoopConditionNotBooleanType)
        );
    }

    #[test]
    fn mismatched_construct_footers() {
        assert_matches!(parse_body("endif"), Err(ParserError::MismatchedConditional));
        assert_matches!(parse_body("endwhile"), Err(ParserError::MismatchedLoop));
        assert_matches!(
            parse_body("if a > 0\nendwhile"),
            Err(ParserError::MismatchedHeaderFooterType)
        );
        assert_matches!(
            parse_body("while a > 0\nendif"),
            Err(ParserError::MismatchedHeaderFooterType)
        );
        assert_matches!(
            parse_body("if a > 0\nx = 1"),
            Err(ParserError::MismatchedConditional)
        );
        assert_matches!(
            parse_body("else"),
            Err(ParserError::MismatchedElse)
        );
    }

    #[test]
    fn function_definitions() {
        let ast = parse_body("fn square(x)\nreturn x * x\nendfn\ny = square(2)").unwrap();
        let function = ast.functions.get("square$1").unwrap();
        assert_eq!(function.arguments, vec!["x".to_owned()]);
        assert_eq!(function.body.len(), 1);
        assert_matches!(function.body[0], AstNode::FunctionReturn { .. });
    }

    #[test]
    fn function_errors() {
        assert_matches!(
            parse_body("fn f(x)\nreturn x\nendfn\nfn f(y)\nreturn y\nendfn"),
            Err(ParserError::DuplicateFunction)
        );
        assert_matches!(
            parse_body("fn f(x)\nx = 1\nendfn"),
            Err(ParserError::MissingReturn)
        );
        assert_matches!(
            parse_body("return 1"),
            Err(ParserError::ReturnInInvalidScope)
        );
        assert_matches!(
            parse_body("if a > 0\nfn f(x)\nreturn x\nendfn\nendif"),
            Err(ParserError::InvalidFunctionDefinition)
        );
        assert_matches!(
            parse_body("fn f(x, x)\nreturn x\nendfn"),
            Err(ParserError::InvalidFunctionArgumentList)
        );
        assert_matches!(parse_body("endfn"), Err(ParserError::MismatchedEndfn));
    }

    #[test]
    fn functions_may_overload_by_arity() {
        let ast =
            parse_body("fn f(x)\nreturn x\nendfn\nfn f(x, y)\nreturn x + y\nendfn").unwrap();
        assert!(ast.functions.contains_key("f$1"));
        assert!(ast.functions.contains_key("f$2"));
    }
}
