use std::error::Error as StdError;
use std::fmt;

use pest::error::LineColLocation;
use pest::Parser;
use pest_derive::Parser;

use crate::token::{SourceLocation, Token, TokenKind};

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct SourceParser;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LexerError {
    NoInput,
    InvalidNumber(SourceLocation),
    InvalidToken(SourceLocation),
    ReservedIdentifier(SourceLocation),
    UnmatchedParenthesis(SourceLocation),
}

impl LexerError {
    pub fn reason(&self) -> &'static str {
        match self {
            LexerError::NoInput => "no input",
            LexerError::InvalidNumber(_) => "invalid numeric literal",
            LexerError::InvalidToken(_) => "invalid token",
            LexerError::ReservedIdentifier(_) => "reserved identifier",
            LexerError::UnmatchedParenthesis(_) => "unmatched parenthesis",
        }
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            LexerError::NoInput => None,
            LexerError::InvalidNumber(location)
            | LexerError::InvalidToken(location)
            | LexerError::ReservedIdentifier(location)
            | LexerError::UnmatchedParenthesis(location) => Some(*location),
        }
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.location() {
            Some(location) => write!(f, "{} at {}", self.reason(), location),
            None => f.write_str(self.reason()),
        }
    }
}

impl StdError for LexerError {}

/// One source line as a list of tokens. Empty lines are dropped by the
/// lexer, so a `LineTokens` is never empty.
pub type LineTokens = Vec<Token>;

fn is_valid_number(content: &str) -> bool {
    let mut seen_dot = false;
    let mut last_was_digit = false;
    for c in content.chars() {
        if c.is_ascii_digit() {
            last_was_digit = true;
        } else if c == '.' && !seen_dot && last_was_digit {
            seen_dot = true;
            last_was_digit = false;
        } else {
            return false;
        }
    }
    last_was_digit
}

fn word_token(content: &str, location: SourceLocation) -> Result<Token, LexerError> {
    let kind = match content {
        "let" | "var" => return Ok(Token::with_content(TokenKind::Declaration, location, content)),
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "endif" => TokenKind::Endif,
        "while" => TokenKind::While,
        "endwhile" => TokenKind::Endwhile,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => {
            // The double-underscore prefix is reserved for internal names
            // such as mangled functions.
            if content.starts_with("__") {
                return Err(LexerError::ReservedIdentifier(location));
            }
            return Ok(Token::with_content(TokenKind::Identifier, location, content));
        }
    };
    Ok(Token::new(kind, location))
}

fn special_token(content: &str, location: SourceLocation) -> Token {
    let kind = match content {
        "(" => TokenKind::LeftParen,
        ")" => TokenKind::RightParen,
        "[" => TokenKind::LeftBracket,
        "]" => TokenKind::RightBracket,
        "{" => TokenKind::LeftCurly,
        "}" => TokenKind::RightCurly,
        "," => TokenKind::Comma,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "%" => TokenKind::Percent,
        "=" => TokenKind::Equal,
        "<" => TokenKind::LeftAngle,
        ">" => TokenKind::RightAngle,
        "!" => TokenKind::Bang,
        "&" => TokenKind::Ampersand,
        "|" => TokenKind::Pipe,
        _ => TokenKind::Caret,
    };
    Token::new(kind, location)
}

fn is_opening_parenthesis(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftCurly
    )
}

fn is_closing_parenthesis(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightCurly
    )
}

/// Splits the source into newline-terminated token lines.
///
/// Parentheses (of all three kinds) must balance within each line; an
/// expression cannot continue past a newline.
pub fn lex(source: &str) -> Result<Vec<LineTokens>, LexerError> {
    let file = SourceParser::parse(Rule::file, source)
        .map_err(|error| {
            let (line, column) = match error.line_col {
                LineColLocation::Pos(position) => position,
                LineColLocation::Span(start, _) => start,
            };
            LexerError::InvalidToken(SourceLocation::new(line, column))
        })?
        .next()
        .ok_or(LexerError::NoInput)?;

    let mut lines: Vec<LineTokens> = Vec::new();
    let mut current_line: LineTokens = Vec::new();
    let mut paren_depth = 0i32;

    for pair in file.into_inner() {
        let (line, column) = pair.as_span().start_pos().line_col();
        let location = SourceLocation::new(line, column);
        let content = pair.as_str();

        let token = match pair.as_rule() {
            Rule::newline => {
                if paren_depth != 0 {
                    return Err(LexerError::UnmatchedParenthesis(location));
                }
                if !current_line.is_empty() {
                    lines.push(std::mem::replace(&mut current_line, Vec::new()));
                }
                continue;
            }
            Rule::number => {
                if !is_valid_number(content) {
                    return Err(LexerError::InvalidNumber(location));
                }
                Token::with_content(TokenKind::Number, location, content)
            }
            Rule::word => word_token(content, location)?,
            Rule::special => special_token(content, location),
            Rule::EOI => continue,
            _ => unreachable!(),
        };

        if is_opening_parenthesis(token.kind) {
            paren_depth += 1;
        } else if is_closing_parenthesis(token.kind) {
            paren_depth -= 1;
            if paren_depth < 0 {
                return Err(LexerError::UnmatchedParenthesis(location));
            }
        }

        current_line.push(token);
    }

    if paren_depth != 0 {
        let location = current_line
            .last()
            .map(|token| token.location)
            .unwrap_or_default();
        return Err(LexerError::UnmatchedParenthesis(location));
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        return Err(LexerError::NoInput);
    }
    Ok(lines)
}

#[cfg(test)]
mod test {
    use super::*;
    use matches::assert_matches;

    #[test]
    fn tokenizes_a_simple_line() {
        let lines = lex("a = b + 2.5\n").unwrap();
        assert_eq!(lines.len(), 1);

        let kinds: Vec<TokenKind> = lines[0].iter().map(|token| token.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Identifier,
                TokenKind::Plus,
                TokenKind::Number,
            ]
        );
        assert_eq!(lines[0][4].content_str(), "2.5");
    }

    #[test]
    fn keywords_and_declarations() {
        let lines = lex("let x\nvar y\nif true\nendif").unwrap();
        assert_eq!(lines[0][0].kind, TokenKind::Declaration);
        assert_eq!(lines[0][0].content_str(), "let");
        assert_eq!(lines[1][0].content_str(), "var");
        assert_eq!(lines[2][0].kind, TokenKind::If);
        assert_eq!(lines[2][1].kind, TokenKind::True);
        assert_eq!(lines[3][0].kind, TokenKind::Endif);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let lines = lex("# header comment\n\na = 1 # trailing\n\n").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 3);
    }

    #[test]
    fn locations_are_one_based() {
        let lines = lex("a\n  b\n").unwrap();
        assert_eq!(lines[0][0].location, SourceLocation::new(1, 1));
        assert_eq!(lines[1][0].location, SourceLocation::new(2, 3));
    }

    #[test]
    fn empty_input() {
        assert_matches!(lex(""), Err(LexerError::NoInput));
        assert_matches!(lex(" \n# only a comment\n"), Err(LexerError::NoInput));
    }

    #[test]
    fn malformed_numbers() {
        assert_matches!(lex("a = 1.2.3\n"), Err(LexerError::InvalidNumber(_)));
        assert_matches!(lex("a = 1px\n"), Err(LexerError::InvalidNumber(_)));
        assert_matches!(lex("a = 1.\n"), Err(LexerError::InvalidNumber(_)));
    }

    #[test]
    fn invalid_characters() {
        assert_matches!(lex("a = @b\n"), Err(LexerError::InvalidToken(_)));
    }

    #[test]
    fn reserved_identifiers() {
        assert_matches!(lex("__secret = 1\n"), Err(LexerError::ReservedIdentifier(_)));
        // A single leading underscore stays legal.
        assert_matches!(lex("_x = 1\n"), Ok(_));
    }

    #[test]
    fn unbalanced_parentheses() {
        assert_matches!(
            lex("a = (b + 1\n"),
            Err(LexerError::UnmatchedParenthesis(_))
        );
        assert_matches!(lex("a = b + 1)\n"), Err(LexerError::UnmatchedParenthesis(_)));
        assert_matches!(lex("a = (b + 1)"), Ok(_));
    }
}
