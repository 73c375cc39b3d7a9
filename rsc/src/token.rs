use std::fmt;

/// The closed set of token kinds produced by the lexer.
///
/// `fn`, `endfn`, `return`, `input` and `output` are ordinary identifiers;
/// the parser gives them meaning from their position in a line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftCurly,
    RightCurly,
    Comma,
    Number,
    Identifier,
    /// `let` or `var`; the token content distinguishes the two.
    Declaration,
    If,
    Else,
    Endif,
    While,
    Endwhile,
    True,
    False,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    LeftAngle,
    RightAngle,
    Bang,
    Ampersand,
    Pipe,
    Caret,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftCurly => "{",
            TokenKind::RightCurly => "}",
            TokenKind::Comma => ",",
            TokenKind::Number => "NUMBER",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Declaration => "DECLARATION",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::Endif => "ENDIF",
            TokenKind::While => "WHILE",
            TokenKind::Endwhile => "ENDWHILE",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Equal => "=",
            TokenKind::LeftAngle => "<",
            TokenKind::RightAngle => ">",
            TokenKind::Bang => "!",
            TokenKind::Ampersand => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> SourceLocation {
        SourceLocation { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    /// Textual content, carried for numbers, identifiers and declarations.
    pub content: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Token {
        Token {
            kind,
            location,
            content: None,
        }
    }

    pub fn with_content(kind: TokenKind, location: SourceLocation, content: &str) -> Token {
        Token {
            kind,
            location,
            content: Some(content.to_owned()),
        }
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}
