use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::core::TextRange;

/// Keywords are matched case-insensitively, `endif`, `EndIf` and `ENDIF` are all the same
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Keyword {
    Sub,
    EndSub,
    If,
    Then,
    Else,
    ElseIf,
    EndIf,
    While,
    EndWhile,
    For,
    To,
    Step,
    EndFor,
    Goto,
    And,
    Or,
}

impl Keyword {
    /// true for the keywords that close (or continue) a block
    pub fn is_block_terminator(self) -> bool {
        use Keyword::*;
        matches!(self, EndSub | Else | ElseIf | EndIf | EndWhile | EndFor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier,
    Keyword(Keyword),
    NumberLiteral,
    StringLiteral,
    Comment,

    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Colon,

    EndOfLine,
    EndOfFile,
}

impl TokenKind {
    /// how this kind is written in source, for diagnostics that expect a certain token
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            Identifier => "an identifier",
            TokenKind::Keyword(kw) => kw.into(),
            NumberLiteral => "a number",
            StringLiteral => "a string",
            Comment => "a comment",
            Equal => "=",
            NotEqual => "<>",
            LessThan => "<",
            GreaterThan => ">",
            LessThanOrEqual => "<=",
            GreaterThanOrEqual => ">=",
            Plus => "+",
            Minus => "-",
            Multiply => "*",
            Divide => "/",
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            Comma => ",",
            Dot => ".",
            Colon => ":",
            EndOfLine => "the end of the line",
            EndOfFile => "the end of the file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// the literal source text. For string literals this includes the quotes
    pub text: String,
    pub range: TextRange,
}

impl Token {
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }

    /// for string literals, the contents without the surrounding quotes
    pub fn string_value(&self) -> &str {
        let s = self.text.strip_prefix('"').unwrap_or(&self.text);
        s.strip_suffix('"').unwrap_or(s)
    }
}
