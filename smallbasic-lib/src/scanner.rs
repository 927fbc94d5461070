//! Turns source text into tokens.
//!
//! Scanning never fails. Characters that can't start a token are reported and skipped,
//! a string that isn't closed before the end of its line is reported and then treated as
//! if it had been closed.

use std::str::FromStr;

use crate::core::*;

pub fn scan(text: &str, diagnostics: &mut DiagnosticBag) -> Vec<Token> {
    let mut scanner = Scanner {
        chars: text.chars().collect(),
        index: 0,
        line: 0,
        column: 0,
        tokens: vec![],
    };
    scanner.run(diagnostics);
    tracing::debug!(tokens = scanner.tokens.len(), "scanned source");
    scanner.tokens
}

struct Scanner {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl Scanner {
    fn run(&mut self, diagnostics: &mut DiagnosticBag) {
        while let Some(c) = self.peek(0) {
            let start = self.position();
            match c {
                ' ' | '\t' | '\r' => self.advance(),
                '\n' => {
                    self.tokens.push(Token {
                        kind: TokenKind::EndOfLine,
                        text: "\n".into(),
                        range: TextRange::at(start),
                    });
                    self.index += 1;
                    self.line += 1;
                    self.column = 0;
                }
                '\'' => {
                    let len = self.line_remainder();
                    self.add_token(TokenKind::Comment, len);
                }
                '"' => self.scan_string(diagnostics),
                c if c.is_ascii_digit() => self.scan_number(),
                c if c.is_alphabetic() || c == '_' => self.scan_word(),
                c => {
                    if let Some((kind, len)) = self.operator(c) {
                        self.add_token(kind, len);
                    } else {
                        diagnostics.report(
                            DiagnosticCode::UnrecognizedCharacter,
                            TextRange::at(start),
                            [c.to_string()],
                        );
                        self.advance();
                    }
                }
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::EndOfFile,
            text: String::new(),
            range: TextRange::at(self.position()),
        });
    }

    fn operator(&self, c: char) -> Option<(TokenKind, usize)> {
        use TokenKind::*;
        let next = self.peek(1);
        Some(match (c, next) {
            ('<', Some('>')) => (NotEqual, 2),
            ('<', Some('=')) => (LessThanOrEqual, 2),
            ('>', Some('=')) => (GreaterThanOrEqual, 2),
            ('<', _) => (LessThan, 1),
            ('>', _) => (GreaterThan, 1),
            ('=', _) => (Equal, 1),
            ('+', _) => (Plus, 1),
            ('-', _) => (Minus, 1),
            ('*', _) => (Multiply, 1),
            ('/', _) => (Divide, 1),
            ('(', _) => (LeftParen, 1),
            (')', _) => (RightParen, 1),
            ('[', _) => (LeftBracket, 1),
            (']', _) => (RightBracket, 1),
            (',', _) => (Comma, 1),
            ('.', _) => (Dot, 1),
            (':', _) => (Colon, 1),
            _ => return None,
        })
    }

    fn scan_string(&mut self, diagnostics: &mut DiagnosticBag) {
        let closing = self.chars[self.index + 1..]
            .iter()
            .take_while(|c| **c != '\n')
            .position(|c| *c == '"');
        match closing {
            Some(offset) => {
                self.add_token(TokenKind::StringLiteral, offset + 2);
            }
            None => {
                let mut len = self.line_remainder();
                // a trailing \r belongs to the line break
                if len > 1 && self.peek(len - 1) == Some('\r') {
                    len -= 1;
                }
                let token = self.add_token(TokenKind::StringLiteral, len);
                diagnostics.report_plain(DiagnosticCode::UnterminatedStringLiteral, token.range);
            }
        }
    }

    fn scan_number(&mut self) {
        let mut len = self.count_while(0, |c| c.is_ascii_digit());
        if self.peek(len) == Some('.') {
            let fraction = self.count_while(len + 1, |c| c.is_ascii_digit());
            if fraction > 0 {
                len += 1 + fraction;
            }
        }
        self.add_token(TokenKind::NumberLiteral, len);
    }

    fn scan_word(&mut self) {
        let len = self.count_while(0, |c| c.is_alphanumeric() || c == '_');
        let word: String = self.chars[self.index..self.index + len].iter().collect();
        let kind = match Keyword::from_str(&word) {
            Ok(kw) => TokenKind::Keyword(kw),
            Err(_) => TokenKind::Identifier,
        };
        self.add_token(kind, len);
    }

    /// consumes `len` characters on the current line into a token and returns it
    fn add_token(&mut self, kind: TokenKind, len: usize) -> &Token {
        let start = self.position();
        let text: String = self.chars[self.index..self.index + len].iter().collect();
        self.index += len;
        self.column += len;
        let end = TextPosition::new(self.line, self.column - 1);
        self.tokens.push(Token {
            kind,
            text,
            range: TextRange { start, end },
        });
        &self.tokens[self.tokens.len() - 1]
    }

    fn count_while(&self, offset: usize, pred: impl Fn(char) -> bool) -> usize {
        self.chars
            .iter()
            .skip(self.index + offset)
            .take_while(|c| pred(**c))
            .count()
    }

    /// number of characters until the end of the current line, excluding the `\n`
    fn line_remainder(&self) -> usize {
        self.count_while(0, |c| c != '\n')
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn advance(&mut self) {
        self.index += 1;
        self.column += 1;
    }

    fn position(&self) -> TextPosition {
        TextPosition::new(self.line, self.column)
    }
}
