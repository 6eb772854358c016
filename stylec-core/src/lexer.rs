//! Lexer for the style language.
//!
//! The lexer is intentionally simple: it recognizes the five token
//! shapes of the language and nothing more. Identifiers are normalized
//! to lower case because the style language is case-insensitive.

use crate::error::CompileError;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Signed integer literal, written `#123` or `#-4`.
    Number(i32),
    /// String literal. There is no escaping; a closing quote always
    /// ends the literal.
    Str(String),
    /// Quote-literal `'name`: a bare reference to a name, used as an
    /// operand rather than invoked.
    Quote(String),
    /// Brace-delimited group. Blocks nest arbitrarily and are kept as
    /// an uninterpreted token slice for later passes.
    Block(Vec<Token>),
    /// Bare identifier, lower-cased.
    Ident(String),
}

/// A single token with the byte offset of its first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    pub fn ident(name: impl Into<String>, position: usize) -> Token {
        Token {
            kind: TokenKind::Ident(name.into()),
            position,
        }
    }
}

/// Lex a style source string into tokens.
///
/// `%` starts a comment running to the end of the line. Fails with
/// `CompileError::Syntax` on unterminated strings or blocks and on a
/// stray closing brace.
pub fn lex(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer {
        bytes: source.as_bytes(),
        index: 0,
    };
    lexer.tokens(false)
}

struct Lexer<'src> {
    bytes: &'src [u8],
    index: usize,
}

impl<'src> Lexer<'src> {
    /// Lex a token sequence until end of input, or until the closing
    /// brace of the block currently being lexed.
    fn tokens(&mut self, in_block: bool) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();
            let start = self.index;
            let Some(ch) = self.peek() else {
                if in_block {
                    return Err(CompileError::Syntax {
                        position: start,
                        message: "unterminated block".into(),
                    });
                }
                return Ok(tokens);
            };

            match ch {
                b'}' => {
                    if in_block {
                        return Ok(tokens);
                    }
                    return Err(CompileError::Syntax {
                        position: start,
                        message: "unexpected '}'".into(),
                    });
                }
                b'{' => {
                    self.consume();
                    let inner = self.tokens(true)?;
                    // tokens() stops at the closing brace; consume it.
                    self.consume();
                    tokens.push(Token {
                        kind: TokenKind::Block(inner),
                        position: start,
                    });
                }
                b'"' => {
                    self.consume();
                    tokens.push(self.string(start)?);
                }
                b'#' => {
                    self.consume();
                    tokens.push(self.number(start)?);
                }
                b'\'' => {
                    self.consume();
                    let name = self.ident_text();
                    if name.is_empty() {
                        return Err(CompileError::Syntax {
                            position: start,
                            message: "expected a name after '''".into(),
                        });
                    }
                    tokens.push(Token {
                        kind: TokenKind::Quote(name),
                        position: start,
                    });
                }
                _ => {
                    let name = self.ident_text();
                    if name.is_empty() {
                        return Err(CompileError::Syntax {
                            position: start,
                            message: "unexpected character".into(),
                        });
                    }
                    tokens.push(Token {
                        kind: TokenKind::Ident(name),
                        position: start,
                    });
                }
            }
        }
    }

    fn string(&mut self, start: usize) -> Result<Token, CompileError> {
        let content_start = self.index;
        while let Some(ch) = self.peek() {
            if ch == b'"' {
                let text = self.text(content_start, self.index);
                self.consume();
                return Ok(Token {
                    kind: TokenKind::Str(text),
                    position: start,
                });
            }
            self.consume();
        }
        Err(CompileError::Syntax {
            position: start,
            message: "unterminated string literal".into(),
        })
    }

    fn number(&mut self, start: usize) -> Result<Token, CompileError> {
        let digits_start = self.index;
        if self.peek() == Some(b'-') {
            self.consume();
        }
        let mut has_digits = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                has_digits = true;
                self.consume();
            } else {
                break;
            }
        }
        if !has_digits {
            return Err(CompileError::Syntax {
                position: start,
                message: "expected digits after '#'".into(),
            });
        }
        let text = self.text(digits_start, self.index);
        let value = text.parse::<i32>().map_err(|_| CompileError::Syntax {
            position: start,
            message: "integer literal out of range".into(),
        })?;
        Ok(Token {
            kind: TokenKind::Number(value),
            position: start,
        })
    }

    /// Consume identifier characters: anything except whitespace, the
    /// delimiters, and comment markers. Returns the lower-cased text.
    fn ident_text(&mut self) -> String {
        let start = self.index;
        while let Some(ch) = self.peek() {
            if is_whitespace(ch) || matches!(ch, b'{' | b'}' | b'"' | b'#' | b'\'' | b'%') {
                break;
            }
            self.consume();
        }
        self.text(start, self.index).to_ascii_lowercase()
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if is_whitespace(ch) {
                self.consume();
            } else if ch == b'%' {
                while let Some(c) = self.peek() {
                    self.consume();
                    if c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.bytes[start..end]).into_owned()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn consume(&mut self) {
        if self.index < self.bytes.len() {
            self.index += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_numbers_strings_and_idents() {
        let tokens = lex("#42 \"hello\" write$").expect("lex");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Number(42));
        assert_eq!(tokens[1].kind, TokenKind::Str("hello".into()));
        assert_eq!(tokens[2].kind, TokenKind::Ident("write$".into()));
    }

    #[test]
    fn lexes_negative_numbers() {
        let tokens = lex("#-7").expect("lex");
        assert_eq!(tokens[0].kind, TokenKind::Number(-7));
    }

    #[test]
    fn normalizes_identifiers_to_lower_case() {
        let tokens = lex("FUNCTION Chop.Word").expect("lex");
        assert_eq!(tokens[0].kind, TokenKind::Ident("function".into()));
        assert_eq!(tokens[1].kind, TokenKind::Ident("chop.word".into()));
    }

    #[test]
    fn lexes_quote_literals() {
        let tokens = lex("'skip$").expect("lex");
        assert_eq!(tokens[0].kind, TokenKind::Quote("skip$".into()));
    }

    #[test]
    fn lexes_nested_blocks() {
        let tokens = lex("{ a { b c } d }").expect("lex");
        assert_eq!(tokens.len(), 1);
        let TokenKind::Block(outer) = &tokens[0].kind else {
            panic!("expected a block");
        };
        assert_eq!(outer.len(), 3);
        assert!(matches!(outer[1].kind, TokenKind::Block(ref inner) if inner.len() == 2));
    }

    #[test]
    fn skips_comments() {
        let tokens = lex("a % comment until end of line\nb").expect("lex");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Ident("b".into()));
    }

    #[test]
    fn string_has_no_escapes() {
        // A backslash does not escape the closing quote.
        let tokens = lex(r#""a\" b"#).expect("lex");
        assert_eq!(tokens[0].kind, TokenKind::Str("a\\".into()));
        assert_eq!(tokens[1].kind, TokenKind::Ident("b".into()));
    }

    #[test]
    fn reports_unterminated_string_with_position() {
        let err = lex("abc \"open").unwrap_err();
        assert_eq!(
            err,
            CompileError::Syntax {
                position: 4,
                message: "unterminated string literal".into(),
            }
        );
    }

    #[test]
    fn reports_unterminated_block() {
        let err = lex("{ a { b }").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn reports_stray_closing_brace() {
        let err = lex("a }").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { position: 2, .. }));
    }

    #[test]
    fn reports_number_without_digits() {
        let err = lex("# x").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }
}
