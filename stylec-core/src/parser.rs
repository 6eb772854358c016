//! Declaration parser for the style language.
//!
//! A style program is a flat sequence of declarations; the bodies of
//! functions stay as uninterpreted token groups here and are only
//! given meaning by the stack interpreter.

use crate::error::CompileError;
use crate::lexer::{Token, TokenKind, lex};

/// Default value carried by an `OPTION` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionDefault {
    Int(i32),
    Str(String),
}

/// One top-level declaration of a style program, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `ENTRY {fields} {integer locals} {string locals}`
    Entry {
        fields: Vec<String>,
        int_fields: Vec<String>,
        str_fields: Vec<String>,
    },
    /// `STRINGS {names}`
    Strings(Vec<String>),
    /// `INTEGERS {names}`
    Integers(Vec<String>),
    /// `FUNCTION {name} {body}`
    Function { name: String, body: Vec<Token> },
    /// `MACRO {name} {"text"}`
    Macro { name: String, text: String },
    /// `OPTION INTEGER {name} #n` or `OPTION STRING {name} "text"`
    Option { name: String, default: OptionDefault },
    /// `EXECUTE {name}`
    Execute(String),
    /// `READ`
    Read,
    /// `ITERATE {name}`
    Iterate(String),
    /// `REVERSE {name}`
    Reverse(String),
    /// `SORT`
    Sort,
}

/// Parse a style program into its ordered declarations.
pub fn parse(source: &str) -> Result<Vec<Declaration>, CompileError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        index: 0,
    };
    parser.declarations()
}

struct Parser<'t> {
    tokens: &'t [Token],
    index: usize,
}

impl<'t> Parser<'t> {
    fn declarations(&mut self) -> Result<Vec<Declaration>, CompileError> {
        let mut declarations = Vec::new();
        while let Some(token) = self.next() {
            let position = token.position;
            let TokenKind::Ident(command) = &token.kind else {
                return Err(unexpected(position, "expected a command"));
            };
            let declaration = match command.as_str() {
                "entry" => {
                    let fields = self.name_block()?;
                    let int_fields = self.name_block()?;
                    let str_fields = self.name_block()?;
                    Declaration::Entry {
                        fields,
                        int_fields,
                        str_fields,
                    }
                }
                "strings" => Declaration::Strings(self.name_block()?),
                "integers" => Declaration::Integers(self.name_block()?),
                "function" => {
                    let name = self.single_name()?;
                    let body = self.block()?;
                    Declaration::Function { name, body }
                }
                "macro" => {
                    let name = self.single_name()?;
                    let text = self.string_block()?;
                    Declaration::Macro { name, text }
                }
                "option" => self.option(position)?,
                "execute" => Declaration::Execute(self.single_name()?),
                "iterate" => Declaration::Iterate(self.single_name()?),
                "reverse" => Declaration::Reverse(self.single_name()?),
                "read" => Declaration::Read,
                "sort" => Declaration::Sort,
                _ => return Err(unexpected(position, "unknown command")),
            };
            declarations.push(declaration);
        }
        Ok(declarations)
    }

    fn option(&mut self, position: usize) -> Result<Declaration, CompileError> {
        let Some(kind_token) = self.next() else {
            return Err(unexpected(position, "expected INTEGER or STRING after OPTION"));
        };
        let TokenKind::Ident(kind) = &kind_token.kind else {
            return Err(unexpected(
                kind_token.position,
                "expected INTEGER or STRING after OPTION",
            ));
        };
        let name = self.single_name()?;
        let default_token = self
            .next()
            .ok_or_else(|| unexpected(position, "expected a default value"))?;
        let default = match (kind.as_str(), &default_token.kind) {
            ("integer", TokenKind::Number(value)) => OptionDefault::Int(*value),
            ("string", TokenKind::Str(text)) => OptionDefault::Str(text.clone()),
            _ => {
                return Err(unexpected(
                    default_token.position,
                    "option default does not match the declared kind",
                ));
            }
        };
        Ok(Declaration::Option { name, default })
    }

    /// A block whose tokens are all identifiers: `{a b c}`.
    fn name_block(&mut self) -> Result<Vec<String>, CompileError> {
        let tokens = self.block()?;
        let mut names = Vec::with_capacity(tokens.len());
        for token in tokens {
            let TokenKind::Ident(name) = token.kind else {
                return Err(unexpected(token.position, "expected a name"));
            };
            names.push(name);
        }
        Ok(names)
    }

    /// A block holding exactly one identifier: `{name}`.
    fn single_name(&mut self) -> Result<String, CompileError> {
        let position = self.position();
        let mut names = self.name_block()?;
        if names.len() != 1 {
            return Err(unexpected(position, "expected a block with a single name"));
        }
        Ok(names.remove(0))
    }

    /// A block holding exactly one string literal: `{"text"}`.
    fn string_block(&mut self) -> Result<String, CompileError> {
        let position = self.position();
        let tokens = self.block()?;
        match tokens.as_slice() {
            [
                Token {
                    kind: TokenKind::Str(text),
                    ..
                },
            ] => Ok(text.clone()),
            _ => Err(unexpected(position, "expected a block with a single string")),
        }
    }

    fn block(&mut self) -> Result<Vec<Token>, CompileError> {
        let position = self.position();
        match self.next() {
            Some(Token {
                kind: TokenKind::Block(tokens),
                ..
            }) => Ok(tokens.clone()),
            Some(other) => Err(unexpected(other.position, "expected a '{' block")),
            None => Err(unexpected(position, "expected a '{' block")),
        }
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.index)?;
        self.index += 1;
        Some(token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .map(|t| t.position)
            .unwrap_or_else(|| {
                self.tokens.last().map(|t| t.position).unwrap_or(0)
            })
    }
}

fn unexpected(position: usize, message: &str) -> CompileError {
    CompileError::Syntax {
        position,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entry_declaration() {
        let decls = parse("ENTRY {author title} {lineno} {sort.key$}").expect("parse");
        assert_eq!(
            decls,
            vec![Declaration::Entry {
                fields: vec!["author".into(), "title".into()],
                int_fields: vec!["lineno".into()],
                str_fields: vec!["sort.key$".into()],
            }]
        );
    }

    #[test]
    fn parses_variable_declarations_in_order() {
        let decls = parse("INTEGERS {a b} STRINGS {s}").expect("parse");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0], Declaration::Integers(vec!["a".into(), "b".into()]));
        assert_eq!(decls[1], Declaration::Strings(vec!["s".into()]));
    }

    #[test]
    fn parses_function_with_body_tokens() {
        let decls = parse("FUNCTION {calc.sum}{ + }").expect("parse");
        let Declaration::Function { name, body } = &decls[0] else {
            panic!("expected a function");
        };
        assert_eq!(name, "calc.sum");
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].kind, TokenKind::Ident("+".into()));
    }

    #[test]
    fn parses_macro() {
        let decls = parse("MACRO {jan}{\"January\"}").expect("parse");
        assert_eq!(
            decls[0],
            Declaration::Macro {
                name: "jan".into(),
                text: "January".into(),
            }
        );
    }

    #[test]
    fn parses_option_defaults() {
        let decls =
            parse("OPTION INTEGER {min.crossrefs} #2 OPTION STRING {style.name} \"plain\"")
                .expect("parse");
        assert_eq!(
            decls[0],
            Declaration::Option {
                name: "min.crossrefs".into(),
                default: OptionDefault::Int(2),
            }
        );
        assert_eq!(
            decls[1],
            Declaration::Option {
                name: "style.name".into(),
                default: OptionDefault::Str("plain".into()),
            }
        );
    }

    #[test]
    fn parses_commands() {
        let decls = parse("READ EXECUTE {begin} ITERATE {call.type$} REVERSE {rev} SORT")
            .expect("parse");
        assert_eq!(
            decls,
            vec![
                Declaration::Read,
                Declaration::Execute("begin".into()),
                Declaration::Iterate("call.type$".into()),
                Declaration::Reverse("rev".into()),
                Declaration::Sort,
            ]
        );
    }

    #[test]
    fn rejects_unknown_command() {
        let err = parse("FROBNICATE {x}").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { position: 0, .. }));
    }

    #[test]
    fn rejects_mismatched_option_default() {
        let err = parse("OPTION INTEGER {x} \"oops\"").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn rejects_function_without_body() {
        let err = parse("FUNCTION {f}").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }
}
