//! The expression parser (§4.5): parses exactly one "atomic" LaTeX
//! expression — a character, a macro/specials call, or a braced group —
//! skipping leading comments along the way. Environments are disabled while
//! scanning, so `\begin`/`\end` are rejected rather than silently starting a
//! nested environment. Used as the `m`/`{` standard-argument parser
//! ([`crate::parsers::standard_argument`]) and anywhere a single expression
//! rather than a run of content is needed.

use crate::context::SpecHandle;
use crate::error::{ErrorKind, LatexSyntaxError, NodesParseError};
use crate::nodes::{CharsNode, Node, NodeList};
use crate::reader::{ReadTokenError, TokenReader};
use crate::state::{ParsingState, ParsingStateOverride};
use crate::state_delta::ParsingStateDelta;
use crate::token::{Token, TokenKind};
use crate::walker::{Parser, Walker};

#[derive(Debug)]
pub struct ExpressionParser {
    /// If true (the default), a macro/specials call whose spec requires at
    /// least one argument is a parse error rather than a bare node.
    pub single_token_requiring_arg_is_error: bool,
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self { single_token_requiring_arg_is_error: true }
    }
}

impl ExpressionParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Parser for ExpressionParser {
    fn parse(
        &self,
        walker: &mut Walker,
        reader: &mut TokenReader,
        state: ParsingState,
    ) -> Result<(Node, Option<ParsingStateDelta>), LatexSyntaxError> {
        let expr_state = state.sub_context(ParsingStateOverride::default().enable_environments(false));

        loop {
            let pos_start = reader.cur_pos();
            let tok = match reader.peek_token(&expr_state) {
                Ok(t) => t,
                Err(ReadTokenError::Parse(e)) => {
                    return Err(NodesParseError::from_token_error(e, NodeList::empty()).into());
                }
                Err(ReadTokenError::EndOfStream { .. }) => {
                    return Err(NodesParseError::new(
                        "Expected an expression, got end of input",
                        pos_start,
                        0,
                        0,
                        ErrorKind::ExpressionExpectedGotClosingBrace,
                    )
                    .into());
                }
            };

            match tok.kind() {
                TokenKind::Comment => {
                    reader.move_past_token(&tok, true);
                    continue;
                }
                TokenKind::Char => {
                    reader.move_past_token(&tok, true);
                    let node = Node::Chars(CharsNode {
                        chars: tok.arg_text().unwrap_or("").to_string(),
                        parsing_state: state.clone(),
                        pos: tok.pos(),
                        pos_end: tok.pos_end(),
                    });
                    return Ok((node, None));
                }
                TokenKind::BraceClose => {
                    return Err(NodesParseError::new(
                        "Expected an expression, got a closing brace",
                        tok.pos(),
                        0,
                        0,
                        ErrorKind::ExpressionExpectedGotClosingBrace,
                    )
                    .with_recovery_at_token(tok)
                    .into());
                }
                TokenKind::MathmodeInline | TokenKind::MathmodeDisplay => {
                    return Err(NodesParseError::new(
                        "Expected an expression, got a math-mode delimiter",
                        tok.pos(),
                        0,
                        0,
                        ErrorKind::ExpressionExpectedGotMathDelimiter,
                    )
                    .with_recovery_at_token(tok)
                    .into());
                }
                TokenKind::BraceOpen => {
                    reader.move_to_token(&tok, false);
                    let open = tok.arg_text().unwrap_or("{").to_string();
                    let close = state.expected_group_close_delimiter(&open).unwrap_or("}").to_string();
                    let parser = walker.make_latex_group_parser((open, close));
                    return walker.parse_content(parser.as_ref(), reader, state.clone(), "argument group");
                }
                TokenKind::BeginEnvironment | TokenKind::EndEnvironment => {
                    return Err(NodesParseError::new(
                        "\\begin/\\end is not allowed inside an expression",
                        tok.pos(),
                        0,
                        0,
                        ErrorKind::BeginEndNotAllowedInExpression,
                    )
                    .with_recovery_at_token(tok)
                    .into());
                }
                TokenKind::Macro => {
                    let name = tok.arg_text().unwrap_or("").to_string();
                    if name == "begin" || name == "end" {
                        return Err(NodesParseError::new(
                            "\\begin/\\end is not allowed inside an expression",
                            tok.pos(),
                            0,
                            0,
                            ErrorKind::BeginEndNotAllowedInExpression,
                        )
                        .with_recovery_at_token(tok)
                        .into());
                    }
                    let spec = expr_state.latex_context().and_then(|ctx| ctx.get_macro_spec(&name));
                    return self.finish_call(walker, reader, &state, tok, spec, name, false);
                }
                TokenKind::Specials => {
                    let spec = tok.arg_specials().cloned();
                    let name = walker.source()[tok.pos()..tok.pos_end()].to_string();
                    return self.finish_call(walker, reader, &state, tok, spec, name, true);
                }
            }
        }
    }
}

impl ExpressionParser {
    fn finish_call(
        &self,
        walker: &mut Walker,
        reader: &mut TokenReader,
        state: &ParsingState,
        tok: Token,
        spec: Option<SpecHandle>,
        name: String,
        is_specials: bool,
    ) -> Result<(Node, Option<ParsingStateDelta>), LatexSyntaxError> {
        let spec = match spec {
            Some(s) => s,
            None => {
                let kind_word = if is_specials { "specials" } else { "macro" };
                return Err(NodesParseError::new(
                    format!("Unknown {} '{}'", kind_word, name),
                    tok.pos(),
                    0,
                    0,
                    if is_specials { ErrorKind::UnknownSpecials { chars: name } } else { ErrorKind::UnknownMacro { name } },
                )
                .with_recovery_at_token(tok)
                .into());
            }
        };

        if !spec.argument_specs().is_empty() && self.single_token_requiring_arg_is_error {
            return Err(NodesParseError::new(
                format!("'{}' takes arguments and cannot appear bare in an expression", name),
                tok.pos(),
                0,
                0,
                ErrorKind::CallableWithMandatoryArgumentsInExpression { name },
            )
            .with_recovery_at_token(tok)
            .into());
        }

        reader.move_past_token(&tok, true);
        let node_parser = spec.get_node_parser(&tok);
        let what = format!("{:?} '{}'", tok.kind(), name);
        walker.parse_invocable(node_parser.as_ref(), &spec, tok, reader, state.clone(), &what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{LatexContextDb, Spec};
    use std::rc::Rc;

    #[derive(Debug)]
    struct BareMacro;
    impl Spec for BareMacro {
        fn repr(&self) -> String {
            "BareMacro".to_string()
        }
    }

    #[derive(Debug, Default)]
    struct Ctx;
    impl LatexContextDb for Ctx {
        fn get_macro_spec(&self, name: &str) -> Option<SpecHandle> {
            (name == "foo").then(|| Rc::new(BareMacro) as SpecHandle)
        }
        fn get_environment_spec(&self, _name: &str) -> Option<SpecHandle> {
            None
        }
        fn get_specials_spec(&self, _chars: &str) -> Option<SpecHandle> {
            None
        }
        fn test_for_specials(&self, _s: &str, _pos: usize, _state: &ParsingState) -> Option<(SpecHandle, usize)> {
            None
        }
    }

    fn state_with_ctx() -> ParsingState {
        ParsingState::default().sub_context(ParsingStateOverride::default().latex_context(Some(Rc::new(Ctx))))
    }

    #[test]
    fn single_char_is_a_chars_node() {
        let mut walker = Walker::new("a".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from("a"), false);
        let (node, delta) = ExpressionParser::new().parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
        assert!(delta.is_none());
        assert_eq!(node.as_chars().unwrap().chars, "a");
    }

    #[test]
    fn closing_brace_is_an_error() {
        let mut walker = Walker::new("}".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from("}"), false);
        let err = ExpressionParser::new().parse(&mut walker, &mut reader, ParsingState::default()).unwrap_err();
        assert!(matches!(err, LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, ErrorKind::ExpressionExpectedGotClosingBrace)));
    }

    #[test]
    fn bare_macro_with_no_args_parses_as_macro_node() {
        let mut walker = Walker::new(r"\foo".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from(r"\foo"), false);
        let (node, _) = ExpressionParser::new().parse(&mut walker, &mut reader, state_with_ctx()).unwrap();
        assert_eq!(node.as_macro().unwrap().macroname, "foo");
    }

    #[test]
    fn begin_is_rejected() {
        let mut walker = Walker::new(r"\begin{a}".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from(r"\begin{a}"), false);
        let err = ExpressionParser::new().parse(&mut walker, &mut reader, ParsingState::default()).unwrap_err();
        assert!(matches!(err, LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, ErrorKind::BeginEndNotAllowedInExpression)));
    }
}
