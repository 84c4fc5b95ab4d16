//! Delimited-expression parsers (§4.4): a group wrapped in a pair of
//! delimiters, or a math-mode span.
//!
//! Both specializations share the same shape: peek the opening delimiter,
//! hand the inside off to a general-nodes collector stopped on the matching
//! closing delimiter, then build the wrapping node. They differ in how they
//! recognize their delimiters and in what happens to the parsing state
//! across the boundary: a group discards its contents' trailing state delta
//! by default, math mode does not (closing a math span needs to tell the
//! caller to leave math mode).

use crate::error::{ErrorKind, LatexSyntaxError, NodesParseError};
use crate::nodes::{GroupNode, MathDisplayType, MathNode, Node, NodeList};
use crate::parsers::general::run_general_nodes;
use crate::reader::{ReadTokenError, TokenReader};
use crate::state::{ParsingState, ParsingStateOverride};
use crate::state_delta::{apply_optional_delta, ParsingStateDelta};
use crate::token::{Token, TokenKind};
use crate::walker::{Parser, Walker};
use crate::collector::NodesCollectorOptions;

/// Extends `state`'s recognized group delimiters with `(open, close)` if
/// they aren't already present, so a custom delimiter pair (e.g. `[`/`]`
/// for an optional argument) is tokenized as `BraceOpen`/`BraceClose` for
/// the duration of this parse. A no-op when the pair is already registered.
pub(crate) fn extend_group_delims(state: &ParsingState, open: &str, close: &str) -> ParsingState {
    if state.latex_group_delimiters().iter().any(|(o, c)| o == open && c == close) {
        state.clone()
    } else {
        let mut delims = state.latex_group_delimiters().to_vec();
        delims.push((open.to_string(), close.to_string()));
        state.sub_context(ParsingStateOverride::default().latex_group_delimiters(delims))
    }
}

#[derive(Clone, Debug)]
pub struct GroupParser {
    delimiters: (String, String),
}

impl GroupParser {
    pub fn new(delimiters: (String, String)) -> Self {
        Self { delimiters }
    }
}

impl Parser for GroupParser {
    fn parse(
        &self,
        walker: &mut Walker,
        reader: &mut TokenReader,
        state: ParsingState,
    ) -> Result<(Node, Option<ParsingStateDelta>), LatexSyntaxError> {
        let (open, close) = &self.delimiters;
        let group_state = extend_group_delims(&state, open, close);
        let pos_start = reader.cur_pos();

        let tok = match reader.peek_token(&group_state) {
            Ok(t) => t,
            Err(ReadTokenError::Parse(e)) => return Err(NodesParseError::from_token_error(e, NodeList::empty()).into()),
            Err(ReadTokenError::EndOfStream { .. }) => {
                return Err(NodesParseError::new(
                    format!("Expected opening delimiter '{}', got end of input", open),
                    pos_start,
                    0,
                    0,
                    ErrorKind::OpeningDelimiterNotFound,
                )
                .into());
            }
        };
        if tok.kind() != TokenKind::BraceOpen || tok.arg_text() != Some(open.as_str()) {
            return Err(NodesParseError::new(
                format!("Expected opening delimiter '{}'", open),
                pos_start,
                0,
                0,
                ErrorKind::OpeningDelimiterNotFound,
            )
            .into());
        }
        reader.move_past_token(&tok, true);

        let close_owned = close.clone();
        let mut opts = NodesCollectorOptions::default();
        opts.stop_token_condition = Some(Box::new(move |t: &Token| t.kind() == TokenKind::BraceClose && t.arg_text() == Some(close_owned.as_str())));
        let mut collector = run_general_nodes(walker, reader, group_state, opts)?;

        let close_tok = match collector.stop_token().cloned() {
            Some(t) => t,
            None => {
                let nodelist = collector.into_final_nodelist()?;
                return Err(NodesParseError::new(
                    format!("Unterminated group, expected closing '{}'", close),
                    pos_start,
                    0,
                    0,
                    ErrorKind::OpeningDelimiterNotFound,
                )
                .with_recovery_nodes(nodelist)
                .into());
            }
        };
        reader.move_past_token(&close_tok, true);

        let nodelist = collector.into_final_nodelist()?;
        let pos_end = reader.cur_pos();
        let node = Node::Group(GroupNode {
            nodelist,
            delimiters: (open.clone(), close.clone()),
            parsing_state: state,
            pos: pos_start,
            pos_end,
        });
        Ok((node, None))
    }
}

#[derive(Clone, Debug)]
pub struct MathParser {
    delimiters: (String, String),
}

impl MathParser {
    pub fn new(math_mode_delimiters: (String, String)) -> Self {
        Self { delimiters: math_mode_delimiters }
    }
}

impl Parser for MathParser {
    fn parse(
        &self,
        walker: &mut Walker,
        reader: &mut TokenReader,
        state: ParsingState,
    ) -> Result<(Node, Option<ParsingStateDelta>), LatexSyntaxError> {
        let (open, close) = self.delimiters.clone();
        let pos_start = reader.cur_pos();

        let tok = match reader.peek_token(&state) {
            Ok(t) => t,
            Err(ReadTokenError::Parse(e)) => return Err(NodesParseError::from_token_error(e, NodeList::empty()).into()),
            Err(ReadTokenError::EndOfStream { .. }) => {
                return Err(NodesParseError::new(
                    format!("Expected math-mode delimiter '{}', got end of input", open),
                    pos_start,
                    0,
                    0,
                    ErrorKind::OpeningDelimiterNotFound,
                )
                .into());
            }
        };
        if !matches!(tok.kind(), TokenKind::MathmodeInline | TokenKind::MathmodeDisplay) || tok.arg_text() != Some(open.as_str()) {
            return Err(NodesParseError::new(
                format!("Expected math-mode delimiter '{}'", open),
                pos_start,
                0,
                0,
                ErrorKind::OpeningDelimiterNotFound,
            )
            .into());
        }
        let kind = tok.kind();
        reader.move_past_token(&tok, true);

        let contents_state = apply_optional_delta(
            &state,
            Some(ParsingStateDelta::enter_math_mode(open.clone(), Some(tok.clone()))),
            walker,
        );

        let close_owned = close.clone();
        let mut opts = NodesCollectorOptions::default();
        opts.stop_token_condition = Some(Box::new(move |t: &Token| t.kind() == kind && t.arg_text() == Some(close_owned.as_str())));
        let mut collector = run_general_nodes(walker, reader, contents_state, opts)?;

        let close_tok = match collector.stop_token().cloned() {
            Some(t) => t,
            None => {
                let nodelist = collector.into_final_nodelist()?;
                return Err(NodesParseError::new(
                    format!("Unterminated math mode, expected '{}'", close),
                    pos_start,
                    0,
                    0,
                    ErrorKind::OpeningDelimiterNotFound,
                )
                .with_recovery_nodes(nodelist)
                .into());
            }
        };
        reader.move_past_token(&close_tok, true);

        let nodelist = collector.into_final_nodelist()?;
        let pos_end = reader.cur_pos();
        let displaytype = if kind == TokenKind::MathmodeDisplay { MathDisplayType::Display } else { MathDisplayType::Inline };
        let node = Node::Math(MathNode {
            displaytype,
            nodelist,
            delimiters: (open, close),
            parsing_state: state,
            pos: pos_start,
            pos_end,
        });

        // Math mode is left open across the boundary (unlike a group, whose
        // contents' trailing delta is discarded): the caller must apply this
        // so whatever follows sees `in_math_mode() == false` again.
        let leave_delta = ParsingStateDelta::leave_math_mode(Some(close_tok));
        Ok((node, Some(leave_delta)))
    }
}
