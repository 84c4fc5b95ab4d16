//! The nodes collector (§4.3): the main loop that pulls tokens, dispatches to
//! sub-parsers, and accumulates a [`NodeList`].
//!
//! The Python original signals end-of-stream and stopping conditions by
//! raising internal exceptions out of `process_one_token`. Rust has no
//! equivalent lightweight non-local-return, so both are modeled as ordinary
//! values: [`ProcessStep`] is `process_one_token`'s return, and
//! [`StopReason`] records *why* `process_tokens` stopped once it has.

use std::fmt;

use crate::context::SpecHandle;
use crate::error::{ErrorKind, LatexSyntaxError, NodesParseError, WalkerError};
use crate::nodes::{CommentNode, Node, NodeList};
use crate::reader::{ReadTokenError, TokenReader};
use crate::state::ParsingState;
use crate::state_delta::{apply_optional_delta, ParsingStateDelta};
use crate::token::{Token, TokenKind};
use crate::walker::Walker;

/// Why `process_tokens` stopped collecting.
#[derive(Clone, Debug)]
pub enum StopReason {
    EndOfStream,
    /// `stop_token_condition` matched; carries the triggering token, which
    /// the reader has been rewound to (not consumed).
    TokenCondition(Token),
    /// `stop_nodelist_condition` matched after a node was pushed.
    NodeListCondition,
}

/// What `process_one_token` accomplished this call.
pub enum ProcessStep {
    Continue,
    Stopped(StopReason),
}

/// A hint for [`NodesCollectorOptions::make_child_parsing_state`] describing
/// which kind of construct is about to be parsed, so a caller-supplied hook
/// can adjust the state per construct kind without the collector needing to
/// know what "adjust" means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeClassHint {
    Group,
    Math,
    Macro,
    Environment,
    Specials,
    Comment,
}

type StopTokenCondition<'a> = dyn Fn(&Token) -> bool + 'a;
type StopNodeListCondition<'a> = dyn Fn(&[Option<Node>]) -> bool + 'a;
type MakeChildParsingState<'a> = dyn Fn(&ParsingState, NodeClassHint) -> ParsingState + 'a;

/// Optional behavior for a [`NodesCollector`], mirroring the collector's
/// constructor parameters in §4.3.
pub struct NodesCollectorOptions<'a> {
    pub stop_token_condition: Option<Box<StopTokenCondition<'a>>>,
    pub stop_nodelist_condition: Option<Box<StopNodeListCondition<'a>>>,
    pub make_child_parsing_state: Option<Box<MakeChildParsingState<'a>>>,
    pub include_stop_token_pre_space_chars: bool,
}

impl<'a> Default for NodesCollectorOptions<'a> {
    fn default() -> Self {
        Self {
            stop_token_condition: None,
            stop_nodelist_condition: None,
            make_child_parsing_state: None,
            include_stop_token_pre_space_chars: true,
        }
    }
}

impl<'a> fmt::Debug for NodesCollectorOptions<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodesCollectorOptions")
            .field("stop_token_condition", &self.stop_token_condition.is_some())
            .field("stop_nodelist_condition", &self.stop_nodelist_condition.is_some())
            .field("make_child_parsing_state", &self.make_child_parsing_state.is_some())
            .field("include_stop_token_pre_space_chars", &self.include_stop_token_pre_space_chars)
            .finish()
    }
}

/// The central node-collection loop (§4.3).
pub struct NodesCollector<'a> {
    opts: NodesCollectorOptions<'a>,

    start_parsing_state: ParsingState,
    parsing_state: ParsingState,

    nodelist: Vec<Option<Node>>,
    pending_chars: String,
    pending_chars_pos: Option<usize>,

    finalized: bool,
    stop_reason: Option<StopReason>,
}

impl<'a> NodesCollector<'a> {
    pub fn new(parsing_state: ParsingState, opts: NodesCollectorOptions<'a>) -> Self {
        Self {
            opts,
            start_parsing_state: parsing_state.clone(),
            parsing_state,
            nodelist: Vec::new(),
            pending_chars: String::new(),
            pending_chars_pos: None,
            finalized: false,
            stop_reason: None,
        }
    }

    pub fn start_parsing_state(&self) -> &ParsingState {
        &self.start_parsing_state
    }

    pub fn parsing_state(&self) -> &ParsingState {
        &self.parsing_state
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn reached_end_of_stream(&self) -> bool {
        matches!(self.stop_reason, Some(StopReason::EndOfStream))
    }

    pub fn stop_token(&self) -> Option<&Token> {
        match &self.stop_reason {
            Some(StopReason::TokenCondition(tok)) => Some(tok),
            _ => None,
        }
    }

    pub fn stop_nodelist_condition_met(&self) -> bool {
        matches!(self.stop_reason, Some(StopReason::NodeListCondition))
    }

    /// The trailing parsing-state delta the caller should apply (or discard)
    /// once this collector finishes: how `parsing_state` diverged while
    /// collecting, as a single replacement delta.
    pub fn parser_parsing_state_delta(&self) -> Option<ParsingStateDelta> {
        Some(ParsingStateDelta::ReplaceParsingState(self.parsing_state.clone()))
    }

    /// Consumes the collector, returning the accumulated node list.
    ///
    /// Must only be called after [`Self::finalize`] has run (directly, or
    /// implicitly via [`Self::process_tokens`]).
    pub fn into_final_nodelist(self) -> Result<NodeList, WalkerError> {
        if !self.finalized {
            return Err(WalkerError::NotFinalized);
        }
        Ok(NodeList::new(self.nodelist))
    }

    /// Flushes any pending chars into a `Chars` node and marks the collector
    /// finalized. Idempotent; always safe to call even after an error.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.flush_pending_chars();
        self.finalized = true;
    }

    /// Runs [`Self::process_one_token`] until end-of-stream, a stopping
    /// condition, or a parse error, finalizing in every case.
    pub fn process_tokens(&mut self, walker: &mut Walker, reader: &mut TokenReader) -> Result<(), LatexSyntaxError> {
        let result = loop {
            match self.process_one_token(walker, reader) {
                Ok(ProcessStep::Continue) => continue,
                Ok(ProcessStep::Stopped(reason)) => {
                    self.stop_reason = Some(reason);
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };
        self.finalize();
        result
    }

    fn push_pending_chars(&mut self, pos: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.pending_chars_pos.is_none() {
            self.pending_chars_pos = Some(pos);
        }
        self.pending_chars.push_str(text);
    }

    /// Flushes pending chars (if any) into the node list. Returns `true` if
    /// doing so satisfied `stop_nodelist_condition`.
    fn flush_pending_chars(&mut self) -> bool {
        if self.pending_chars.is_empty() {
            return false;
        }
        let pos = self.pending_chars_pos.take().unwrap_or(0);
        let text = std::mem::take(&mut self.pending_chars);
        let pos_end = pos + text.len();
        let node = Node::Chars(crate::nodes::CharsNode {
            chars: text,
            parsing_state: self.parsing_state.clone(),
            pos,
            pos_end,
        });
        self.push_to_nodelist(node)
    }

    /// Pushes a node, returning `true` if `stop_nodelist_condition` is now
    /// satisfied.
    fn push_to_nodelist(&mut self, node: Node) -> bool {
        self.nodelist.push(Some(node));
        match &self.opts.stop_nodelist_condition {
            Some(cond) => cond(&self.nodelist),
            None => false,
        }
    }

    fn child_state(&self, hint: NodeClassHint) -> ParsingState {
        match &self.opts.make_child_parsing_state {
            Some(f) => f(&self.parsing_state, hint),
            None => self.parsing_state.clone(),
        }
    }

    fn recovery_nodes(&self) -> NodeList {
        NodeList::new(self.nodelist.clone())
    }

    fn process_one_token(&mut self, walker: &mut Walker, reader: &mut TokenReader) -> Result<ProcessStep, LatexSyntaxError> {
        let tok = match reader.peek_token(&self.parsing_state) {
            Ok(tok) => tok,
            Err(ReadTokenError::EndOfStream { final_space }) => {
                if !final_space.is_empty() {
                    let pos = reader.cur_pos();
                    self.push_pending_chars(pos, &final_space);
                    reader.move_to_pos_chars(pos + final_space.len());
                }
                return Ok(ProcessStep::Stopped(StopReason::EndOfStream));
            }
            Err(ReadTokenError::Parse(err)) => {
                return Err(NodesParseError::from_token_error(err, self.recovery_nodes()).into());
            }
        };

        if let Some(cond) = &self.opts.stop_token_condition {
            if cond(&tok) {
                if self.opts.include_stop_token_pre_space_chars && !tok.pre_space().is_empty() {
                    self.push_pending_chars(tok.pos() - tok.pre_space().len(), tok.pre_space());
                }
                reader.move_to_token(&tok, false);
                return Ok(ProcessStep::Stopped(StopReason::TokenCondition(tok)));
            }
        }

        if tok.kind() == TokenKind::Char {
            self.push_pending_chars(tok.pos() - tok.pre_space().len(), tok.pre_space());
            self.pending_chars.push_str(tok.arg_text().unwrap_or(""));
            if self.pending_chars_pos.is_none() {
                self.pending_chars_pos = Some(tok.pos());
            }
            reader.move_past_token(&tok, true);
            return Ok(ProcessStep::Continue);
        }

        // Fold this token's leading whitespace into the pending-chars buffer
        // (merging with anything already pending) before flushing.
        if !tok.pre_space().is_empty() {
            self.push_pending_chars(tok.pos() - tok.pre_space().len(), tok.pre_space());
        }
        if self.flush_pending_chars() {
            reader.move_to_token(&tok, true);
            return Ok(ProcessStep::Stopped(StopReason::NodeListCondition));
        }

        match tok.kind() {
            TokenKind::BraceClose => Err(NodesParseError::new(
                format!("Unexpected mismatching closing delimiter '{}'", tok.arg_text().unwrap_or("")),
                tok.pos(),
                0,
                0,
                ErrorKind::UnexpectedClosingGroupDelimiter { delimiter: tok.arg_text().unwrap_or("").to_string() },
            )
            .with_recovery_past_token(tok.clone())
            .with_recovery_nodes(self.recovery_nodes())
            .into()),

            TokenKind::EndEnvironment => Err(NodesParseError::new(
                format!("Unexpected closing environment '{}'", tok.arg_text().unwrap_or("")),
                tok.pos(),
                0,
                0,
                ErrorKind::UnexpectedEndEnvironment { environment_name: tok.arg_text().unwrap_or("").to_string() },
            )
            .with_recovery_past_token(tok.clone())
            .with_recovery_nodes(self.recovery_nodes())
            .into()),

            TokenKind::MathmodeInline | TokenKind::MathmodeDisplay => {
                let is_open = tok.arg_text().map(|d| self.parsing_state.lookup_math_open_delim(d).is_some()).unwrap_or(false);
                if !is_open {
                    let mathmode_type = if tok.kind() == TokenKind::MathmodeInline { "inline" } else { "display" };
                    return Err(NodesParseError::new(
                        "Unexpected closing math-mode delimiter",
                        tok.pos(),
                        0,
                        0,
                        ErrorKind::UnexpectedClosingMathDelimiter {
                            mathmode_type,
                            delimiter: tok.arg_text().unwrap_or("").to_string(),
                        },
                    )
                    .with_recovery_past_token(tok.clone())
                    .with_recovery_nodes(self.recovery_nodes())
                    .into());
                }
                reader.move_to_token(&tok, true);
                let node = self.parse_math(walker, reader, &tok)?;
                if self.push_to_nodelist(node) {
                    return Ok(ProcessStep::Stopped(StopReason::NodeListCondition));
                }
                Ok(ProcessStep::Continue)
            }

            TokenKind::Comment => {
                let node = self.parse_comment_node(&tok);
                reader.move_past_token(&tok, true);
                if self.push_to_nodelist(node) {
                    return Ok(ProcessStep::Stopped(StopReason::NodeListCondition));
                }
                Ok(ProcessStep::Continue)
            }

            TokenKind::BraceOpen => {
                reader.move_to_token(&tok, false);
                let node = self.parse_latex_group(walker, reader, &tok)?;
                if self.push_to_nodelist(node) {
                    return Ok(ProcessStep::Stopped(StopReason::NodeListCondition));
                }
                Ok(ProcessStep::Continue)
            }

            TokenKind::Macro => {
                let spec = self.parsing_state.latex_context().and_then(|ctx| ctx.get_macro_spec(tok.arg_text().unwrap_or("")));
                match spec {
                    Some(spec) => {
                        let node = self.parse_invocable_token_type(walker, reader, &tok, &spec, NodeClassHint::Macro)?;
                        if self.push_to_nodelist(node) {
                            return Ok(ProcessStep::Stopped(StopReason::NodeListCondition));
                        }
                        Ok(ProcessStep::Continue)
                    }
                    None => self.handle_unknown(reader, &tok, "macro", ErrorKind::UnknownMacro { name: tok.arg_text().unwrap_or("").to_string() }),
                }
            }

            TokenKind::BeginEnvironment => {
                let spec = self
                    .parsing_state
                    .latex_context()
                    .and_then(|ctx| ctx.get_environment_spec(tok.arg_text().unwrap_or("")));
                match spec {
                    Some(spec) => {
                        let node = self.parse_invocable_token_type(walker, reader, &tok, &spec, NodeClassHint::Environment)?;
                        if self.push_to_nodelist(node) {
                            return Ok(ProcessStep::Stopped(StopReason::NodeListCondition));
                        }
                        Ok(ProcessStep::Continue)
                    }
                    None => self.handle_unknown(
                        reader,
                        &tok,
                        "environment",
                        ErrorKind::UnknownEnvironment { name: tok.arg_text().unwrap_or("").to_string() },
                    ),
                }
            }

            TokenKind::Specials => {
                let spec = tok.arg_specials().cloned();
                match spec {
                    Some(spec) => {
                        let node = self.parse_invocable_token_type(walker, reader, &tok, &spec, NodeClassHint::Specials)?;
                        if self.push_to_nodelist(node) {
                            return Ok(ProcessStep::Stopped(StopReason::NodeListCondition));
                        }
                        Ok(ProcessStep::Continue)
                    }
                    None => self.handle_unknown(reader, &tok, "specials", ErrorKind::UnknownSpecials { chars: String::new() }),
                }
            }

            TokenKind::Char => unreachable!("char tokens are handled above"),
        }
    }

    fn handle_unknown(
        &mut self,
        reader: &mut TokenReader,
        tok: &Token,
        what: &str,
        kind: ErrorKind,
    ) -> Result<ProcessStep, LatexSyntaxError> {
        if reader.is_tolerant() {
            log::warn!("unknown {} '{}' at {}, ignoring (tolerant mode)", what, tok.arg_text().unwrap_or(""), tok.pos());
            reader.move_past_token(tok, false);
            return Ok(ProcessStep::Continue);
        }
        Err(NodesParseError::new(format!("Unknown {} '{}'", what, tok.arg_text().unwrap_or("")), tok.pos(), 0, 0, kind)
            .with_recovery_past_token(tok.clone())
            .with_recovery_nodes(self.recovery_nodes())
            .into())
    }

    fn parse_comment_node(&self, tok: &Token) -> Node {
        Node::Comment(CommentNode {
            comment: tok.arg_text().unwrap_or("").to_string(),
            comment_post_space: tok.post_space().to_string(),
            parsing_state: self.parsing_state.clone(),
            pos: tok.pos(),
            pos_end: tok.pos_end(),
        })
    }

    fn parse_latex_group(&mut self, walker: &mut Walker, reader: &mut TokenReader, tok: &Token) -> Result<Node, LatexSyntaxError> {
        let open = tok.arg_text().unwrap_or("{").to_string();
        let close = self.parsing_state.expected_group_close_delimiter(&open).unwrap_or("}").to_string();
        let parser = walker.make_latex_group_parser((open, close));
        let state = self.child_state(NodeClassHint::Group);
        let (node, delta) = walker.parse_content(parser.as_ref(), reader, state, "group")?;
        self.parsing_state = apply_optional_delta(&self.parsing_state, delta, walker);
        Ok(node)
    }

    fn parse_math(&mut self, walker: &mut Walker, reader: &mut TokenReader, tok: &Token) -> Result<Node, LatexSyntaxError> {
        let open = tok.arg_text().unwrap_or("$").to_string();
        let close = self
            .parsing_state
            .lookup_math_open_delim(&open)
            .map(|info| info.close_delim.clone())
            .unwrap_or_else(|| open.clone());
        let parser = walker.make_latex_math_parser((open, close));
        let state = self.child_state(NodeClassHint::Math);
        let (node, delta) = walker.parse_content(parser.as_ref(), reader, state, "math")?;
        self.parsing_state = apply_optional_delta(&self.parsing_state, delta, walker);
        Ok(node)
    }

    fn parse_invocable_token_type(
        &mut self,
        walker: &mut Walker,
        reader: &mut TokenReader,
        tok: &Token,
        spec: &SpecHandle,
        hint: NodeClassHint,
    ) -> Result<Node, LatexSyntaxError> {
        reader.move_past_token(tok, true);
        let node_parser = spec.get_node_parser(tok);
        let what = format!("{:?} '{}'", tok.kind(), tok.arg_text().unwrap_or(""));
        let state = self.child_state(hint);
        let (node, delta) = walker.parse_invocable(node_parser.as_ref(), spec, tok.clone(), reader, state, &what)?;
        self.parsing_state = apply_optional_delta(&self.parsing_state, delta, walker);
        Ok(spec.finalize_node(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn run(source: &str) -> (NodeList, bool) {
        let mut walker = Walker::new(source.to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from(source), false);
        let state = ParsingState::default();
        let mut collector = NodesCollector::new(state, NodesCollectorOptions::default());
        collector.process_tokens(&mut walker, &mut reader).unwrap();
        let eos = collector.reached_end_of_stream();
        (collector.into_final_nodelist().unwrap(), eos)
    }

    #[test]
    fn plain_text_collects_into_single_chars_node() {
        let (list, eos) = run("hello world");
        assert!(eos);
        assert_eq!(list.len(), 1);
        assert_eq!(list.nodes()[0].as_ref().unwrap().as_chars().unwrap().chars, "hello world");
    }

    #[test]
    fn unbalanced_closing_brace_is_error() {
        let mut walker = Walker::new("}".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from("}"), false);
        let mut collector = NodesCollector::new(ParsingState::default(), NodesCollectorOptions::default());
        let err = collector.process_tokens(&mut walker, &mut reader).unwrap_err();
        assert!(matches!(err, LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, ErrorKind::UnexpectedClosingGroupDelimiter { .. })));
    }

    #[test]
    fn unknown_macro_is_error_in_strict_mode() {
        let mut walker = Walker::new(r"\foo".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from(r"\foo"), false);
        let mut collector = NodesCollector::new(ParsingState::default(), NodesCollectorOptions::default());
        let err = collector.process_tokens(&mut walker, &mut reader).unwrap_err();
        assert!(matches!(err, LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, ErrorKind::UnknownMacro { .. })));
    }

    #[test]
    fn unknown_macro_is_ignored_in_tolerant_mode() {
        let mut walker = Walker::new(r"a\foo b".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from(r"a\foo b"), true);
        let mut collector = NodesCollector::new(ParsingState::default(), NodesCollectorOptions::default());
        collector.process_tokens(&mut walker, &mut reader).unwrap();
        let list = collector.into_final_nodelist().unwrap();
        let text: String = list
            .nodes()
            .iter()
            .flatten()
            .filter_map(|n| n.as_chars())
            .map(|c| c.chars.as_str())
            .collect();
        assert_eq!(text, "a b");
    }
}
