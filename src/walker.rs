//! The walker (§4.9): the narrow façade that mediates every recursive parse.
//!
//! `Walker` is the one place that knows the full source text (for
//! position→line/column mapping), the tolerant-parsing flag, and the
//! recursion-depth ceiling (§10.4). Parsers never recurse into each other
//! directly — they always go back through [`Walker::parse_content`] or
//! [`Walker::parse_invocable`], so depth accounting and open-context error
//! annotation happen in exactly one place.

use std::fmt;
use std::rc::Rc;

use crate::context::{NodeParser, SpecHandle};
use crate::collector::{NodesCollector, NodesCollectorOptions};
use crate::error::{LatexSyntaxError, OpenContextFrame, WalkerError};
use crate::nodes::{Node, NodeList};
use crate::reader::TokenReader;
use crate::state::{ParsingState, ParsingStateOverride};
use crate::state_delta::{ParsingStateDelta, ParsingStateEventHandler};
use crate::token::Token;

/// Parses some content given a reader and a parsing state, producing one
/// node plus an optional trailing parsing-state delta. Implemented by the
/// delimited-group/math parsers and the general-nodes parser; contrast with
/// [`NodeParser`], which additionally needs the initiating token and spec.
pub trait Parser: fmt::Debug {
    fn parse(
        &self,
        walker: &mut Walker,
        reader: &mut TokenReader,
        state: ParsingState,
    ) -> Result<(Node, Option<ParsingStateDelta>), LatexSyntaxError>;
}

#[derive(Clone, Debug)]
pub struct WalkerConfig {
    pub tolerant_parsing: bool,
    pub max_recursion_depth: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self { tolerant_parsing: false, max_recursion_depth: 256 }
    }
}

#[derive(Debug)]
pub struct Walker {
    source: Rc<str>,
    input_source_name: Option<String>,
    config: WalkerConfig,
    depth: usize,
}

impl Walker {
    pub fn new(source: String, input_source_name: Option<String>, config: WalkerConfig) -> Self {
        Self { source: Rc::from(source), input_source_name, config, depth: 0 }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn input_source_name(&self) -> Option<&str> {
        self.input_source_name.as_deref()
    }

    pub fn tolerant_parsing(&self) -> bool {
        self.config.tolerant_parsing
    }

    pub fn make_token_reader(&self) -> TokenReader {
        TokenReader::new(self.source.clone(), self.config.tolerant_parsing)
    }

    /// Hook point for a customized walker to post-process every node before
    /// it is pushed onto a node list. The default is the identity.
    pub fn make_node(&self, node: Node) -> Node {
        node
    }

    /// Hook point mirroring [`Self::make_node`] for whole node lists.
    pub fn make_nodelist(&self, nodes: Vec<Option<Node>>) -> NodeList {
        NodeList::new(nodes)
    }

    pub fn make_nodes_collector<'a>(&self, parsing_state: ParsingState, opts: NodesCollectorOptions<'a>) -> NodesCollector<'a> {
        NodesCollector::new(parsing_state, opts)
    }

    pub fn make_latex_group_parser(&self, delimiters: (String, String)) -> Box<dyn Parser> {
        Box::new(crate::parsers::delimited::GroupParser::new(delimiters))
    }

    pub fn make_latex_math_parser(&self, math_mode_delimiters: (String, String)) -> Box<dyn Parser> {
        Box::new(crate::parsers::delimited::MathParser::new(math_mode_delimiters))
    }

    pub fn parsing_state_event_handler(&self) -> &dyn ParsingStateEventHandler {
        self
    }

    /// In tolerant mode, logs and swallows `err` (returns `None`); otherwise
    /// hands it back unchanged for the caller to propagate.
    pub fn check_tolerant_parsing_ignore_error(&self, err: LatexSyntaxError) -> Option<LatexSyntaxError> {
        if self.config.tolerant_parsing {
            log::warn!("ignoring error in tolerant mode: {}", err);
            None
        } else {
            Some(err)
        }
    }

    /// 1-based (line, column) for a byte offset into the source.
    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        let clamped = pos.min(self.source.len());
        let mut line = 1usize;
        let mut col = 1usize;
        for c in self.source[..clamped].chars() {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    pub fn format_node_pos(&self, node: &Node) -> String {
        let (line, col) = self.line_col(node.pos());
        format!("line {}, col {}", line, col)
    }

    fn enter(&mut self) -> Result<(), LatexSyntaxError> {
        if self.depth >= self.config.max_recursion_depth {
            return Err(WalkerError::RecursionLimitExceeded { max_depth: self.config.max_recursion_depth }.into());
        }
        self.depth += 1;
        Ok(())
    }

    fn exit(&mut self) {
        self.depth -= 1;
    }

    /// Invokes `parser`, attaching an open-context frame to any error it
    /// raises (§4.9) and enforcing the recursion-depth guard (§10.4).
    pub fn parse_content(
        &mut self,
        parser: &dyn Parser,
        reader: &mut TokenReader,
        state: ParsingState,
        open_context_desc: &str,
    ) -> Result<(Node, Option<ParsingStateDelta>), LatexSyntaxError> {
        let pos = reader.cur_pos();
        self.enter()?;
        let result = parser.parse(self, reader, state);
        self.exit();
        result.map_err(|e| self.attach_open_context(e, open_context_desc, pos))
    }

    /// As [`Self::parse_content`], for the macro/environment/specials call
    /// parsers that additionally need the initiating token and spec.
    pub fn parse_invocable(
        &mut self,
        parser: &dyn NodeParser,
        spec: &SpecHandle,
        initiating_token: Token,
        reader: &mut TokenReader,
        state: ParsingState,
        open_context_desc: &str,
    ) -> Result<(Node, Option<ParsingStateDelta>), LatexSyntaxError> {
        let pos = initiating_token.pos();
        self.enter()?;
        let result = parser.parse(self, reader, state, initiating_token, spec);
        self.exit();
        result.map_err(|e| self.attach_open_context(e, open_context_desc, pos))
    }

    fn attach_open_context(&self, err: LatexSyntaxError, desc: &str, pos: usize) -> LatexSyntaxError {
        let (lineno, colno) = self.line_col(pos);
        let frame = OpenContextFrame { description: desc.to_string(), pos, lineno, colno };
        match err {
            LatexSyntaxError::Nodes(e) => LatexSyntaxError::Nodes(e.push_open_context(frame)),
            other => other,
        }
    }
}

impl ParsingStateEventHandler for Walker {
    fn enter_math_mode(&self, math_mode_delimiter: Option<&str>, _trigger_token: Option<&Token>) -> Option<ParsingStateDelta> {
        Some(ParsingStateDelta::SetAttributes(
            ParsingStateOverride::default().in_math_mode(true).math_mode_delimiter(math_mode_delimiter.unwrap_or("$")),
        ))
    }

    fn leave_math_mode(&self, _trigger_token: Option<&Token>) -> Option<ParsingStateDelta> {
        Some(ParsingStateDelta::SetAttributes(ParsingStateOverride::default().leave_math_mode()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_newlines() {
        let walker = Walker::new("ab\ncd\nef".to_string(), None, WalkerConfig::default());
        assert_eq!(walker.line_col(0), (1, 1));
        assert_eq!(walker.line_col(4), (2, 2));
        assert_eq!(walker.line_col(7), (3, 2));
    }

    #[test]
    fn tolerant_walker_swallows_errors() {
        let walker = Walker::new("x".to_string(), None, WalkerConfig { tolerant_parsing: true, max_recursion_depth: 256 });
        let err = WalkerError::Other("boom".to_string()).into();
        assert!(walker.check_tolerant_parsing_ignore_error(err).is_none());
    }

    #[test]
    fn strict_walker_propagates_errors() {
        let walker = Walker::new("x".to_string(), None, WalkerConfig::default());
        let err = WalkerError::Other("boom".to_string()).into();
        assert!(walker.check_tolerant_parsing_ignore_error(err).is_some());
    }
}
