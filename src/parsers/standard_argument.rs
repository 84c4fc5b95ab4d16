//! Standard-argument parsers (§4.6): translates a compact argument-spec
//! string (`"m"`, `"o"`, `"s"`, `"t*"`, `"r()"`, `"d[]"`, `"v"`, ...) into a
//! parser for that one argument slot. Used by [`crate::parsers::call`] to
//! walk a [`crate::context::Spec::argument_specs`] list.

use crate::error::LatexSyntaxError;
use crate::nodes::Node;
use crate::parsers::delimited::{extend_group_delims, GroupParser};
use crate::parsers::expression::ExpressionParser;
use crate::parsers::optional_chars::{marker_node, scan_chars_marker};
use crate::parsers::verbatim::read_delimited_verbatim_group;
use crate::reader::TokenReader;
use crate::state::ParsingState;
use crate::state_delta::ParsingStateDelta;
use crate::token::TokenKind;
use crate::walker::Walker;

/// Parses one argument slot, which may legitimately be absent (an optional
/// argument not present at the call site), unlike [`crate::walker::Parser`]
/// which always produces a node.
pub trait ArgumentParser: std::fmt::Debug {
    fn parse(
        &self,
        walker: &mut Walker,
        reader: &mut TokenReader,
        state: ParsingState,
    ) -> Result<(Option<Node>, Option<ParsingStateDelta>), LatexSyntaxError>;
}

#[derive(Debug)]
struct MandatoryExpressionArg;

impl ArgumentParser for MandatoryExpressionArg {
    fn parse(&self, walker: &mut Walker, reader: &mut TokenReader, state: ParsingState) -> Result<(Option<Node>, Option<ParsingStateDelta>), LatexSyntaxError> {
        let parser = ExpressionParser::new();
        let (node, delta) = walker.parse_content(&parser, reader, state, "argument")?;
        Ok((Some(node), delta))
    }
}

#[derive(Debug)]
struct RequiredGroupArg {
    open: String,
    close: String,
}

impl ArgumentParser for RequiredGroupArg {
    fn parse(&self, walker: &mut Walker, reader: &mut TokenReader, state: ParsingState) -> Result<(Option<Node>, Option<ParsingStateDelta>), LatexSyntaxError> {
        let group = GroupParser::new((self.open.clone(), self.close.clone()));
        let (node, delta) = walker.parse_content(&group, reader, state, "argument")?;
        Ok((Some(node), delta))
    }
}

#[derive(Debug)]
struct OptionalGroupArg {
    open: String,
    close: String,
}

impl ArgumentParser for OptionalGroupArg {
    fn parse(&self, walker: &mut Walker, reader: &mut TokenReader, state: ParsingState) -> Result<(Option<Node>, Option<ParsingStateDelta>), LatexSyntaxError> {
        let probe_state = extend_group_delims(&state, &self.open, &self.close);
        let before = reader.cur_pos();
        let present = match reader.peek_token(&probe_state) {
            Ok(tok) => tok.kind() == TokenKind::BraceOpen && tok.arg_text() == Some(self.open.as_str()),
            Err(_) => false,
        };
        reader.move_to_pos_chars(before);
        if !present {
            return Ok((None, None));
        }
        let group = GroupParser::new((self.open.clone(), self.close.clone()));
        let (node, delta) = walker.parse_content(&group, reader, state, "optional argument")?;
        Ok((Some(node), delta))
    }
}

#[derive(Debug)]
struct CharMarkerArg {
    candidates: Vec<String>,
}

impl ArgumentParser for CharMarkerArg {
    fn parse(&self, _walker: &mut Walker, reader: &mut TokenReader, state: ParsingState) -> Result<(Option<Node>, Option<ParsingStateDelta>), LatexSyntaxError> {
        match scan_chars_marker(reader, &state, &self.candidates) {
            Some((text, pos, pos_end)) => Ok((Some(Node::Chars(marker_node(text, state, pos, pos_end))), None)),
            None => Ok((None, None)),
        }
    }
}

#[derive(Debug)]
struct VerbatimArg {
    delimiters: Option<(char, char)>,
}

impl ArgumentParser for VerbatimArg {
    fn parse(&self, _walker: &mut Walker, reader: &mut TokenReader, state: ParsingState) -> Result<(Option<Node>, Option<ParsingStateDelta>), LatexSyntaxError> {
        let node = read_delimited_verbatim_group(reader, self.delimiters, &state)?;
        Ok((Some(node), None))
    }
}

/// Translates one argument-spec string into its parser. Unrecognized specs
/// fall back to a mandatory expression, matching the behavior of an unknown
/// single-character spec in the original.
pub fn make_argument_parser(spec: &str) -> Box<dyn ArgumentParser> {
    let mut chars = spec.chars();
    match chars.next() {
        Some('m') | Some('{') => Box::new(MandatoryExpressionArg),
        Some('o') | Some('[') => Box::new(OptionalGroupArg { open: "[".to_string(), close: "]".to_string() }),
        Some('s') | Some('*') => Box::new(CharMarkerArg { candidates: vec!["*".to_string()] }),
        Some('t') => {
            let c = chars.next().unwrap_or('*');
            Box::new(CharMarkerArg { candidates: vec![c.to_string()] })
        }
        Some('r') => {
            let o = chars.next().unwrap_or('{');
            let c = chars.next().unwrap_or('}');
            Box::new(RequiredGroupArg { open: o.to_string(), close: c.to_string() })
        }
        Some('d') => {
            let o = chars.next().unwrap_or('[');
            let c = chars.next().unwrap_or(']');
            Box::new(OptionalGroupArg { open: o.to_string(), close: c.to_string() })
        }
        Some('v') => {
            let rest: Vec<char> = chars.collect();
            let delimiters = if rest.len() >= 2 { Some((rest[0], rest[1])) } else { None };
            Box::new(VerbatimArg { delimiters })
        }
        _ => Box::new(MandatoryExpressionArg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn mandatory_arg_parses_a_group() {
        let mut walker = Walker::new("{ab}rest".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from("{ab}rest"), false);
        let parser = make_argument_parser("m");
        let (node, _) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
        assert_eq!(node.unwrap().as_group().unwrap().nodelist.content_as_chars().unwrap(), "ab");
    }

    #[test]
    fn optional_arg_absent_returns_none() {
        let mut walker = Walker::new("rest".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from("rest"), false);
        let parser = make_argument_parser("o");
        let (node, _) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
        assert!(node.is_none());
        assert_eq!(reader.cur_pos(), 0);
    }

    #[test]
    fn optional_arg_present_parses_brackets() {
        let mut walker = Walker::new("[ab]rest".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from("[ab]rest"), false);
        let parser = make_argument_parser("o");
        let (node, _) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
        assert_eq!(node.unwrap().as_group().unwrap().nodelist.content_as_chars().unwrap(), "ab");
    }

    #[test]
    fn star_marker_parses_when_present() {
        let mut walker = Walker::new("*rest".to_string(), None, Default::default());
        let mut reader = TokenReader::new(Rc::from("*rest"), false);
        let parser = make_argument_parser("s");
        let (node, _) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
        assert_eq!(node.unwrap().as_chars().unwrap().chars, "*");
    }
}
