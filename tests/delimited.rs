//! Integration tests for the delimited group/math parsers (§4.4) via the
//! walker's recursive entry points.

use std::rc::Rc;

use latexnodes::nodes::MathDisplayType;
use latexnodes::parsers::delimited::{GroupParser, MathParser};
use latexnodes::reader::TokenReader;
use latexnodes::state::ParsingState;
use latexnodes::state_delta::apply_optional_delta;
use latexnodes::walker::{Parser, Walker};

#[test]
fn group_parser_recurses_into_nested_groups_via_the_walker() {
    let mut walker = Walker::new("{a{b{c}d}e}tail".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("{a{b{c}d}e}tail"), false);
    let parser = GroupParser::new(("{".to_string(), "}".to_string()));
    let (node, delta) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
    assert!(delta.is_none());
    let outer = node.as_group().unwrap();
    assert_eq!(outer.nodelist.len(), 3);
    let mid = outer.nodelist.nodes()[1].as_ref().unwrap().as_group().unwrap();
    assert_eq!(mid.nodelist.len(), 3);
    let inner = mid.nodelist.nodes()[1].as_ref().unwrap().as_group().unwrap();
    assert_eq!(inner.nodelist.content_as_chars().unwrap(), "c");
    assert_eq!(reader.cur_pos(), "{a{b{c}d}e}".len());
}

#[test]
fn math_parser_display_mode_round_trips_delta() {
    let mut walker = Walker::new("$$x+y$$tail".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("$$x+y$$tail"), false);
    let state = ParsingState::default();
    let parser = MathParser::new(("$$".to_string(), "$$".to_string()));
    let (node, delta) = parser.parse(&mut walker, &mut reader, state.clone()).unwrap();
    let math = match &node {
        latexnodes::Node::Math(m) => m,
        _ => panic!("expected a math node"),
    };
    assert_eq!(math.displaytype, MathDisplayType::Display);
    assert_eq!(math.nodelist.content_as_chars().unwrap(), "x+y");
    // Leaving math mode should be a no-op when we were never in it.
    let after = apply_optional_delta(&state, delta, &mut walker);
    assert!(!after.in_math_mode());
}

#[test]
fn group_parser_rejects_mismatched_custom_delimiters() {
    let mut walker = Walker::new("[a]tail".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("[a]tail"), false);
    let parser = GroupParser::new(("{".to_string(), "}".to_string()));
    let err = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap_err();
    assert!(matches!(
        err,
        latexnodes::LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, latexnodes::ErrorKind::OpeningDelimiterNotFound)
    ));
}
