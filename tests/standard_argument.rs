//! Integration tests for standard-argument spec parsing (§4.6), driven
//! through [`make_argument_parser`] the way [`crate::parsers::call::CallParser`]
//! uses it.

use std::rc::Rc;

use latexnodes::parsers::standard_argument::make_argument_parser;
use latexnodes::reader::TokenReader;
use latexnodes::state::ParsingState;
use latexnodes::walker::Walker;

#[test]
fn required_custom_delimiter_group_parses() {
    let mut walker = Walker::new("(x)tail".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("(x)tail"), false);
    let parser = make_argument_parser("r()");
    let (node, _) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
    assert_eq!(node.unwrap().as_group().unwrap().nodelist.content_as_chars().unwrap(), "x");
}

#[test]
fn optional_custom_delimiter_group_absent_leaves_reader_untouched() {
    let mut walker = Walker::new("tail".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("tail"), false);
    let parser = make_argument_parser("d()");
    let (node, _) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
    assert!(node.is_none());
    assert_eq!(reader.cur_pos(), 0);
}

#[test]
fn named_token_marker_matches_given_char() {
    let mut walker = Walker::new("!tail".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("!tail"), false);
    let parser = make_argument_parser("t!");
    let (node, _) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
    assert_eq!(node.unwrap().as_chars().unwrap().chars, "!");
}

#[test]
fn verbatim_argument_reads_raw_delimited_text() {
    let mut walker = Walker::new("|raw stuff|tail".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("|raw stuff|tail"), false);
    let parser = make_argument_parser("v");
    let (node, _) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
    assert_eq!(node.unwrap().as_group().unwrap().nodelist.content_as_chars().unwrap(), "raw stuff");
}

#[test]
fn mandatory_expression_argument_accepts_a_bare_character() {
    let mut walker = Walker::new("xtail".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("xtail"), false);
    let parser = make_argument_parser("m");
    let (node, _) = parser.parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
    assert_eq!(node.unwrap().as_chars().unwrap().chars, "x");
}
