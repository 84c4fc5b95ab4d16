//! Integration tests for the verbatim parsers (§4.8).

use std::rc::Rc;

use latexnodes::parsers::verbatim::{read_delimited_verbatim, read_delimited_verbatim_group, read_environment_verbatim};
use latexnodes::reader::TokenReader;
use latexnodes::state::ParsingState;
use latexnodes::{ErrorKind, LatexSyntaxError};

#[test]
fn brace_pair_is_auto_detected_and_does_not_tokenize_contents() {
    let mut reader = TokenReader::new(Rc::from(r"{\foo %not a comment}rest"), false);
    let state = ParsingState::default();
    let (text, open, close, ..) = read_delimited_verbatim(&mut reader, None, &state).unwrap();
    assert_eq!(text, r"\foo %not a comment");
    assert_eq!((open, close), ('{', '}'));
}

#[test]
fn explicit_delimiters_override_auto_detection() {
    let mut reader = TokenReader::new(Rc::from("|raw|tail"), false);
    let state = ParsingState::default();
    let (text, ..) = read_delimited_verbatim(&mut reader, Some(('|', '|')), &state).unwrap();
    assert_eq!(text, "raw");
}

#[test]
fn unterminated_verbatim_is_a_typed_error_with_recovery() {
    let mut reader = TokenReader::new(Rc::from("|raw"), false);
    let state = ParsingState::default();
    let err = read_delimited_verbatim(&mut reader, None, &state).unwrap_err();
    assert!(matches!(
        err,
        LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, ErrorKind::VerbatimUnterminated)
    ));
}

#[test]
fn verbatim_group_wraps_content_with_delimiter_pair() {
    let mut reader = TokenReader::new(Rc::from("{raw}tail"), false);
    let state = ParsingState::default();
    let node = read_delimited_verbatim_group(&mut reader, None, &state).unwrap();
    let group = node.as_group().unwrap();
    assert_eq!(group.delimiters, ("{".to_string(), "}".to_string()));
    assert_eq!(group.nodelist.content_as_chars().unwrap(), "raw");
}

#[test]
fn environment_verbatim_strips_one_leading_newline() {
    let mut reader = TokenReader::new(Rc::from("\n\nraw\n\\end{verbatim}"), false);
    let state = ParsingState::default();
    let node = read_environment_verbatim(&mut reader, '\\', "verbatim", &state).unwrap();
    assert_eq!(node.as_chars().unwrap().chars, "\nraw\n");
}
