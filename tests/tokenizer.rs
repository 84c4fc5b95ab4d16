//! Integration tests for the token reader (§4.1) against the public API.

use std::rc::Rc;
use test_case::test_case;

use latexnodes::reader::TokenReader;
use latexnodes::state::ParsingState;
use latexnodes::token::TokenKind;

fn first_token_kind(source: &str) -> TokenKind {
    let mut reader = TokenReader::new(Rc::from(source), false);
    let state = ParsingState::default();
    reader.peek_token(&state).unwrap().kind()
}

#[test_case("a", TokenKind::Char; "plain_char")]
#[test_case(r"\foo", TokenKind::Macro; "macro")]
#[test_case(r"\begin{x}", TokenKind::BeginEnvironment; "begin_environment")]
#[test_case(r"\end{x}", TokenKind::EndEnvironment; "end_environment")]
#[test_case("{", TokenKind::BraceOpen; "brace_open")]
#[test_case("}", TokenKind::BraceClose; "brace_close")]
#[test_case("$", TokenKind::MathmodeInline; "inline_math_delim")]
#[test_case("%comment\n", TokenKind::Comment; "comment")]
fn recognizes_token_kind(source: &str, expected: TokenKind) {
    assert_eq!(first_token_kind(source), expected);
}

#[test]
fn leading_whitespace_becomes_pre_space() {
    let mut reader = TokenReader::new(Rc::from("  \\foo"), false);
    let state = ParsingState::default();
    let tok = reader.peek_token(&state).unwrap();
    assert_eq!(tok.pre_space(), "  ");
    assert_eq!(tok.kind(), TokenKind::Macro);
}

#[test]
fn end_of_stream_reports_final_space() {
    let mut reader = TokenReader::new(Rc::from("   "), false);
    let state = ParsingState::default();
    let err = reader.peek_token(&state).unwrap_err();
    match err {
        latexnodes::reader::ReadTokenError::EndOfStream { final_space } => assert_eq!(final_space, "   "),
        other => panic!("expected end of stream, got {:?}", other),
    }
}

#[test]
fn forbidden_character_raises_typed_error() {
    let state = ParsingState::default().sub_context(
        latexnodes::state::ParsingStateOverride::default().forbidden_characters("\t"),
    );
    let mut reader = TokenReader::new(Rc::from("\tx"), false);
    let err = reader.peek_token(&state).unwrap_err();
    match err {
        latexnodes::reader::ReadTokenError::Parse(e) => {
            assert!(matches!(e.error_type_info, latexnodes::ErrorKind::ForbiddenCharacter { found: '\t' }))
        }
        other => panic!("expected a forbidden-character parse error, got {:?}", other),
    }
}
