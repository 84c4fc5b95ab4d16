//! Integration tests for the single-expression parser (§4.5), including the
//! `\begin`/`\end` rejection and mandatory-argument rejection paths.

use std::rc::Rc;

use latexnodes::context::{ArgumentSpec, LatexContextDb, Spec, SpecHandle};
use latexnodes::parsers::expression::ExpressionParser;
use latexnodes::reader::TokenReader;
use latexnodes::state::{ParsingState, ParsingStateOverride};
use latexnodes::walker::{Parser, Walker};
use latexnodes::{ErrorKind, LatexSyntaxError};

#[derive(Debug)]
struct BareMacro;
impl Spec for BareMacro {
    fn repr(&self) -> String {
        "BareMacro".to_string()
    }
}

#[derive(Debug)]
struct OneArgMacro;
impl Spec for OneArgMacro {
    fn argument_specs(&self) -> &[ArgumentSpec] {
        static SPECS: std::sync::OnceLock<Vec<ArgumentSpec>> = std::sync::OnceLock::new();
        SPECS.get_or_init(|| vec![ArgumentSpec::new("m")])
    }
    fn repr(&self) -> String {
        "OneArgMacro".to_string()
    }
}

#[derive(Debug, Default)]
struct Ctx;
impl LatexContextDb for Ctx {
    fn get_macro_spec(&self, name: &str) -> Option<SpecHandle> {
        match name {
            "foo" => Some(Rc::new(BareMacro)),
            "needsarg" => Some(Rc::new(OneArgMacro)),
            _ => None,
        }
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
fn begin_raises_the_dedicated_error_not_unknown_macro() {
    let mut walker = Walker::new(r"\begin{a}".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from(r"\begin{a}"), false);
    let err = ExpressionParser::new().parse(&mut walker, &mut reader, state_with_ctx()).unwrap_err();
    assert!(matches!(
        err,
        LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, ErrorKind::BeginEndNotAllowedInExpression)
    ));
}

#[test]
fn end_raises_the_dedicated_error_too() {
    let mut walker = Walker::new(r"\end{a}".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from(r"\end{a}"), false);
    let err = ExpressionParser::new().parse(&mut walker, &mut reader, state_with_ctx()).unwrap_err();
    assert!(matches!(
        err,
        LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, ErrorKind::BeginEndNotAllowedInExpression)
    ));
}

#[test]
fn braced_group_delegates_to_the_group_parser() {
    let mut walker = Walker::new("{ab}tail".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("{ab}tail"), false);
    let (node, _) = ExpressionParser::new().parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
    assert_eq!(node.as_group().unwrap().nodelist.content_as_chars().unwrap(), "ab");
}

#[test]
fn macro_requiring_an_argument_is_rejected_bare() {
    let mut walker = Walker::new(r"\needsarg".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from(r"\needsarg"), false);
    let err = ExpressionParser::new().parse(&mut walker, &mut reader, state_with_ctx()).unwrap_err();
    assert!(matches!(
        err,
        LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, ErrorKind::CallableWithMandatoryArgumentsInExpression { .. })
    ));
}

#[test]
fn unknown_macro_is_an_error() {
    let mut walker = Walker::new(r"\nope".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from(r"\nope"), false);
    let err = ExpressionParser::new().parse(&mut walker, &mut reader, state_with_ctx()).unwrap_err();
    assert!(matches!(
        err,
        LatexSyntaxError::Nodes(e) if matches!(e.error_type_info, ErrorKind::UnknownMacro { .. })
    ));
}

#[test]
fn leading_comments_are_skipped_not_collected() {
    let mut walker = Walker::new("%note\na".to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from("%note\na"), false);
    let (node, _) = ExpressionParser::new().parse(&mut walker, &mut reader, ParsingState::default()).unwrap();
    assert_eq!(node.as_chars().unwrap().chars, "a");
}
