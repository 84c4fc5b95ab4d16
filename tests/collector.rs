//! Integration tests for the nodes collector (§4.3), end to end through the
//! public API: source text in, a [`latexnodes::NodeList`] or a typed error
//! out.

use std::rc::Rc;

use latexnodes::collector::{NodesCollector, NodesCollectorOptions};
use latexnodes::reader::TokenReader;
use latexnodes::state::ParsingState;
use latexnodes::walker::Walker;
use latexnodes::{LatexSyntaxError, Node};

fn collect(source: &str) -> Result<(latexnodes::NodeList, bool), LatexSyntaxError> {
    let mut walker = Walker::new(source.to_string(), None, Default::default());
    let mut reader = TokenReader::new(Rc::from(source), false);
    let mut collector = NodesCollector::new(ParsingState::default(), NodesCollectorOptions::default());
    collector.process_tokens(&mut walker, &mut reader)?;
    let eos = collector.reached_end_of_stream();
    Ok((collector.into_final_nodelist().unwrap(), eos))
}

#[test]
fn plain_text_with_a_group_produces_two_nodes() {
    let (list, eos) = collect("hi {there}").unwrap();
    assert!(eos);
    assert_eq!(list.len(), 2);
    assert_eq!(list.nodes()[0].as_ref().unwrap().as_chars().unwrap().chars, "hi ");
    let group = list.nodes()[1].as_ref().unwrap().as_group().unwrap();
    assert_eq!(group.nodelist.content_as_chars().unwrap(), "there");
}

#[test]
fn nested_groups_parse_recursively() {
    let (list, _) = collect("{a{b}c}").unwrap();
    assert_eq!(list.len(), 1);
    let outer = list.nodes()[0].as_ref().unwrap().as_group().unwrap();
    assert_eq!(outer.nodelist.len(), 3);
    let inner = outer.nodelist.nodes()[1].as_ref().unwrap().as_group().unwrap();
    assert_eq!(inner.nodelist.content_as_chars().unwrap(), "b");
}

#[test]
fn unbalanced_group_close_is_a_typed_error() {
    let err = collect("a}b").unwrap_err();
    let LatexSyntaxError::Nodes(e) = err else { panic!("expected Nodes error") };
    assert!(matches!(e.error_type_info, latexnodes::ErrorKind::UnexpectedClosingGroupDelimiter { .. }));
    // Recovery nodes should contain what was collected before the error.
    assert_eq!(e.recovery_nodes.as_ref().unwrap().content_as_chars().unwrap(), "a");
}

#[test]
fn recursion_depth_guard_trips_on_deep_nesting() {
    let depth = 300;
    let source = format!("{}{}", "{".repeat(depth), "}".repeat(depth));
    let err = collect(&source).unwrap_err();
    assert!(matches!(err, LatexSyntaxError::Walker(latexnodes::WalkerError::RecursionLimitExceeded { .. })));
}

#[test]
fn comments_are_collected_as_comment_nodes() {
    let (list, _) = collect("a%note\nb").unwrap();
    let has_comment = list.nodes().iter().flatten().any(|n| matches!(n, Node::Comment(c) if c.comment == "note"));
    assert!(has_comment);
}
