//! The context database contract (§3.6 / §6).
//!
//! This module defines the *interface* between the parsing core and the
//! concrete macro/environment/specials definition layer ("macrospec" in the
//! design this crate grew from). The core never hard-codes what `\textbf`
//! or `align` mean; it only ever asks a [`LatexContextDb`] implementation.
//!
//! [`Spec`] is deliberately narrow: [`Spec::get_node_parser`] hands back a
//! [`NodeParser`] that does the actual work of consuming arguments and
//! (for environments) a body. Most specs don't need a fully custom parser —
//! [`Spec::argument_specs`] plus the other hook methods are enough for the
//! crate's built-in call parser ([`crate::parsers::call`]) to do the job;
//! overriding [`Spec::get_node_parser`] is only needed for constructs with
//! genuinely unusual syntax (e.g. `\verb|...|`).

use std::fmt;
use std::rc::Rc;

use crate::error::LatexSyntaxError;
use crate::nodes::{Node, ParsedArguments};
use crate::reader::TokenReader;
use crate::state::ParsingState;
use crate::state_delta::ParsingStateDelta;
use crate::token::Token;
use crate::walker::Walker;

pub type SpecHandle = Rc<dyn Spec>;
pub type NodeParserHandle = Rc<dyn NodeParser>;
pub type ContextDbHandle = Rc<dyn LatexContextDb>;

/// One argument slot declared by a [`Spec`] (§3.5/§4.6): a compact
/// standard-argument spec string (consumed by
/// [`crate::parsers::standard_argument::make_argument_parser`]) plus an
/// optional name. A named argument can be looked up later by that name
/// through [`crate::nodes::ParsedArgumentsInfo::get_argument_info`] instead
/// of its position, so that inserting an earlier argument doesn't silently
/// renumber every later lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub spec: String,
    pub argname: Option<String>,
}

impl ArgumentSpec {
    pub fn new(spec: impl Into<String>) -> Self {
        Self { spec: spec.into(), argname: None }
    }

    pub fn named(spec: impl Into<String>, argname: impl Into<String>) -> Self {
        Self { spec: spec.into(), argname: Some(argname.into()) }
    }
}

/// Parses one macro/environment/specials invocation: everything from (and
/// including) the initiating token through the end of its arguments and
/// (for environments) body.
///
/// Implementations recurse back through `walker` for any sub-content they
/// need to parse (arguments, environment bodies), so that the walker stays
/// the single point where tolerant-mode error handling and recursion-depth
/// accounting happen.
pub trait NodeParser: fmt::Debug {
    fn parse(
        &self,
        walker: &mut Walker,
        reader: &mut TokenReader,
        state: ParsingState,
        initiating_token: Token,
        spec: &SpecHandle,
    ) -> Result<(Node, Option<ParsingStateDelta>), LatexSyntaxError>;
}

/// The policy object describing how to parse one kind of macro, environment,
/// or specials occurrence. Opaque to the core beyond this trait.
pub trait Spec: fmt::Debug {
    /// Returns the parser to use for an occurrence introduced by
    /// `initiating_token`. The default returns the crate's built-in
    /// argument/body-driven call parser, which consults the hook methods
    /// below.
    fn get_node_parser(&self, initiating_token: &Token) -> NodeParserHandle {
        let _ = initiating_token;
        Rc::new(crate::parsers::call::CallParser)
    }

    /// Argument declarations (§4.6) describing this construct's call
    /// signature, e.g. one mandatory and one leading-optional argument.
    /// Empty means "no arguments".
    fn argument_specs(&self) -> &[ArgumentSpec] {
        &[]
    }

    /// True if this spec introduces an environment (has a body terminated by
    /// `\end{name}`) rather than a macro or specials (which never have a
    /// body).
    fn is_environment(&self) -> bool {
        false
    }

    /// A state delta to apply only while parsing this construct's own
    /// arguments (e.g. forcing math mode inside `\sqrt`'s argument).
    fn make_arguments_parsing_state_delta(&self, state: &ParsingState) -> Option<ParsingStateDelta> {
        let _ = state;
        None
    }

    /// A state delta to apply while parsing an environment's body.
    fn make_body_parsing_state_delta(
        &self,
        state: &ParsingState,
        args: &ParsedArguments,
    ) -> Option<ParsingStateDelta> {
        let _ = (state, args);
        None
    }

    /// A state delta that escapes this construct entirely, affecting
    /// everything that follows it at the same nesting level (e.g. a macro
    /// that toggles math mode for the remainder of the enclosing group).
    fn make_after_parsing_state_delta(
        &self,
        state: &ParsingState,
        args: &ParsedArguments,
    ) -> Option<ParsingStateDelta> {
        let _ = (state, args);
        None
    }

    /// Last chance to adjust the constructed node before it is pushed onto
    /// the node list.
    fn finalize_node(&self, node: Node) -> Node {
        node
    }

    /// Opaque serialization string used when nodes referencing this spec are
    /// JSON-encoded (§6). Specs are never reconstructed from this string;
    /// it exists purely for diagnostic/golden-file output.
    fn repr(&self) -> String;
}

/// The five pure query operations the parsing core performs against the
/// macro/environment/specials definition layer.
pub trait LatexContextDb: fmt::Debug {
    fn get_macro_spec(&self, name: &str) -> Option<SpecHandle>;
    fn get_environment_spec(&self, name: &str) -> Option<SpecHandle>;
    fn get_specials_spec(&self, chars: &str) -> Option<SpecHandle>;

    /// Matches the longest recognized specials sequence starting at byte
    /// offset `pos` in `s`, returning the spec and the byte length matched.
    /// Implementations must respect longest-match: if both `"-"` and `"--"`
    /// are registered and the input has `"--"`, this must return `"--"`'s
    /// spec with length 2, not `"-"`'s with length 1.
    fn test_for_specials(&self, s: &str, pos: usize, state: &ParsingState) -> Option<(SpecHandle, usize)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug)]
    pub struct BareSpec(pub &'static str);

    impl Spec for BareSpec {
        fn repr(&self) -> String {
            format!("BareSpec({})", self.0)
        }
    }

    #[derive(Debug, Default)]
    pub struct MapContextDb {
        pub macros: HashMap<String, SpecHandle>,
        pub environments: HashMap<String, SpecHandle>,
        pub specials: Vec<(String, SpecHandle)>,
    }

    impl LatexContextDb for MapContextDb {
        fn get_macro_spec(&self, name: &str) -> Option<SpecHandle> {
            self.macros.get(name).cloned()
        }
        fn get_environment_spec(&self, name: &str) -> Option<SpecHandle> {
            self.environments.get(name).cloned()
        }
        fn get_specials_spec(&self, chars: &str) -> Option<SpecHandle> {
            self.specials.iter().find(|(c, _)| c == chars).map(|(_, s)| s.clone())
        }
        fn test_for_specials(&self, s: &str, pos: usize, _state: &ParsingState) -> Option<(SpecHandle, usize)> {
            // Longest-match: the `specials` table must be scanned longest-chars-first
            // by the caller constructing this context, but we sort defensively here too.
            let mut candidates: Vec<_> = self
                .specials
                .iter()
                .filter(|(chars, _)| s[pos..].starts_with(chars.as_str()))
                .collect();
            candidates.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
            candidates.first().map(|(chars, spec)| (spec.clone(), chars.len()))
        }
    }

    #[test]
    fn longest_match_wins() {
        let mut db = MapContextDb::default();
        db.specials.push(("-".to_string(), Rc::new(BareSpec("-"))));
        db.specials.push(("--".to_string(), Rc::new(BareSpec("--"))));
        let state = ParsingState::default();
        let (found, len) = db.test_for_specials("a--b", 1, &state).unwrap();
        assert_eq!(found.repr(), "BareSpec(--)");
        assert_eq!(len, 2);
    }
}
