//! `latexnodes` parses a LaTeX character stream into a structured syntax
//! tree (nodes). It is a parser, not a typesetting engine: it never expands
//! macros, tracks counters, or renders output.
//!
//! The crate is organized around four cooperating subsystems, mirroring the
//! distilled design this implementation grew from:
//!
//! - [`token`] / [`reader`]: a pull-based, context-sensitive tokenizer.
//! - [`state`] / [`state_delta`]: the immutable parsing state and the deltas
//!   that describe how a parsed construct mutates it for what follows.
//! - [`collector`]: the main node-collection loop.
//! - [`parsers`]: the family of recursive-descent combinators (general
//!   nodes, delimited groups/math, expressions, standard arguments,
//!   verbatim, optional markers) that build the tree.
//!
//! Concrete macro/environment/specials definitions are never hard-coded
//! here; callers supply them through the [`context::LatexContextDb`] trait.

pub mod collector;
pub mod context;
pub mod error;
pub mod nodes;
pub mod parsers;
pub mod reader;
pub mod state;
pub mod state_delta;
pub mod token;
pub mod walker;

pub use error::{ErrorKind, LatexSyntaxError, NodesParseError, TokenParseError, WalkerError};
pub use nodes::{Node, NodeList};
pub use state::ParsingState;
pub use state_delta::ParsingStateDelta;
pub use token::{Token, TokenKind};
pub use walker::Walker;
