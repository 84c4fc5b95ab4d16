//! Parser combinators (§4.4–§4.8): delimited groups/math, expressions,
//! standard arguments, optional markers, and verbatim content, plus the
//! built-in call parser (§4.3.1) that drives them from a [`crate::context::Spec`].
//!
//! Every parser here only ever recurses back through
//! [`crate::walker::Walker`], never directly into another parser.

pub mod call;
pub mod delimited;
pub mod expression;
pub mod general;
pub mod optional_chars;
pub mod standard_argument;
pub mod verbatim;
