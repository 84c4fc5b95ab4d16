//! Lexical tokens (§3.1 / §4.1).
//!
//! A [`Token`] is the unit the [reader](crate::reader) hands to the
//! [collector](crate::collector): a kind tag, a payload, a half-open byte
//! span, and the whitespace immediately surrounding it. Tokens are cheap to
//! clone (payload text is short-lived and owned; specials payloads are a
//! reference-counted spec handle), since the collector and delimited-group
//! parser routinely rewind the reader to a token they've already produced.

use std::fmt;

use crate::context::SpecHandle;

/// The closed set of lexical categories a [`Token`] can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Char,
    Macro,
    BeginEnvironment,
    EndEnvironment,
    Comment,
    BraceOpen,
    BraceClose,
    MathmodeInline,
    MathmodeDisplay,
    Specials,
}

/// The token's content: either literal text (characters, macro/environment
/// names, comment bodies, delimiter characters) or a resolved specials spec
/// handle.
///
/// Specials carry a spec handle rather than raw text because recognizing a
/// specials token already required a successful context-database lookup
/// (`test_for_specials`); macros and environments, by contrast, are
/// delimited unambiguously by LaTeX syntax alone and are looked up later, by
/// the collector.
#[derive(Clone, Debug)]
pub enum TokenPayload {
    Text(String),
    Specials(SpecHandle),
}

impl TokenPayload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TokenPayload::Text(s) => Some(s.as_str()),
            TokenPayload::Specials(_) => None,
        }
    }

    pub fn as_specials(&self) -> Option<&SpecHandle> {
        match self {
            TokenPayload::Text(_) => None,
            TokenPayload::Specials(spec) => Some(spec),
        }
    }
}

impl PartialEq for TokenPayload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TokenPayload::Text(a), TokenPayload::Text(b)) => a == b,
            (TokenPayload::Specials(a), TokenPayload::Specials(b)) => SpecHandle::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A single lexical token, as produced by [`crate::reader::TokenReader`].
///
/// Invariants (see §3.1): `pos <= pos_end`; `pos_end - pos` spans the token
/// *including* trailing whitespace (`post_space`, only meaningful for
/// `Macro`/`Comment`) but *excluding* leading whitespace (`pre_space`); two
/// consecutive newlines never appear inside `pre_space` or `post_space`.
#[derive(Clone, Debug)]
pub struct Token {
    kind: TokenKind,
    payload: TokenPayload,
    pos: usize,
    pos_end: usize,
    pre_space: String,
    post_space: String,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        payload: TokenPayload,
        pos: usize,
        pos_end: usize,
        pre_space: String,
    ) -> Self {
        debug_assert!(pos <= pos_end, "token pos {pos} > pos_end {pos_end}");
        Self {
            kind,
            payload,
            pos,
            pos_end,
            pre_space,
            post_space: String::new(),
        }
    }

    pub fn with_post_space(mut self, post_space: String) -> Self {
        self.post_space = post_space;
        self
    }

    pub fn text(kind: TokenKind, text: impl Into<String>, pos: usize, pos_end: usize, pre_space: String) -> Self {
        Self::new(kind, TokenPayload::Text(text.into()), pos, pos_end, pre_space)
    }

    pub fn specials(spec: SpecHandle, pos: usize, pos_end: usize, pre_space: String) -> Self {
        Self::new(TokenKind::Specials, TokenPayload::Specials(spec), pos, pos_end, pre_space)
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn payload(&self) -> &TokenPayload {
        &self.payload
    }

    pub fn arg_text(&self) -> Option<&str> {
        self.payload.as_text()
    }

    pub fn arg_specials(&self) -> Option<&SpecHandle> {
        self.payload.as_specials()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn pos_end(&self) -> usize {
        self.pos_end
    }

    pub fn pre_space(&self) -> &str {
        &self.pre_space
    }

    pub fn set_pre_space(&mut self, pre_space: String) {
        self.pre_space = pre_space;
    }

    pub fn post_space(&self) -> &str {
        &self.post_space
    }

    /// `pos_end - pos`, the length of the token's own span (excluding
    /// `pre_space`, including `post_space`).
    pub fn len(&self) -> usize {
        self.pos_end - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The position immediately *before* `pre_space`, i.e. where a reader
    /// rewind with `rewind_pre_space = true` would land.
    pub fn pos_before_pre_space(&self) -> usize {
        self.pos - self.pre_space.len()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}({:?})@{}..{}",
            self.kind,
            self.payload.as_text().unwrap_or("<specials>"),
            self.pos,
            self.pos_end
        )
    }
}
