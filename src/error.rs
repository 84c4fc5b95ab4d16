//! Typed error hierarchy (§7 of the design).
//!
//! `EndOfStream` is deliberately *not* part of this module: it is an
//! internal control signal raised by the token reader and the nodes
//! collector, never a user-visible error. It is modeled as an explicit
//! variant of [`crate::reader::ReadTokenError`] and
//! [`crate::collector::StopReason`] instead of a `panic!`/`Result::Err` that
//! could be confused with an actual parse failure.

use std::fmt;

use thiserror::Error;

use crate::nodes::NodeList;
use crate::state_delta::ParsingStateDelta;
use crate::token::Token;

/// A single frame of the "open contexts" diagnostic stack: a human
/// description of the construct being parsed, and the position at which it
/// started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenContextFrame {
    pub description: String,
    pub pos: usize,
    pub lineno: usize,
    pub colno: usize,
}

impl fmt::Display for OpenContextFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@ (line {}, col {})  {}",
            self.lineno, self.colno, self.description
        )
    }
}

/// The structured, closed-set `what` tag plus construct-specific fields
/// attached to every [`TokenParseError`] and [`NodesParseError`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MacroNameMissingAtEndOfInput,
    MalformedEnvironmentCall { escape_word: String },
    ForbiddenCharacter { found: char },
    UnexpectedClosingGroupDelimiter { delimiter: String },
    UnexpectedEndEnvironment { environment_name: String },
    UnexpectedClosingMathDelimiter { mathmode_type: &'static str, delimiter: String },
    UnknownMacro { name: String },
    UnknownEnvironment { name: String },
    UnknownSpecials { chars: String },
    OpeningDelimiterNotFound,
    ExpressionExpectedGotClosingBrace,
    ExpressionExpectedGotMathDelimiter,
    BeginEndNotAllowedInExpression,
    CallableWithMandatoryArgumentsInExpression { name: String },
    ContentIsNotPlainChars,
    ArgumentNotFound { key: String },
    VerbatimUnterminated,
}

/// The tokenizer could not form a token: a bare escape at end of input, a
/// malformed `\begin{...}`/`\end{...}` call, or a forbidden character.
///
/// Carries a placeholder token and a resume position so that tolerant
/// parsing can substitute the placeholder and continue without looping.
#[derive(Clone, Debug)]
pub struct TokenParseError {
    pub msg: String,
    pub pos: usize,
    pub lineno: usize,
    pub colno: usize,
    pub input_source: Option<String>,
    pub error_type_info: ErrorKind,
    pub recovery_token_placeholder: Token,
    pub recovery_token_at_pos: usize,
}

impl fmt::Display for TokenParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ (line {}, col {})", self.msg, self.lineno, self.colno)
    }
}

impl std::error::Error for TokenParseError {}

/// The parser encountered a structural problem above the tokenizer level:
/// an unexpected closing brace, an unknown macro, an expression expected but
/// something else found, and so on.
#[derive(Clone, Debug)]
pub struct NodesParseError {
    pub msg: String,
    pub pos: usize,
    pub lineno: usize,
    pub colno: usize,
    pub input_source: Option<String>,
    pub error_type_info: ErrorKind,
    pub recovery_nodes: Option<NodeList>,
    pub recovery_parsing_state_delta: Option<ParsingStateDelta>,
    pub recovery_at_token: Option<Token>,
    pub recovery_past_token: Option<Token>,
    pub open_contexts: Vec<OpenContextFrame>,
}

impl NodesParseError {
    pub fn new(msg: impl Into<String>, pos: usize, lineno: usize, colno: usize, kind: ErrorKind) -> Self {
        Self {
            msg: msg.into(),
            pos,
            lineno,
            colno,
            input_source: None,
            error_type_info: kind,
            recovery_nodes: None,
            recovery_parsing_state_delta: None,
            recovery_at_token: None,
            recovery_past_token: None,
            open_contexts: Vec::new(),
        }
    }

    pub fn with_recovery_nodes(mut self, nodes: NodeList) -> Self {
        self.recovery_nodes = Some(nodes);
        self
    }

    pub fn with_recovery_past_token(mut self, tok: Token) -> Self {
        self.recovery_past_token = Some(tok);
        self
    }

    pub fn with_recovery_at_token(mut self, tok: Token) -> Self {
        self.recovery_at_token = Some(tok);
        self
    }

    /// Wraps this error with an additional open-context frame, as done by
    /// `Walker::parse_content` for every construct it mediates.
    pub fn push_open_context(mut self, frame: OpenContextFrame) -> Self {
        self.open_contexts.push(frame);
        self
    }

    /// Converts this error from a raw tokenizer failure, folding in
    /// whatever recovery nodes the collector had already accumulated.
    pub fn from_token_error(err: TokenParseError, recovery_nodes: NodeList) -> Self {
        Self {
            msg: err.msg,
            pos: err.pos,
            lineno: err.lineno,
            colno: err.colno,
            input_source: err.input_source,
            error_type_info: err.error_type_info,
            recovery_nodes: Some(recovery_nodes),
            recovery_parsing_state_delta: None,
            recovery_at_token: None,
            recovery_past_token: Some(err.recovery_token_placeholder),
            open_contexts: Vec::new(),
        }
    }
}

impl fmt::Display for NodesParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ (line {}, col {})", self.msg, self.lineno, self.colno)?;
        for frame in &self.open_contexts {
            write!(f, "\n{}", frame)?;
        }
        Ok(())
    }
}

impl std::error::Error for NodesParseError {}

/// Programmer misuse of the API: calling a method out of order, or hitting
/// the recursion-depth guard described in the ambient-stack expansion.
#[derive(Clone, Debug, Error)]
pub enum WalkerError {
    #[error("recursion limit exceeded (max nesting depth {max_depth})")]
    RecursionLimitExceeded { max_depth: usize },
    #[error("get_final_nodelist() called before finalize()")]
    NotFinalized,
    #[error("finalize() may only run once per collector")]
    AlreadyFinalized,
    #[error("{0}")]
    Other(String),
}

/// Unifying error type for consumers who don't need to match on which
/// subsystem raised the error.
#[derive(Clone, Debug, Error)]
pub enum LatexSyntaxError {
    #[error(transparent)]
    Token(#[from] TokenParseError),
    #[error(transparent)]
    Nodes(#[from] NodesParseError),
    #[error(transparent)]
    Walker(#[from] WalkerError),
}
