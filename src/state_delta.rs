//! Parsing state deltas (§3.3 / §4.2): the description of how a just-parsed
//! construct changes the state for whatever comes after it.
//!
//! A delta is data, not a closure: [`Walker::parsing_state_event_handler`]
//! is what actually decides what entering or leaving math mode means, so
//! that a walker can customize the default behavior (e.g. a custom math
//! environment that also wants to flip `enable_double_newline_paragraphs`)
//! without the parsers that raise [`ParsingStateDelta::WalkerEvent`] needing
//! to know about it.

use crate::state::{ParsingState, ParsingStateOverride};
use crate::token::Token;
use crate::walker::Walker;

#[derive(Clone, Debug)]
pub enum WalkerEventKind {
    EnterMathMode { math_mode_delimiter: Option<String>, trigger_token: Option<Token> },
    LeaveMathMode { trigger_token: Option<Token> },
}

/// Describes a single change to apply to a [`ParsingState`], or a directive
/// to ask the walker to decide one (for math-mode transitions, which may
/// carry walker-specific side effects beyond the state itself).
#[derive(Clone, Debug)]
pub enum ParsingStateDelta {
    /// Apply a sparse set of field overrides via [`ParsingState::sub_context`].
    SetAttributes(ParsingStateOverride),
    /// Replace the parsing state outright.
    ReplaceParsingState(ParsingState),
    /// Defer to [`Walker::parsing_state_event_handler`] for a walker-level
    /// event (entering/leaving math mode).
    WalkerEvent(WalkerEventKind),
    /// Apply a sequence of deltas in order, threading the resulting state
    /// through each. Used when a single construct needs to combine, e.g.,
    /// an attribute change with a math-mode transition.
    Chained(Vec<ParsingStateDelta>),
}

impl ParsingStateDelta {
    pub fn enter_math_mode(math_mode_delimiter: impl Into<String>, trigger_token: Option<Token>) -> Self {
        ParsingStateDelta::WalkerEvent(WalkerEventKind::EnterMathMode {
            math_mode_delimiter: Some(math_mode_delimiter.into()),
            trigger_token,
        })
    }

    pub fn leave_math_mode(trigger_token: Option<Token>) -> Self {
        ParsingStateDelta::WalkerEvent(WalkerEventKind::LeaveMathMode { trigger_token })
    }

    pub fn get_updated_parsing_state(&self, state: &ParsingState, walker: &mut Walker) -> ParsingState {
        match self {
            ParsingStateDelta::SetAttributes(overrides) => state.sub_context(overrides.clone()),
            ParsingStateDelta::ReplaceParsingState(replacement) => replacement.clone(),
            ParsingStateDelta::WalkerEvent(event) => {
                let delta = match event {
                    WalkerEventKind::EnterMathMode { math_mode_delimiter, trigger_token } => walker
                        .parsing_state_event_handler()
                        .enter_math_mode(math_mode_delimiter.as_deref(), trigger_token.as_ref()),
                    WalkerEventKind::LeaveMathMode { trigger_token } => {
                        walker.parsing_state_event_handler().leave_math_mode(trigger_token.as_ref())
                    }
                };
                apply_optional_delta(state, delta, walker)
            }
            ParsingStateDelta::Chained(deltas) => {
                let mut current = state.clone();
                for delta in deltas {
                    current = delta.get_updated_parsing_state(&current, walker);
                }
                current
            }
        }
    }
}

pub fn apply_optional_delta(
    state: &ParsingState,
    delta: Option<ParsingStateDelta>,
    walker: &mut Walker,
) -> ParsingState {
    match delta {
        Some(delta) => delta.get_updated_parsing_state(state, walker),
        None => state.clone(),
    }
}

/// Decides what entering/leaving math mode actually means for a given
/// walker. The default implementation (on [`Walker`] itself) just flips
/// `in_math_mode`/`math_mode_delimiter`; a caller with a custom context
/// database could swap in a handler that also reacts to the transition.
pub trait ParsingStateEventHandler {
    fn enter_math_mode(&self, math_mode_delimiter: Option<&str>, trigger_token: Option<&Token>) -> Option<ParsingStateDelta>;
    fn leave_math_mode(&self, trigger_token: Option<&Token>) -> Option<ParsingStateDelta>;
}
