//! The pull-based, context-sensitive tokenizer (§3.1 / §4.1).
//!
//! [`TokenReader`] never looks ahead further than one token, and every
//! lookup it performs (group delimiters, math delimiters, specials) goes
//! through the [`ParsingState`] handed to it at call time rather than
//! through any state of its own; only the cursor position and the
//! tolerant-parsing flag are mutable reader state. This is what lets the
//! same reader serve nested parses with different parsing states (e.g. one
//! sub-parse inside math mode) without any push/pop bookkeeping.

use std::rc::Rc;

use crate::error::{ErrorKind, TokenParseError};
use crate::state::{MathDelimKind, ParsingState};
use crate::token::{Token, TokenKind};

/// A reader-level control signal: either the tokenizer ran out of input, or
/// it hit a malformed construct it cannot tokenize at all (a bare escape
/// character at end of input, a malformed `\begin`/`\end`).
///
/// Neither variant is a generic `Error`: `EndOfStream` is the normal way a
/// parse finishes, and `Parse` is only surfaced to callers in non-tolerant
/// mode (in tolerant mode the reader swallows it and substitutes a
/// placeholder token itself, see [`TokenReader::peek_token`]).
#[derive(Clone, Debug)]
pub enum ReadTokenError {
    EndOfStream { final_space: String },
    Parse(TokenParseError),
}

impl From<TokenParseError> for ReadTokenError {
    fn from(err: TokenParseError) -> Self {
        ReadTokenError::Parse(err)
    }
}

pub struct TokenReader {
    source: Rc<str>,
    pos: usize,
    tolerant_parsing: bool,
}

impl TokenReader {
    pub fn new(source: Rc<str>, tolerant_parsing: bool) -> Self {
        Self { source, pos: 0, tolerant_parsing }
    }

    pub fn cur_pos(&self) -> usize {
        self.pos
    }

    pub fn final_pos(&self) -> usize {
        self.source.len()
    }

    pub fn is_tolerant(&self) -> bool {
        self.tolerant_parsing
    }

    pub fn move_to_pos_chars(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn rewind_to_pos(&mut self, pos: usize) {
        assert!(pos <= self.pos, "rewind_to_pos requires pos <= current position");
        self.pos = pos;
    }

    pub fn move_to_token(&mut self, tok: &Token, rewind_pre_space: bool) {
        self.pos = if rewind_pre_space { tok.pos_before_pre_space() } else { tok.pos() };
    }

    pub fn move_past_token(&mut self, tok: &Token, fastforward_post_space: bool) {
        let mut new_pos = tok.pos_end();
        if !fastforward_post_space && !tok.post_space().is_empty() {
            new_pos -= tok.post_space().len();
        }
        self.pos = new_pos;
    }

    pub fn peek_chars(&self, num_chars: usize) -> Result<&str, ReadTokenError> {
        if self.pos >= self.source.len() {
            return Err(ReadTokenError::EndOfStream { final_space: String::new() });
        }
        let end = byte_offset_after_chars(&self.source, self.pos, num_chars);
        Ok(&self.source[self.pos..end])
    }

    pub fn next_chars(&mut self, num_chars: usize) -> Result<String, ReadTokenError> {
        let text = self.peek_chars(num_chars)?.to_string();
        self.pos += text.len();
        Ok(text)
    }

    /// Advances past any whitespace at the current position, honoring
    /// `enable_double_newline_paragraphs` (two consecutive newlines are
    /// never consumed as plain whitespace; they signal a paragraph break).
    /// Returns the whitespace skipped.
    pub fn skip_space_chars(&mut self, state: &ParsingState) -> String {
        let (space, _pos, pos_end) = peek_space_chars(&self.source, self.pos, state);
        self.pos = pos_end;
        space
    }

    pub fn peek_space_chars(&self, state: &ParsingState) -> (String, usize, usize) {
        peek_space_chars(&self.source, self.pos, state)
    }

    /// Returns the next token without consuming it, except in tolerant mode
    /// where a malformed construct advances the cursor to the recovery
    /// position and a placeholder token is returned in place of the error.
    pub fn peek_token(&mut self, state: &ParsingState) -> Result<Token, ReadTokenError> {
        match self.impl_peek_token(state) {
            Ok(tok) => Ok(tok),
            Err(ReadTokenError::Parse(err)) if self.tolerant_parsing => {
                self.pos = err.recovery_token_at_pos;
                Ok(err.recovery_token_placeholder.clone())
            }
            Err(other) => Err(other),
        }
    }

    fn impl_peek_token(&self, state: &ParsingState) -> Result<Token, ReadTokenError> {
        let s = &self.source;
        let len_s = s.len();

        let (pre_space, _space_pos, space_pos_end) = peek_space_chars(s, self.pos, state);
        let pos = space_pos_end;
        if pos >= len_s {
            return Err(ReadTokenError::EndOfStream { final_space: pre_space });
        }

        if pos + 2 <= len_s && &s[pos..pos + 1] == "\n" && s[pos + 1..].starts_with('\n')
            && state.enable_double_newline_paragraphs()
        {
            if let Some(ctx) = state.latex_context() {
                if let Some(spec) = ctx.get_specials_spec("\n\n") {
                    return Ok(Token::specials(spec, pos, pos + 2, pre_space));
                }
            }
            return Ok(Token::text(TokenKind::Char, "\n\n", pos, pos + 2, pre_space));
        }

        let c = s[pos..].chars().next().expect("pos < len_s");
        let c_len = c.len_utf8();

        if state.enable_math() && is_math_delim_start_char(state, c) {
            if let Some(tok) = self.maybe_read_math_mode_delimiter(s, pos, state, &pre_space) {
                return Ok(tok);
            }
        }

        if c == state.macro_escape_char() {
            if state.enable_environments() {
                let rest = &s[pos + c_len..];
                let beginend = if rest.starts_with("begin") {
                    Some("begin")
                } else if rest.starts_with("end") {
                    Some("end")
                } else {
                    None
                };
                if let Some(beginend) = beginend {
                    let past = pos + c_len + beginend.len();
                    let next_is_alpha = s[past..].chars().next().map(|c| state.macro_alpha_chars().contains(c)).unwrap_or(false);
                    if !next_is_alpha {
                        return self.read_environment(s, pos, state, beginend, pre_space);
                    }
                }
            }
            if state.enable_macros() {
                return self.read_macro(s, pos, state, pre_space);
            }
        }

        if c == state.comment_start() && state.enable_comments() {
            return Ok(self.read_comment(s, pos, state, pre_space));
        }

        if state.enable_groups() {
            let c_str = c.to_string();
            if state.expected_group_close_delimiter(&c_str).is_some() {
                return Ok(Token::text(TokenKind::BraceOpen, c_str, pos, pos + c_len, pre_space));
            }
            if state.is_group_close_delimiter(&c_str) {
                return Ok(Token::text(TokenKind::BraceClose, c_str, pos, pos + c_len, pre_space));
            }
        }

        if state.enable_specials() {
            if let Some(ctx) = state.latex_context() {
                if let Some((spec, matched_len)) = ctx.test_for_specials(s, pos, state) {
                    return Ok(Token::specials(spec, pos, pos + matched_len, pre_space));
                }
            }
        }

        if state.is_forbidden_character(c) {
            let placeholder = Token::text(TokenKind::Char, c.to_string(), pos, pos + c_len, pre_space.clone());
            return Err(ReadTokenError::Parse(TokenParseError {
                msg: format!("Forbidden character {:?} encountered", c),
                pos,
                lineno: 0,
                colno: 0,
                input_source: None,
                error_type_info: ErrorKind::ForbiddenCharacter { found: c },
                recovery_token_placeholder: placeholder,
                recovery_token_at_pos: pos + c_len,
            }));
        }

        Ok(Token::text(TokenKind::Char, c.to_string(), pos, pos + c_len, pre_space))
    }

    fn maybe_read_math_mode_delimiter(
        &self,
        s: &str,
        pos: usize,
        state: &ParsingState,
        pre_space: &str,
    ) -> Option<Token> {
        if state.in_math_mode() {
            if let Some(info) = state.expecting_math_close_delim() {
                if s[pos..].starts_with(info.close_delim.as_str()) {
                    let kind = match info.kind {
                        MathDelimKind::Inline => TokenKind::MathmodeInline,
                        MathDelimKind::Display => TokenKind::MathmodeDisplay,
                    };
                    return Some(Token::text(
                        kind,
                        info.close_delim.clone(),
                        pos,
                        pos + info.close_delim.len(),
                        pre_space.to_string(),
                    ));
                }
            }
        }

        for (delim, kind) in state.math_delims_by_len() {
            if s[pos..].starts_with(delim.as_str()) {
                let tok_kind = match kind {
                    MathDelimKind::Inline => TokenKind::MathmodeInline,
                    MathDelimKind::Display => TokenKind::MathmodeDisplay,
                };
                return Some(Token::text(tok_kind, delim.clone(), pos, pos + delim.len(), pre_space.to_string()));
            }
        }
        None
    }

    fn read_macro(&self, s: &str, pos: usize, state: &ParsingState, pre_space: String) -> Result<Token, ReadTokenError> {
        let escape_len = state.macro_escape_char().len_utf8();
        if pos + escape_len >= s.len() {
            let placeholder = Token::text(TokenKind::Char, "", pos, pos, pre_space);
            return Err(ReadTokenError::Parse(TokenParseError {
                msg: "Expected macro name after escape character".to_string(),
                pos: pos + escape_len,
                lineno: 0,
                colno: 0,
                input_source: None,
                error_type_info: ErrorKind::MacroNameMissingAtEndOfInput,
                recovery_token_placeholder: placeholder,
                recovery_token_at_pos: s.len(),
            }));
        }

        let mut chars = s[pos + escape_len..].chars();
        let first = chars.next().unwrap();
        let mut macro_name = String::new();
        macro_name.push(first);

        let mut posi = pos + escape_len + first.len_utf8();
        let is_alpha_macro = state.macro_alpha_chars().contains(first);
        if is_alpha_macro {
            for c in s[posi..].chars() {
                if state.macro_alpha_chars().contains(c) {
                    macro_name.push(c);
                    posi += c.len_utf8();
                } else {
                    break;
                }
            }
        }

        let mut post_space = String::new();
        if is_alpha_macro {
            let (space, _p, pos_end) = peek_space_chars(s, posi, state);
            post_space = space;
            posi = pos_end;
        }

        Ok(Token::text(TokenKind::Macro, macro_name, pos, posi, pre_space).with_post_space(post_space))
    }

    fn read_environment(
        &self,
        s: &str,
        pos: usize,
        state: &ParsingState,
        beginend: &str,
        pre_space: String,
    ) -> Result<Token, ReadTokenError> {
        let escape_len = state.macro_escape_char().len_utf8();
        let pos_envname_start = pos + escape_len + beginend.len();

        match match_environment_name(s, pos_envname_start) {
            Some((name, end)) => {
                let kind = if beginend == "begin" { TokenKind::BeginEnvironment } else { TokenKind::EndEnvironment };
                Ok(Token::text(kind, name, pos, end, pre_space))
            }
            None => {
                let tok_arg = format!("{}{}", state.macro_escape_char(), beginend);
                let placeholder = Token::text(TokenKind::Char, tok_arg.clone(), pos, pos + tok_arg.len(), pre_space);
                Err(ReadTokenError::Parse(TokenParseError {
                    msg: format!("Bad '\\{}' call: expected {{environmentname}}", beginend),
                    pos,
                    lineno: 0,
                    colno: 0,
                    input_source: None,
                    error_type_info: ErrorKind::MalformedEnvironmentCall { escape_word: beginend.to_string() },
                    recovery_token_at_pos: pos + tok_arg.len(),
                    recovery_token_placeholder: placeholder,
                }))
            }
        }
    }

    fn read_comment(&self, s: &str, pos: usize, state: &ParsingState, pre_space: String) -> Token {
        let comment_len = state.comment_start().len_utf8();
        let after_percent = pos + comment_len;
        match s[after_percent..].find('\n') {
            None => Token::text(TokenKind::Comment, &s[after_percent..], pos, s.len(), pre_space),
            Some(rel_newline) => {
                let newline_pos = after_percent + rel_newline;
                let (post_space, _p, pos_end) = peek_space_chars(s, newline_pos, state);
                Token::text(TokenKind::Comment, &s[after_percent..newline_pos], pos, pos_end, pre_space)
                    .with_post_space(post_space)
            }
        }
    }
}

fn is_math_delim_start_char(state: &ParsingState, c: char) -> bool {
    state.math_delims_by_len().iter().any(|(d, _)| d.starts_with(c))
}

fn peek_space_chars(s: &str, pos: usize, state: &ParsingState) -> (String, usize, usize) {
    let mut space = String::new();
    let mut p2 = pos;
    let enable_double_newline_paragraphs = state.enable_double_newline_paragraphs();

    loop {
        let Some(c) = s[p2..].chars().next() else { break };
        if !c.is_whitespace() {
            break;
        }
        space.push(c);
        p2 += c.len_utf8();

        if enable_double_newline_paragraphs && space.ends_with("\n\n") {
            space.truncate(space.len() - 2);
            p2 -= 2;
            break;
        }
    }

    (space, pos, p2)
}

fn byte_offset_after_chars(s: &str, pos: usize, num_chars: usize) -> usize {
    let mut end = pos;
    let mut remaining = num_chars;
    for c in s[pos..].chars() {
        if remaining == 0 {
            break;
        }
        end += c.len_utf8();
        remaining -= 1;
    }
    end
}

/// `\s*\{([A-Za-z0-9* ._-]+)\}`, anchored at `pos`: the grammar
/// `\begin`/`\end` use for their environment-name argument.
fn match_environment_name(s: &str, pos: usize) -> Option<(String, usize)> {
    let mut p = pos;
    for c in s[p..].chars() {
        if c.is_whitespace() {
            p += c.len_utf8();
        } else {
            break;
        }
    }
    if s[p..].chars().next() != Some('{') {
        return None;
    }
    p += 1;
    let name_start = p;
    for c in s[p..].chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '*' | ' ' | '.' | '_' | '-') {
            p += c.len_utf8();
        } else {
            break;
        }
    }
    if p == name_start {
        return None;
    }
    let name = &s[name_start..p];
    if s[p..].chars().next() != Some('}') {
        return None;
    }
    p += 1;
    Some((name.to_string(), p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ParsingState;

    fn reader(s: &str) -> TokenReader {
        TokenReader::new(Rc::from(s), false)
    }

    #[test]
    fn reads_plain_char() {
        let mut r = reader("a");
        let state = ParsingState::default();
        let tok = r.peek_token(&state).unwrap();
        assert_eq!(tok.kind(), TokenKind::Char);
        assert_eq!(tok.arg_text(), Some("a"));
    }

    #[test]
    fn reads_macro_with_trailing_space() {
        let mut r = reader(r"\alpha  x");
        let state = ParsingState::default();
        let tok = r.peek_token(&state).unwrap();
        assert_eq!(tok.kind(), TokenKind::Macro);
        assert_eq!(tok.arg_text(), Some("alpha"));
        assert_eq!(tok.post_space(), "  ");
    }

    #[test]
    fn reads_single_nonalpha_macro_without_post_space() {
        let mut r = reader(r"\%  x");
        let state = ParsingState::default();
        let tok = r.peek_token(&state).unwrap();
        assert_eq!(tok.arg_text(), Some("%"));
        assert_eq!(tok.post_space(), "");
    }

    #[test]
    fn reads_begin_environment() {
        let mut r = reader(r"\begin{align}");
        let state = ParsingState::default();
        let tok = r.peek_token(&state).unwrap();
        assert_eq!(tok.kind(), TokenKind::BeginEnvironment);
        assert_eq!(tok.arg_text(), Some("align"));
    }

    #[test]
    fn malformed_begin_is_parse_error() {
        let mut r = reader(r"\begin align}");
        let state = ParsingState::default();
        match r.peek_token(&state) {
            Err(ReadTokenError::Parse(_)) => {}
            other => panic!("expected parse error, got {:?}", other.map(|t| t.to_string())),
        }
    }

    #[test]
    fn tolerant_mode_recovers_from_malformed_begin() {
        let mut r = TokenReader::new(Rc::from(r"\begin align}"), true);
        let state = ParsingState::default();
        let tok = r.peek_token(&state).unwrap();
        assert_eq!(tok.kind(), TokenKind::Char);
    }

    #[test]
    fn double_newline_is_its_own_char_token() {
        let mut r = reader("a\n\nb");
        let state = ParsingState::default();
        r.next_chars(1).unwrap();
        let tok = r.peek_token(&state).unwrap();
        assert_eq!(tok.arg_text(), Some("\n\n"));
    }

    #[test]
    fn comment_reads_to_newline_and_collects_post_space() {
        let mut r = reader("% hello\n   next");
        let state = ParsingState::default();
        let tok = r.peek_token(&state).unwrap();
        assert_eq!(tok.kind(), TokenKind::Comment);
        assert_eq!(tok.arg_text(), Some(" hello"));
        assert_eq!(tok.post_space(), "\n   ");
    }

    #[test]
    fn end_of_stream_reports_trailing_space() {
        let mut r = reader("   ");
        let state = ParsingState::default();
        match r.peek_token(&state) {
            Err(ReadTokenError::EndOfStream { final_space }) => assert_eq!(final_space, "   "),
            other => panic!("expected end of stream, got {:?}", other.map(|t| t.to_string())),
        }
    }

    #[test]
    fn forbidden_character_is_parse_error() {
        let mut r = reader("a~b");
        let state = ParsingState::default()
            .sub_context(crate::state::ParsingStateOverride::default().forbidden_characters("~"));
        r.next_chars(1).unwrap();
        match r.peek_token(&state) {
            Err(ReadTokenError::Parse(e)) => assert!(matches!(e.error_type_info, ErrorKind::ForbiddenCharacter { found: '~' })),
            other => panic!("expected forbidden-character error, got {:?}", other.map(|t| t.to_string())),
        }
    }

    #[test]
    fn math_delimiter_dollar_is_inline() {
        let mut r = reader("$x$");
        let state = ParsingState::default();
        let tok = r.peek_token(&state).unwrap();
        assert_eq!(tok.kind(), TokenKind::MathmodeInline);
        assert_eq!(tok.arg_text(), Some("$"));
    }
}
