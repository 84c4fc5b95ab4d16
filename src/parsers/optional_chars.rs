//! The optional chars-marker parser (§4.7): scans plain-character (and
//! specials) tokens at the current position, greedily matching against a
//! set of candidate literal strings (e.g. `"*"` for a starred-form marker).
//! If the accumulated text never becomes one of the candidates, the reader
//! is rewound and nothing is consumed.

use crate::nodes::CharsNode;
use crate::state::ParsingState;
use crate::token::TokenKind;

/// Scans forward from the reader's current position for the longest prefix
/// of consecutive char/specials tokens that exactly equals one of
/// `candidates`. Returns the matched text and the position just past it, or
/// `None` (leaving the reader untouched) if no candidate matched.
pub fn scan_chars_marker(
    reader: &mut crate::reader::TokenReader,
    state: &ParsingState,
    candidates: &[String],
) -> Option<(String, usize, usize)> {
    let start = reader.cur_pos();
    let mut acc = String::new();
    let mut committed_len = None;
    let mut committed_end = start;

    loop {
        let before = reader.cur_pos();
        let tok = match reader.peek_token(state) {
            Ok(t) => t,
            Err(_) => break,
        };
        if !matches!(tok.kind(), TokenKind::Char | TokenKind::Specials) {
            break;
        }

        let mut candidate = acc.clone();
        if !candidate.is_empty() && !tok.pre_space().is_empty() {
            candidate.push(' ');
        }
        candidate.push_str(tok.arg_text().unwrap_or(""));

        if !candidates.iter().any(|c| c.starts_with(candidate.as_str())) {
            reader.move_to_pos_chars(before);
            break;
        }
        acc = candidate;
        reader.move_past_token(&tok, true);

        if candidates.iter().any(|c| c == &acc) {
            committed_len = Some(acc.len());
            committed_end = reader.cur_pos();
        }
    }

    match committed_len {
        Some(_) => Some((acc, start, committed_end)),
        None => {
            reader.move_to_pos_chars(start);
            None
        }
    }
}

/// Builds the `Chars` node for a successful marker match.
pub fn marker_node(text: String, parsing_state: ParsingState, pos: usize, pos_end: usize) -> CharsNode {
    CharsNode { chars: text, parsing_state, pos, pos_end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::TokenReader;
    use std::rc::Rc;

    #[test]
    fn matches_star_marker() {
        let mut reader = TokenReader::new(Rc::from("*abc"), false);
        let state = ParsingState::default();
        let (text, pos, pos_end) = scan_chars_marker(&mut reader, &state, &["*".to_string()]).unwrap();
        assert_eq!(text, "*");
        assert_eq!((pos, pos_end), (0, 1));
        assert_eq!(reader.cur_pos(), 1);
    }

    #[test]
    fn no_match_leaves_reader_untouched() {
        let mut reader = TokenReader::new(Rc::from("abc"), false);
        let state = ParsingState::default();
        assert!(scan_chars_marker(&mut reader, &state, &["*".to_string()]).is_none());
        assert_eq!(reader.cur_pos(), 0);
    }
}
