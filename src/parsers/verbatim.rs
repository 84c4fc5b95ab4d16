//! Verbatim content parsers (§4.8): read raw characters with no tokenization
//! at all, for constructs like `\verb|...|` whose body must not be
//! interpreted as LaTeX. Three shapes, matching the original's:
//!
//! - [`read_delimited_verbatim`]: content between a pair of single
//!   characters, auto-detected from the first character read (`{}`, `[]`,
//!   `<>`, `()`, or a repeated arbitrary character as with `\verb|...|`) or
//!   given explicitly.
//! - [`read_environment_verbatim`]: content up to (not including) a literal
//!   `\end{name}`, for verbatim-bodied environments (e.g. `verbatim`
//!   itself).

use crate::error::{ErrorKind, LatexSyntaxError, NodesParseError};
use crate::nodes::{CharsNode, GroupNode, Node, NodeList};
use crate::reader::TokenReader;
use crate::state::ParsingState;

fn matching_close(open: char) -> char {
    match open {
        '{' => '}',
        '[' => ']',
        '<' => '>',
        '(' => ')',
        c => c,
    }
}

/// Reads a delimited verbatim span starting at the reader's current
/// position. `delimiters`, if given, fixes the open/close character pair;
/// otherwise the opening character is read and its close auto-detected.
/// Returns the inner text plus the open/close characters and the overall
/// span (including delimiters).
pub fn read_delimited_verbatim(
    reader: &mut TokenReader,
    delimiters: Option<(char, char)>,
    state: &ParsingState,
) -> Result<(String, char, char, usize, usize), LatexSyntaxError> {
    let start = reader.cur_pos();
    let first = reader
        .peek_chars(1)
        .map_err(|_| {
            NodesParseError::new("Expected a verbatim delimiter, got end of input", start, 0, 0, ErrorKind::VerbatimUnterminated)
        })?
        .chars()
        .next()
        .unwrap();

    let (open, close) = delimiters.unwrap_or_else(|| (first, matching_close(first)));
    if first != open {
        return Err(NodesParseError::new(
            format!("Expected verbatim delimiter '{}'", open),
            start,
            0,
            0,
            ErrorKind::VerbatimUnterminated,
        )
        .into());
    }
    reader.next_chars(1).expect("just peeked");

    let mut depth = 1usize;
    let mut buf = String::new();
    loop {
        let c = match reader.next_chars(1) {
            Ok(s) if !s.is_empty() => s.chars().next().unwrap(),
            _ => {
                let recovery = Node::Chars(CharsNode { chars: buf.clone(), parsing_state: state.clone(), pos: start, pos_end: reader.cur_pos() });
                return Err(NodesParseError::new(
                    format!("Unterminated verbatim content, expected '{}'", close),
                    start,
                    0,
                    0,
                    ErrorKind::VerbatimUnterminated,
                )
                .with_recovery_nodes(NodeList::single(recovery))
                .into());
            }
        };
        if open != close && c == open {
            depth += 1;
            buf.push(c);
            continue;
        }
        if c == close {
            depth -= 1;
            if depth == 0 {
                break;
            }
            buf.push(c);
            continue;
        }
        buf.push(c);
    }
    let end = reader.cur_pos();
    Ok((buf, open, close, start, end))
}

/// Reads verbatim content up to (not including) a literal `\end{env_name}`,
/// for an environment whose entire body is opaque to the tokenizer.
pub fn read_environment_verbatim(
    reader: &mut TokenReader,
    escape_char: char,
    env_name: &str,
    state: &ParsingState,
) -> Result<Node, LatexSyntaxError> {
    let start = reader.cur_pos();
    let needle: String = std::iter::once(escape_char).chain(format!("end{{{}}}", env_name).chars()).collect();
    let needle_len = needle.chars().count();
    let mut buf = String::new();

    loop {
        if let Ok(peek) = reader.peek_chars(needle_len) {
            if peek == needle {
                break;
            }
        }
        match reader.next_chars(1) {
            Ok(s) if !s.is_empty() => buf.push_str(&s),
            _ => {
                return Err(NodesParseError::new(
                    format!("Unterminated environment body, expected '{}'", needle),
                    start,
                    0,
                    0,
                    ErrorKind::VerbatimUnterminated,
                )
                .with_recovery_nodes(NodeList::single(Node::Chars(CharsNode {
                    chars: buf.clone(),
                    parsing_state: state.clone(),
                    pos: start,
                    pos_end: reader.cur_pos(),
                })))
                .into());
            }
        }
    }

    if let Some(rest) = buf.strip_prefix('\n') {
        buf = rest.to_string();
    }
    let end = reader.cur_pos();
    Ok(Node::Chars(CharsNode { chars: buf, parsing_state: state.clone(), pos: start, pos_end: end }))
}

/// Wraps a delimited verbatim read in a `Group` node (inner `Chars` node,
/// spanning only the content, plus the delimiter pair), as used by the `v`
/// standard-argument type.
pub fn read_delimited_verbatim_group(
    reader: &mut TokenReader,
    delimiters: Option<(char, char)>,
    state: &ParsingState,
) -> Result<Node, LatexSyntaxError> {
    let (text, open, close, pos, pos_end) = read_delimited_verbatim(reader, delimiters, state)?;
    let inner_pos = pos + open.len_utf8();
    let inner = Node::Chars(CharsNode { chars: text, parsing_state: state.clone(), pos: inner_pos, pos_end: pos_end - close.len_utf8() });
    Ok(Node::Group(GroupNode {
        nodelist: NodeList::single(inner),
        delimiters: (open.to_string(), close.to_string()),
        parsing_state: state.clone(),
        pos,
        pos_end,
    }))
}
