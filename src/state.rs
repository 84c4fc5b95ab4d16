//! The immutable parsing state (§3.2 / §4.2).
//!
//! A [`ParsingState`] is a plain value: constructing one derives and caches a
//! few lookup tables (open/close delimiter maps, a longest-match-first math
//! delimiter table) from its public fields. [`ParsingState::sub_context`] is
//! the only way to get a new state from an old one; it never mutates `self`,
//! and it reuses the parent's cached tables whenever the overridden fields
//! don't touch them, so descending into a group that doesn't change
//! delimiters is a cheap `Rc` clone rather than a rebuild.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::context::ContextDbHandle;

const DEFAULT_MACRO_ALPHA_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathDelimKind {
    Inline,
    Display,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MathDelimInfo {
    pub close_delim: String,
    pub kind: MathDelimKind,
}

/// A sparse set of field overrides for [`ParsingState::sub_context`]. Only
/// the fields actually set differ from the parent; everything else is
/// inherited, including cached lookup tables where possible.
#[derive(Clone, Debug, Default)]
pub struct ParsingStateOverride {
    pub latex_context: Option<Option<ContextDbHandle>>,
    pub in_math_mode: Option<bool>,
    pub math_mode_delimiter: Option<Option<String>>,
    pub latex_group_delimiters: Option<Vec<(String, String)>>,
    pub latex_inline_math_delimiters: Option<Vec<(String, String)>>,
    pub latex_display_math_delimiters: Option<Vec<(String, String)>>,
    pub enable_double_newline_paragraphs: Option<bool>,
    pub enable_macros: Option<bool>,
    pub enable_environments: Option<bool>,
    pub enable_comments: Option<bool>,
    pub enable_groups: Option<bool>,
    pub enable_specials: Option<bool>,
    pub enable_math: Option<bool>,
    pub macro_alpha_chars: Option<String>,
    pub macro_escape_char: Option<char>,
    pub comment_start: Option<char>,
    pub forbidden_characters: Option<String>,
}

impl ParsingStateOverride {
    pub fn in_math_mode(mut self, v: bool) -> Self {
        self.in_math_mode = Some(v);
        self
    }
    pub fn math_mode_delimiter(mut self, v: impl Into<String>) -> Self {
        self.math_mode_delimiter = Some(Some(v.into()));
        self
    }
    pub fn leave_math_mode(mut self) -> Self {
        self.in_math_mode = Some(false);
        self.math_mode_delimiter = Some(None);
        self
    }
    pub fn enable_environments(mut self, v: bool) -> Self {
        self.enable_environments = Some(v);
        self
    }
    pub fn enable_macros(mut self, v: bool) -> Self {
        self.enable_macros = Some(v);
        self
    }
    pub fn enable_comments(mut self, v: bool) -> Self {
        self.enable_comments = Some(v);
        self
    }
    pub fn enable_groups(mut self, v: bool) -> Self {
        self.enable_groups = Some(v);
        self
    }
    pub fn enable_specials(mut self, v: bool) -> Self {
        self.enable_specials = Some(v);
        self
    }
    pub fn enable_math(mut self, v: bool) -> Self {
        self.enable_math = Some(v);
        self
    }
    pub fn latex_context(mut self, v: Option<ContextDbHandle>) -> Self {
        self.latex_context = Some(v);
        self
    }
    pub fn latex_group_delimiters(mut self, v: Vec<(String, String)>) -> Self {
        self.latex_group_delimiters = Some(v);
        self
    }
    pub fn forbidden_characters(mut self, v: impl Into<String>) -> Self {
        self.forbidden_characters = Some(v.into());
        self
    }
}

#[derive(Clone, Debug)]
pub struct ParsingState {
    latex_context: Option<ContextDbHandle>,
    in_math_mode: bool,
    math_mode_delimiter: Option<String>,
    latex_group_delimiters: Vec<(String, String)>,
    latex_inline_math_delimiters: Vec<(String, String)>,
    latex_display_math_delimiters: Vec<(String, String)>,
    enable_double_newline_paragraphs: bool,
    enable_macros: bool,
    enable_environments: bool,
    enable_comments: bool,
    enable_groups: bool,
    enable_specials: bool,
    enable_math: bool,
    macro_alpha_chars: String,
    macro_escape_char: char,
    comment_start: char,
    forbidden_characters: String,

    group_delim_by_open: Rc<HashMap<String, String>>,
    group_delim_close: Rc<HashSet<String>>,
    math_delims_by_len: Rc<Vec<(String, MathDelimKind)>>,
    math_delims_by_open: Rc<HashMap<String, MathDelimInfo>>,
    math_delims_close: Rc<HashSet<String>>,
    math_expecting_close_delim: Option<Rc<MathDelimInfo>>,
}

impl Default for ParsingState {
    fn default() -> Self {
        let latex_group_delimiters = vec![("{".to_string(), "}".to_string())];
        let latex_inline_math_delimiters =
            vec![("$".to_string(), "$".to_string()), ("\\(".to_string(), "\\)".to_string())];
        let latex_display_math_delimiters =
            vec![("$$".to_string(), "$$".to_string()), ("\\[".to_string(), "\\]".to_string())];

        let (group_delim_by_open, group_delim_close) = compute_group_delim_info(&latex_group_delimiters);
        let (math_delims_by_len, math_delims_by_open, math_delims_close) =
            compute_math_delim_info(&latex_inline_math_delimiters, &latex_display_math_delimiters);

        Self {
            latex_context: None,
            in_math_mode: false,
            math_mode_delimiter: None,
            latex_group_delimiters,
            latex_inline_math_delimiters,
            latex_display_math_delimiters,
            enable_double_newline_paragraphs: true,
            enable_macros: true,
            enable_environments: true,
            enable_comments: true,
            enable_groups: true,
            enable_specials: true,
            enable_math: true,
            macro_alpha_chars: DEFAULT_MACRO_ALPHA_CHARS.to_string(),
            macro_escape_char: '\\',
            comment_start: '%',
            forbidden_characters: String::new(),
            group_delim_by_open: Rc::new(group_delim_by_open),
            group_delim_close: Rc::new(group_delim_close),
            math_delims_by_len: Rc::new(math_delims_by_len),
            math_delims_by_open: Rc::new(math_delims_by_open),
            math_delims_close: Rc::new(math_delims_close),
            math_expecting_close_delim: None,
        }
    }
}

fn compute_group_delim_info(
    delimiters: &[(String, String)],
) -> (HashMap<String, String>, HashSet<String>) {
    let by_open = delimiters.iter().cloned().collect();
    let close = delimiters.iter().map(|(_, c)| c.clone()).collect();
    (by_open, close)
}

fn compute_math_delim_info(
    inline: &[(String, String)],
    display: &[(String, String)],
) -> (Vec<(String, MathDelimKind)>, HashMap<String, MathDelimInfo>, HashSet<String>) {
    let mut by_open = HashMap::new();
    for (open, close) in inline {
        by_open.insert(
            open.clone(),
            MathDelimInfo { close_delim: close.clone(), kind: MathDelimKind::Inline },
        );
    }
    for (open, close) in display {
        by_open.insert(
            open.clone(),
            MathDelimInfo { close_delim: close.clone(), kind: MathDelimKind::Display },
        );
    }

    let mut seen = HashSet::new();
    let mut by_len: Vec<(String, MathDelimKind)> = Vec::new();
    for (delims, kind) in [(inline, MathDelimKind::Inline), (display, MathDelimKind::Display)] {
        for (open, close) in delims {
            for delim in [open, close] {
                if seen.insert(delim.clone()) {
                    by_len.push((delim.clone(), kind));
                }
            }
        }
    }
    // Longest first, so the tokenizer's linear scan finds `$$` before `$`.
    by_len.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let close = by_open.values().map(|info| info.close_delim.clone()).collect();
    (by_len, by_open, close)
}

fn compute_expecting_close_delim(
    in_math_mode: bool,
    math_mode_delimiter: &Option<String>,
    by_open: &HashMap<String, MathDelimInfo>,
) -> Option<Rc<MathDelimInfo>> {
    if !in_math_mode {
        return None;
    }
    math_mode_delimiter.as_deref().and_then(|d| by_open.get(d)).map(|info| Rc::new(info.clone()))
}

impl ParsingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a new state from this one, applying `overrides`. Cached
    /// lookup tables are rebuilt only for the tables whose source fields are
    /// actually present in `overrides`; everything else is an `Rc` clone.
    pub fn sub_context(&self, overrides: ParsingStateOverride) -> ParsingState {
        let mut next = self.clone();

        if let Some(ctx) = overrides.latex_context {
            next.latex_context = ctx;
        }
        if let Some(v) = overrides.enable_double_newline_paragraphs {
            next.enable_double_newline_paragraphs = v;
        }
        if let Some(v) = overrides.enable_macros {
            next.enable_macros = v;
        }
        if let Some(v) = overrides.enable_environments {
            next.enable_environments = v;
        }
        if let Some(v) = overrides.enable_comments {
            next.enable_comments = v;
        }
        if let Some(v) = overrides.enable_groups {
            next.enable_groups = v;
        }
        if let Some(v) = overrides.enable_specials {
            next.enable_specials = v;
        }
        if let Some(v) = overrides.enable_math {
            next.enable_math = v;
        }
        if let Some(v) = overrides.macro_alpha_chars {
            next.macro_alpha_chars = v;
        }
        if let Some(v) = overrides.macro_escape_char {
            next.macro_escape_char = v;
        }
        if let Some(v) = overrides.comment_start {
            next.comment_start = v;
        }
        if let Some(v) = overrides.forbidden_characters {
            next.forbidden_characters = v;
        }

        let group_delims_changed = overrides.latex_group_delimiters.is_some();
        if let Some(v) = overrides.latex_group_delimiters {
            next.latex_group_delimiters = v;
        }
        if group_delims_changed {
            let (by_open, close) = compute_group_delim_info(&next.latex_group_delimiters);
            next.group_delim_by_open = Rc::new(by_open);
            next.group_delim_close = Rc::new(close);
        }

        let math_delims_changed =
            overrides.latex_inline_math_delimiters.is_some() || overrides.latex_display_math_delimiters.is_some();
        if let Some(v) = overrides.latex_inline_math_delimiters {
            next.latex_inline_math_delimiters = v;
        }
        if let Some(v) = overrides.latex_display_math_delimiters {
            next.latex_display_math_delimiters = v;
        }
        if math_delims_changed {
            let (by_len, by_open, close) =
                compute_math_delim_info(&next.latex_inline_math_delimiters, &next.latex_display_math_delimiters);
            next.math_delims_by_len = Rc::new(by_len);
            next.math_delims_by_open = Rc::new(by_open);
            next.math_delims_close = Rc::new(close);
        }

        let inmath_changed = overrides.in_math_mode.is_some() || overrides.math_mode_delimiter.is_some();
        if let Some(v) = overrides.in_math_mode {
            next.in_math_mode = v;
        }
        if let Some(v) = overrides.math_mode_delimiter {
            next.math_mode_delimiter = v;
        }
        if !next.in_math_mode && next.math_mode_delimiter.is_some() {
            log::warn!(
                "ParsingState: math_mode_delimiter set to {:?} but in_math_mode is false; clearing it",
                next.math_mode_delimiter
            );
            next.math_mode_delimiter = None;
        }
        if inmath_changed || math_delims_changed {
            next.math_expecting_close_delim =
                compute_expecting_close_delim(next.in_math_mode, &next.math_mode_delimiter, &next.math_delims_by_open);
        }

        next
    }

    pub fn latex_context(&self) -> Option<&ContextDbHandle> {
        self.latex_context.as_ref()
    }

    pub fn in_math_mode(&self) -> bool {
        self.in_math_mode
    }

    pub fn math_mode_delimiter(&self) -> Option<&str> {
        self.math_mode_delimiter.as_deref()
    }

    pub fn enable_double_newline_paragraphs(&self) -> bool {
        self.enable_double_newline_paragraphs
    }

    pub fn enable_macros(&self) -> bool {
        self.enable_macros
    }

    pub fn enable_environments(&self) -> bool {
        self.enable_environments
    }

    pub fn enable_comments(&self) -> bool {
        self.enable_comments
    }

    pub fn enable_groups(&self) -> bool {
        self.enable_groups
    }

    pub fn enable_specials(&self) -> bool {
        self.enable_specials
    }

    pub fn enable_math(&self) -> bool {
        self.enable_math
    }

    pub fn macro_alpha_chars(&self) -> &str {
        &self.macro_alpha_chars
    }

    pub fn macro_escape_char(&self) -> char {
        self.macro_escape_char
    }

    pub fn comment_start(&self) -> char {
        self.comment_start
    }

    pub fn forbidden_characters(&self) -> &str {
        &self.forbidden_characters
    }

    pub fn is_forbidden_character(&self, c: char) -> bool {
        self.forbidden_characters.contains(c)
    }

    pub fn latex_group_delimiters(&self) -> &[(String, String)] {
        &self.latex_group_delimiters
    }

    /// The close delimiter expected for `open`, if `open` is a registered
    /// group-opening delimiter.
    pub fn expected_group_close_delimiter(&self, open: &str) -> Option<&str> {
        self.group_delim_by_open.get(open).map(String::as_str)
    }

    pub fn is_group_close_delimiter(&self, s: &str) -> bool {
        self.group_delim_close.contains(s)
    }

    /// All registered math delimiters (open and close, inline and display),
    /// longest-string-first, for the tokenizer's linear scan.
    pub fn math_delims_by_len(&self) -> &[(String, MathDelimKind)] {
        &self.math_delims_by_len
    }

    pub fn lookup_math_open_delim(&self, open: &str) -> Option<&MathDelimInfo> {
        self.math_delims_by_open.get(open)
    }

    pub fn is_math_close_delim(&self, s: &str) -> bool {
        self.math_delims_close.contains(s)
    }

    /// When already in math mode, the specific close delimiter the tokenizer
    /// should look for first (disambiguates `$` vs `$$`, per
    /// `math_mode_delimiter`). `None` means the enclosing math mode was
    /// opened by something other than a core delimiter (e.g. an `align`
    /// environment), so no specific close token is being awaited.
    pub fn expecting_math_close_delim(&self) -> Option<&MathDelimInfo> {
        self.math_expecting_close_delim.as_deref()
    }
}

impl fmt::Display for ParsingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParsingState(in_math_mode={}, math_mode_delimiter={:?})",
            self.in_math_mode, self.math_mode_delimiter
        )
    }
}
