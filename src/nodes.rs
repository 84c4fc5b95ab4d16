//! The syntax tree (§3.4 / §3.5): a closed sum type of [`Node`] variants and
//! the [`NodeList`] that threads them together with their spanning position.

use std::fmt;

use crate::context::{ArgumentSpec, SpecHandle};
use crate::error::{ErrorKind, NodesParseError};
use crate::state::ParsingState;

/// One of the seven closed node kinds the parser ever produces.
#[derive(Clone, Debug)]
pub enum Node {
    Chars(CharsNode),
    Group(GroupNode),
    Comment(CommentNode),
    Macro(MacroNode),
    Environment(EnvironmentNode),
    Specials(SpecialsNode),
    Math(MathNode),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathDisplayType {
    Inline,
    Display,
}

#[derive(Clone, Debug)]
pub struct CharsNode {
    pub chars: String,
    pub parsing_state: ParsingState,
    pub pos: usize,
    pub pos_end: usize,
}

#[derive(Clone, Debug)]
pub struct GroupNode {
    pub nodelist: NodeList,
    pub delimiters: (String, String),
    pub parsing_state: ParsingState,
    pub pos: usize,
    pub pos_end: usize,
}

#[derive(Clone, Debug)]
pub struct CommentNode {
    pub comment: String,
    pub comment_post_space: String,
    pub parsing_state: ParsingState,
    pub pos: usize,
    pub pos_end: usize,
}

#[derive(Clone, Debug)]
pub struct MacroNode {
    pub macroname: String,
    pub spec: SpecHandle,
    pub args: ParsedArguments,
    pub macro_post_space: String,
    pub parsing_state: ParsingState,
    pub pos: usize,
    pub pos_end: usize,
}

#[derive(Clone, Debug)]
pub struct EnvironmentNode {
    pub environmentname: String,
    pub spec: SpecHandle,
    pub nodelist: NodeList,
    pub args: ParsedArguments,
    pub parsing_state: ParsingState,
    pub pos: usize,
    pub pos_end: usize,
}

#[derive(Clone, Debug)]
pub struct SpecialsNode {
    pub specials_chars: String,
    pub spec: SpecHandle,
    pub args: Option<ParsedArguments>,
    pub parsing_state: ParsingState,
    pub pos: usize,
    pub pos_end: usize,
}

#[derive(Clone, Debug)]
pub struct MathNode {
    pub displaytype: MathDisplayType,
    pub nodelist: NodeList,
    pub delimiters: (String, String),
    pub parsing_state: ParsingState,
    pub pos: usize,
    pub pos_end: usize,
}

impl Node {
    pub fn pos(&self) -> usize {
        match self {
            Node::Chars(n) => n.pos,
            Node::Group(n) => n.pos,
            Node::Comment(n) => n.pos,
            Node::Macro(n) => n.pos,
            Node::Environment(n) => n.pos,
            Node::Specials(n) => n.pos,
            Node::Math(n) => n.pos,
        }
    }

    pub fn pos_end(&self) -> usize {
        match self {
            Node::Chars(n) => n.pos_end,
            Node::Group(n) => n.pos_end,
            Node::Comment(n) => n.pos_end,
            Node::Macro(n) => n.pos_end,
            Node::Environment(n) => n.pos_end,
            Node::Specials(n) => n.pos_end,
            Node::Math(n) => n.pos_end,
        }
    }

    pub fn len(&self) -> usize {
        self.pos_end() - self.pos()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parsing_state(&self) -> &ParsingState {
        match self {
            Node::Chars(n) => &n.parsing_state,
            Node::Group(n) => &n.parsing_state,
            Node::Comment(n) => &n.parsing_state,
            Node::Macro(n) => &n.parsing_state,
            Node::Environment(n) => &n.parsing_state,
            Node::Specials(n) => &n.parsing_state,
            Node::Math(n) => &n.parsing_state,
        }
    }

    pub fn as_chars(&self) -> Option<&CharsNode> {
        match self {
            Node::Chars(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            Node::Group(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_macro(&self) -> Option<&MacroNode> {
        match self {
            Node::Macro(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_environment(&self) -> Option<&EnvironmentNode> {
        match self {
            Node::Environment(n) => Some(n),
            _ => None,
        }
    }
}

/// A contiguous run of nodes, along with the byte span it covers (the span
/// of the first and last non-`None` node, if any).
///
/// A `None` entry represents an argument slot that was declared optional and
/// not provided by the input; it only ever appears as the sole element of a
/// single-argument node list (see [`SingleParsedArgumentInfo::content_nodelist`]).
#[derive(Clone, Debug, Default)]
pub struct NodeList {
    nodes: Vec<Option<Node>>,
    pos: Option<usize>,
    pos_end: Option<usize>,
}

impl NodeList {
    pub fn new(nodes: Vec<Option<Node>>) -> Self {
        let pos = nodes.iter().flatten().map(Node::pos).next();
        let pos_end = nodes.iter().rev().flatten().map(Node::pos_end).next();
        Self { nodes, pos, pos_end }
    }

    pub fn with_span(nodes: Vec<Option<Node>>, pos: usize, pos_end: usize) -> Self {
        Self { nodes, pos: Some(pos), pos_end: Some(pos_end) }
    }

    pub fn empty() -> Self {
        Self { nodes: Vec::new(), pos: None, pos_end: None }
    }

    pub fn single(node: Node) -> Self {
        Self::new(vec![Some(node)])
    }

    pub fn none_placeholder() -> Self {
        Self { nodes: vec![None], pos: None, pos_end: None }
    }

    pub fn push(&mut self, node: Node) {
        if self.pos.is_none() {
            self.pos = Some(node.pos());
        }
        self.pos_end = Some(node.pos_end());
        self.nodes.push(Some(node));
    }

    pub fn nodes(&self) -> &[Option<Node>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn pos(&self) -> Option<usize> {
        self.pos
    }

    pub fn pos_end(&self) -> Option<usize> {
        self.pos_end
    }

    /// The concatenation of every `Chars` node's text, skipping `Comment`
    /// nodes and `None` slots. Any other node type is a typed parse error,
    /// since the caller is asking for plain-text content.
    pub fn content_as_chars(&self) -> Result<String, NodesParseError> {
        let mut out = String::new();
        for node in self.nodes.iter().flatten() {
            match node {
                Node::Chars(c) => out.push_str(&c.chars),
                Node::Comment(_) => {}
                other => {
                    return Err(NodesParseError::new(
                        "content is not plain characters",
                        other.pos(),
                        0,
                        0,
                        ErrorKind::ContentIsNotPlainChars,
                    ));
                }
            }
        }
        Ok(out)
    }

    /// Splits this node list at every occurrence of `sep` inside `Chars`
    /// nodes, the way a `\cite{key1,key2}` argument gets split on `,` while
    /// leaving nested groups (e.g. `my{special,key}`) intact as a single
    /// chunk.
    pub fn split_at_chars(&self, sep: &str) -> Vec<NodeList> {
        let mut chunks: Vec<Vec<Option<Node>>> = Vec::new();
        let mut pending: Vec<Option<Node>> = Vec::new();

        for node in &self.nodes {
            match node {
                Some(Node::Chars(c)) => {
                    let mut parts = c.chars.split(sep);
                    let mut rel_pos = c.pos;
                    if let Some(first) = parts.next() {
                        if !first.is_empty() {
                            pending.push(Some(chars_subnode(c, first, rel_pos)));
                            rel_pos += first.len();
                        }
                        rel_pos += sep.len();
                        let rest: Vec<&str> = parts.collect();
                        if rest.is_empty() {
                            continue;
                        }
                        if !pending.is_empty() {
                            chunks.push(std::mem::take(&mut pending));
                        }
                        for (i, part) in rest.iter().enumerate() {
                            chunks.push(vec![Some(chars_subnode(c, part, rel_pos))]);
                            rel_pos += part.len();
                            if i + 1 < rest.len() {
                                rel_pos += sep.len();
                            }
                        }
                    }
                }
                other => pending.push(other.clone()),
            }
        }
        if !pending.is_empty() {
            chunks.push(pending);
        }

        chunks.into_iter().map(NodeList::new).collect()
    }
}

fn chars_subnode(orig: &CharsNode, text: &str, pos: usize) -> Node {
    Node::Chars(CharsNode {
        chars: text.to_string(),
        parsing_state: orig.parsing_state.clone(),
        pos,
        pos_end: pos + text.len(),
    })
}

impl fmt::Display for NodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeList(len={}, pos={:?}, pos_end={:?})", self.nodes.len(), self.pos, self.pos_end)
    }
}

/// One parsed argument slot: either a node (usually a [`Node::Group`] for a
/// braced argument, or a single node for a one-token argument) or `None` if
/// the slot was an unfulfilled optional argument.
#[derive(Clone, Debug)]
pub struct SingleParsedArgumentInfo {
    node: Option<Node>,
}

impl SingleParsedArgumentInfo {
    pub fn new(node: Option<Node>) -> Self {
        Self { node }
    }

    pub fn was_provided(&self) -> bool {
        self.node.is_some()
    }

    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    /// The argument's contents as a node list: a group's inner nodelist if
    /// the argument is a [`Node::Group`], a one-element list wrapping any
    /// other node, or a one-element `[None]` list if the argument was not
    /// provided.
    pub fn content_nodelist(&self) -> NodeList {
        match &self.node {
            None => NodeList::none_placeholder(),
            Some(Node::Group(g)) => g.nodelist.clone(),
            Some(other) => NodeList::single(other.clone()),
        }
    }

    pub fn content_as_chars(&self) -> Result<String, NodesParseError> {
        self.content_nodelist().content_as_chars()
    }
}

/// The parsed arguments of a macro/environment/specials call: the ordered
/// list of argument declarations it was parsed against, and the
/// corresponding parsed nodes.
#[derive(Clone, Debug, Default)]
pub struct ParsedArguments {
    argspecs: Vec<ArgumentSpec>,
    argnlist: Vec<Option<Node>>,
}

impl ParsedArguments {
    pub fn new(argspecs: Vec<ArgumentSpec>, argnlist: Vec<Option<Node>>) -> Self {
        debug_assert_eq!(argspecs.len(), argnlist.len());
        Self { argspecs, argnlist }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn argspecs(&self) -> &[ArgumentSpec] {
        &self.argspecs
    }

    pub fn argnlist(&self) -> &[Option<Node>] {
        &self.argnlist
    }

    pub fn info(&self) -> ParsedArgumentsInfo<'_> {
        ParsedArgumentsInfo { args: self }
    }
}

/// Either a 0-based position or a name, as accepted by
/// [`ParsedArgumentsInfo::get_argument_info`]. Built from a `usize` or a
/// `&str`/`String` via `Into`, mirroring the original's "`arg` may be an
/// integer or a string" lookup.
#[derive(Clone, Debug)]
pub enum ArgumentKey {
    Index(usize),
    Name(String),
}

impl From<usize> for ArgumentKey {
    fn from(index: usize) -> Self {
        ArgumentKey::Index(index)
    }
}

impl From<&str> for ArgumentKey {
    fn from(name: &str) -> Self {
        ArgumentKey::Name(name.to_string())
    }
}

impl From<String> for ArgumentKey {
    fn from(name: String) -> Self {
        ArgumentKey::Name(name)
    }
}

/// A read-only, convenience façade over [`ParsedArguments`] (§3.5): looks an
/// argument up by its 0-based position or by name among the spec list.
pub struct ParsedArgumentsInfo<'a> {
    args: &'a ParsedArguments,
}

impl<'a> ParsedArgumentsInfo<'a> {
    /// Looks up one argument by position or by name. A name is resolved
    /// against each declaration's `argname`; an unknown name or an
    /// out-of-range position is a typed error rather than a panic.
    pub fn get_argument_info(&self, arg: impl Into<ArgumentKey>) -> Result<SingleParsedArgumentInfo, NodesParseError> {
        let index = match arg.into() {
            ArgumentKey::Index(i) => i,
            ArgumentKey::Name(name) => self
                .args
                .argspecs
                .iter()
                .position(|spec| spec.argname.as_deref() == Some(name.as_str()))
                .ok_or_else(|| {
                    NodesParseError::new(
                        format!("cannot find argument named '{}'", name),
                        0,
                        0,
                        0,
                        ErrorKind::ArgumentNotFound { key: name.clone() },
                    )
                })?,
        };
        self.args.argnlist.get(index).cloned().map(SingleParsedArgumentInfo::new).ok_or_else(|| {
            NodesParseError::new(
                format!("argument index {} is out of range", index),
                0,
                0,
                0,
                ErrorKind::ArgumentNotFound { key: index.to_string() },
            )
        })
    }

    pub fn get_all_arguments_info(&self) -> Vec<SingleParsedArgumentInfo> {
        self.args.argnlist.iter().map(|n| SingleParsedArgumentInfo::new(n.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.args.argnlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.argnlist.is_empty()
    }
}
