/*!
# Syntax Trees

Parser-independent syntax tree used by the rewriting engine.

A [`SyntaxTree`] is an arena of named nodes carrying byte ranges into the
original text. It holds no text of its own, which keeps it small enough to be
cached per content fingerprint. At rewrite time it is paired with the source
and a [`ParentIndex`] inside a [`ParseTree`], which hands out copyable
[`Node`] handles for the entry definitions to inspect.
*/

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod javascript;

pub use javascript::JavaScriptParser;

/// Index of a node inside its tree's arena
pub type NodeId = usize;

/// How the parser should treat the top level of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Module,
    Script,
}

/// Trait for the parsers that produce syntax trees
pub trait SourceParser: Send {
    /// Parse source text into a syntax tree
    fn parse(&mut self, source: &str, source_type: SourceType) -> Result<SyntaxTree>;

    /// Get parser name for debugging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxNode {
    pub kind: String,
    pub start: usize,
    pub end: usize,
    /// Field name this node occupies in its parent, if any
    pub field: Option<String>,
    pub children: Vec<NodeId>,
}

impl SyntaxNode {
    pub fn new(kind: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            kind: kind.into(),
            start: range.start,
            end: range.end,
            field: None,
            children: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Arena of syntax nodes. The first node pushed is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, registering it as the last child of `parent`
    pub fn push(&mut self, node: SyntaxNode, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Offset of the first token of the program: the start of the root's
    /// first child that is not a comment or hashbang line. A program with no
    /// such child yields the root's end, or 0 for an empty tree.
    pub fn program_start(&self) -> usize {
        let Some(root) = self.nodes.first() else {
            return 0;
        };
        root.children
            .iter()
            .filter_map(|&id| self.nodes.get(id))
            .find(|child| !matches!(child.kind.as_str(), "comment" | "hash_bang_line"))
            .map(|child| child.start)
            .unwrap_or(root.end)
    }

    /// Check the arena shape: children come after their parent and inside the
    /// arena, every node but the root has exactly one parent, and no range is
    /// inverted. Trees from [`SourceParser`]s always pass; deserialized trees
    /// may not.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut parent_count = vec![0usize; self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            if node.start > node.end {
                return Err(format!("node {id} has range {}..{}", node.start, node.end));
            }
            for &child in &node.children {
                if child <= id || child >= self.nodes.len() {
                    return Err(format!("node {id} lists child {child}"));
                }
                parent_count[child] += 1;
            }
        }
        for (id, &count) in parent_count.iter().enumerate() {
            let expected = usize::from(id != 0);
            if count != expected {
                return Err(format!("node {id} has {count} parents"));
            }
        }
        Ok(())
    }
}

/// Back-references from every node to its syntactic parent.
///
/// Built once per parse; the tree is never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ParentIndex {
    parents: Vec<Option<NodeId>>,
}

impl ParentIndex {
    pub fn build(tree: &SyntaxTree) -> Self {
        let mut parents = vec![None; tree.len()];
        for (id, node) in tree.nodes.iter().enumerate() {
            for &child in &node.children {
                parents[child] = Some(id);
            }
        }
        Self { parents }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id).copied().flatten()
    }
}

/// A syntax tree bound to the text it was parsed from
pub struct ParseTree<'s> {
    tree: SyntaxTree,
    parents: ParentIndex,
    source: &'s str,
}

impl<'s> ParseTree<'s> {
    pub fn new(tree: SyntaxTree, source: &'s str) -> Self {
        let parents = ParentIndex::build(&tree);
        Self {
            tree,
            parents,
            source,
        }
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn syntax(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn root(&self) -> Option<Node<'_>> {
        self.node(0)
    }

    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        self.tree.get(id).map(|_| Node {
            tree: &self.tree,
            parents: &self.parents,
            source: self.source,
            id,
        })
    }

    /// Pre-order walk over every node, parents before children
    pub fn walk(&self) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: if self.tree.is_empty() { Vec::new() } else { vec![0] },
        }
    }
}

pub struct PreOrder<'t> {
    tree: &'t ParseTree<'t>,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for PreOrder<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id)?;
        self.stack
            .extend(node.raw().children.iter().rev().copied());
        Some(node)
    }
}

/// Copyable handle to one node of a [`ParseTree`]
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    parents: &'t ParentIndex,
    source: &'t str,
    id: NodeId,
}

impl<'t> Node<'t> {
    fn raw(&self) -> &'t SyntaxNode {
        &self.tree.nodes[self.id]
    }

    fn at(&self, id: NodeId) -> Node<'t> {
        Node { id, ..*self }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &'t str {
        &self.raw().kind
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind() == kind
    }

    pub fn start(&self) -> usize {
        self.raw().start
    }

    pub fn end(&self) -> usize {
        self.raw().end
    }

    pub fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    pub fn field(&self) -> Option<&'t str> {
        self.raw().field.as_deref()
    }

    /// Source text covered by this node. Empty if the range does not fit
    /// the text, which only happens for a tree paired with the wrong source.
    pub fn text(&self) -> &'t str {
        self.source.get(self.range()).unwrap_or("")
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        self.parents.parent(self.id).map(|id| self.at(id))
    }

    /// Walk `levels` parent links up, stopping at the root
    pub fn ancestor(&self, levels: usize) -> Node<'t> {
        let mut current = *self;
        for _ in 0..levels {
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    pub fn child_count(&self) -> usize {
        self.raw().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        self.raw().children.get(index).map(|&id| self.at(id))
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let this = *self;
        self.raw().children.iter().map(move |&id| this.at(id))
    }

    /// Children excluding comments
    pub fn significant_children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        self.children().filter(|child| !child.is_kind("comment"))
    }

    pub fn child_by_field(&self, field: &str) -> Option<Node<'t>> {
        self.children().find(|child| child.field() == Some(field))
    }

    /// True for quoted strings and template strings without substitutions
    pub fn is_string(&self) -> bool {
        match self.kind() {
            "string" => true,
            "template_string" => !self.children().any(|c| c.is_kind("template_substitution")),
            _ => false,
        }
    }

    /// Decoded value of a string literal node
    pub fn string_value(&self) -> Option<String> {
        if !self.is_string() {
            return None;
        }
        let text = self.text();
        if text.len() < 2 {
            return None;
        }
        Some(unescape(&text[1..text.len() - 1]))
    }

    /// Text of an identifier-like node, or the value of a string used as a key
    pub fn name_value(&self) -> Option<String> {
        match self.kind() {
            "identifier" | "property_identifier" | "shorthand_property_identifier" => {
                Some(self.text().to_string())
            }
            _ => self.string_value(),
        }
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}..{}", self.kind(), self.start(), self.end())
    }
}

/// Decode JavaScript string escapes. Unknown escapes yield the escaped char.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            // line continuation
            Some('\n') => {}
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex);
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|&c| c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut out, &hex);
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn push_code_point(out: &mut String, hex: &str) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => out.push(char::REPLACEMENT_CHARACTER),
    }
}
