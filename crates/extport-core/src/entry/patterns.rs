/*!
# Structural Patterns

Declarative matchers for the shapes framework constructs take in a
JavaScript syntax tree, and [`PatternEntry`] which pairs one with a
processing function.
*/

use super::{Action, Entry};
use crate::syntax::Node;

/// Pattern matcher for syntax nodes
pub trait NodePattern: Send + Sync {
    /// Return the match root when this pattern matches `node`
    fn find<'t>(&self, node: Node<'t>) -> Option<Node<'t>>;
}

/// A call whose callee is `object.method`, or a bare `method` when `object`
/// is `None`. Matches on the `call_expression` node and yields the argument
/// at index `argument`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPattern {
    pub object: Option<&'static str>,
    pub method: &'static str,
    pub argument: usize,
}

impl CallPattern {
    pub const fn member(object: &'static str, method: &'static str, argument: usize) -> Self {
        Self {
            object: Some(object),
            method,
            argument,
        }
    }

    pub const fn function(method: &'static str, argument: usize) -> Self {
        Self {
            object: None,
            method,
            argument,
        }
    }

    /// Whether `node` is a call to this callee, regardless of arguments
    pub fn is_callee_of(&self, node: Node<'_>) -> bool {
        if !node.is_kind("call_expression") {
            return false;
        }
        let Some(callee) = node.child_by_field("function") else {
            return false;
        };
        match self.object {
            Some(object) => {
                callee.is_kind("member_expression")
                    && callee
                        .child_by_field("object")
                        .is_some_and(|o| o.is_kind("identifier") && o.text() == object)
                    && callee
                        .child_by_field("property")
                        .is_some_and(|p| p.text() == self.method)
            }
            None => callee.is_kind("identifier") && callee.text() == self.method,
        }
    }

    pub fn argument_of<'t>(&self, call: Node<'t>) -> Option<Node<'t>> {
        call.child_by_field("arguments")?
            .significant_children()
            .nth(self.argument)
    }
}

impl NodePattern for CallPattern {
    fn find<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if self.is_callee_of(node) {
            self.argument_of(node)
        } else {
            None
        }
    }
}

/// A `key: value` pair inside the config object passed to one of `within`
///
/// The match root is the `pair` node.
#[derive(Debug, Clone, Copy)]
pub struct ConfigPropertyPattern {
    pub keys: &'static [&'static str],
    pub within: &'static [CallPattern],
}

impl ConfigPropertyPattern {
    pub const fn new(keys: &'static [&'static str], within: &'static [CallPattern]) -> Self {
        Self { keys, within }
    }

    /// The call this config object belongs to, if it is one of `within`
    pub fn owning_call<'t>(&self, object: Node<'t>) -> Option<(Node<'t>, CallPattern)> {
        let call = object.parent().filter(|p| p.is_kind("arguments"))?.parent()?;
        self.within
            .iter()
            .find(|pattern| {
                pattern
                    .find(call)
                    .is_some_and(|config| config.id() == object.id())
            })
            .map(|pattern| (call, *pattern))
    }
}

impl NodePattern for ConfigPropertyPattern {
    fn find<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if !node.is_kind("pair") {
            return None;
        }
        let key = node.child_by_field("key")?.name_value()?;
        if !self.keys.contains(&key.as_str()) {
            return None;
        }
        let object = node.parent().filter(|p| p.is_kind("object"))?;
        self.owning_call(object).map(|_| node)
    }
}

/// OR pattern combinator
pub struct AnyPattern<P1: NodePattern, P2: NodePattern> {
    p1: P1,
    p2: P2,
}

impl<P1: NodePattern, P2: NodePattern> AnyPattern<P1, P2> {
    pub fn new(p1: P1, p2: P2) -> Self {
        Self { p1, p2 }
    }
}

impl<P1: NodePattern, P2: NodePattern> NodePattern for AnyPattern<P1, P2> {
    fn find<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        self.p1.find(node).or_else(|| self.p2.find(node))
    }
}

type Processor = for<'t> fn(Node<'t>, Node<'t>) -> Option<Action>;

/// An entry made of a declarative pattern plus a processing function
pub struct PatternEntry<P: NodePattern> {
    name: &'static str,
    description: &'static str,
    pattern: P,
    processor: Processor,
}

impl<P: NodePattern> PatternEntry<P> {
    pub fn new(
        name: &'static str,
        description: &'static str,
        pattern: P,
        processor: Processor,
    ) -> Self {
        Self {
            name,
            description,
            pattern,
            processor,
        }
    }
}

impl<P: NodePattern> Entry for PatternEntry<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn test<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        self.pattern.find(node)
    }

    fn process<'t>(&self, node: Node<'t>, root: Node<'t>) -> Option<Action> {
        (self.processor)(node, root)
    }
}

/// Class names held by a string, an array of strings, or an object whose
/// values are strings. Non-string elements are skipped.
pub fn class_names(node: Node<'_>) -> Vec<String> {
    match node.kind() {
        "array" => node
            .significant_children()
            .filter_map(|element| element.string_value())
            .collect(),
        "object" => node
            .significant_children()
            .filter(|member| member.is_kind("pair"))
            .filter_map(|pair| pair.child_by_field("value")?.string_value())
            .collect(),
        _ => node.string_value().into_iter().collect(),
    }
}
