/*!
# Entry Definitions

An entry recognizes one framework construct in the syntax tree and extracts
an [`Action`] from it: which symbolic class names it references and whether the
construct itself should be cut out of the source.

Recognition is split in two steps. [`Entry::test`] is a pure structural
predicate that returns the node to extract from, which may differ from the
node it was called on (for example the argument of a call rather than the
call). [`Entry::process`] then turns that node into an action.

## Example

```rust,ignore
use extport_core::entry::{Action, FnEntry};

let entry = FnEntry::new(
    "globals",
    "Collects App.Globals references",
    |node| (node.text() == "App.Globals").then_some(node),
    |_node, _root| Some(Action::new().require("App.Globals")),
);
```
*/

use crate::syntax::Node;

pub mod catalogue;
pub mod patterns;

pub use catalogue::{base_entries, entries_by_name, ENTRY_NAMES};
pub use patterns::{AnyPattern, CallPattern, ConfigPropertyPattern, NodePattern, PatternEntry};

/// What the engine should do about one matched construct
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    /// Number of parent links to walk up from the match root before cutting;
    /// `Some(0)` cuts the match root itself
    pub remove: Option<usize>,
    /// Symbolic class names, in the order they appear
    pub requires: Vec<String>,
    /// Whether the names may be loaded after the current file runs
    pub is_async: bool,
    /// Emission priority of synchronous requires, ascending
    pub weight: i32,
}

impl Action {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.requires.push(name.into());
        self
    }

    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    /// Cut the ancestor `levels` links above the match root
    pub fn remove(mut self, levels: usize) -> Self {
        self.remove = Some(levels);
        self
    }

    /// Cut the match root itself
    pub fn remove_self(self) -> Self {
        self.remove(0)
    }

    pub fn deferred(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// An action that neither cuts nor requires anything is ignored
    pub fn is_noop(&self) -> bool {
        self.remove.is_none() && self.requires.is_empty()
    }
}

/// Core trait for entry definitions
///
/// Entries are stateless and shared across every parse. The engine calls every
/// registered entry on every node in pre-order; an entry must not rely on the
/// order other entries run in for the same node.
pub trait Entry: Send + Sync {
    /// Name used to select the entry from configuration
    fn name(&self) -> &'static str;

    /// Detailed description of what this entry recognizes
    fn description(&self) -> &'static str {
        ""
    }

    /// Return the node to extract from when `node` is a construct of interest
    fn test<'t>(&self, node: Node<'t>) -> Option<Node<'t>>;

    /// Extract the action for a node accepted by [`Entry::test`]
    fn process<'t>(&self, node: Node<'t>, root: Node<'t>) -> Option<Action>;
}

type TestFn = for<'t> fn(Node<'t>) -> Option<Node<'t>>;
type ProcessFn = for<'t> fn(Node<'t>, Node<'t>) -> Option<Action>;

/// An entry assembled from two plain functions
pub struct FnEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub test: TestFn,
    pub process: ProcessFn,
}

impl FnEntry {
    pub fn new(
        name: &'static str,
        description: &'static str,
        test: TestFn,
        process: ProcessFn,
    ) -> Self {
        Self {
            name,
            description,
            test,
            process,
        }
    }
}

impl Entry for FnEntry {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn test<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        (self.test)(node)
    }

    fn process<'t>(&self, node: Node<'t>, root: Node<'t>) -> Option<Action> {
        (self.process)(node, root)
    }
}
