/*!
# Traversal & Collector

Walks a parse tree once, runs every entry against every node and merges the
resulting actions into cuts and dependency groups.
*/

use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::entry::{Action, Entry};
use crate::syntax::{Node, ParseTree};

/// Half-open byte range to delete from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cut {
    pub start: usize,
    pub end: usize,
}

/// Symbolic names grouped by emission priority
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGroups {
    sync: BTreeMap<i32, IndexSet<String>>,
    deferred: IndexSet<String>,
}

impl DependencyGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sync<I: IntoIterator<Item = String>>(&mut self, weight: i32, names: I) {
        self.sync.entry(weight).or_default().extend(names);
    }

    pub fn add_deferred<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.deferred.extend(names);
    }

    /// Synchronous buckets in ascending weight, names in first-seen order
    pub fn sync_buckets(&self) -> impl Iterator<Item = (i32, &IndexSet<String>)> {
        self.sync.iter().map(|(weight, names)| (*weight, names))
    }

    pub fn deferred(&self) -> &IndexSet<String> {
        &self.deferred
    }

    pub fn is_empty(&self) -> bool {
        self.deferred.is_empty() && self.sync.values().all(IndexSet::is_empty)
    }
}

/// Everything one traversal found
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Sorted by descending end offset
    pub cuts: Vec<Cut>,
    pub groups: DependencyGroups,
    /// Number of non-empty actions produced per entry
    pub matches: IndexMap<&'static str, usize>,
}

impl Collection {
    fn merge(&mut self, entry: &dyn Entry, root: Node<'_>, action: Action) {
        if action.is_noop() {
            return;
        }
        debug!(
            entry = entry.name(),
            node = ?root,
            requires = ?action.requires,
            remove = ?action.remove,
            deferred = action.is_async,
            weight = action.weight,
            "Collected action"
        );
        *self.matches.entry(entry.name()).or_default() += 1;

        if !action.requires.is_empty() {
            if action.is_async {
                self.groups.add_deferred(action.requires);
            } else {
                self.groups.add_sync(action.weight, action.requires);
            }
        }

        if let Some(levels) = action.remove {
            let target = root.ancestor(levels);
            self.cuts.push(Cut {
                start: target.start(),
                end: target.end(),
            });
        }
    }
}

/// Applies a fixed, ordered list of entries to a tree
pub struct Collector<'e> {
    entries: &'e [Box<dyn Entry>],
}

impl<'e> Collector<'e> {
    pub fn new(entries: &'e [Box<dyn Entry>]) -> Self {
        Self { entries }
    }

    pub fn collect(&self, tree: &ParseTree<'_>) -> Collection {
        let mut collection = Collection::default();

        for node in tree.walk() {
            for entry in self.entries {
                let Some(root) = entry.test(node) else {
                    continue;
                };
                if let Some(action) = entry.process(node, root) {
                    collection.merge(entry.as_ref(), root, action);
                }
            }
        }

        collection.cuts.sort_by(|a, b| b.end.cmp(&a.end));
        collection
    }
}
