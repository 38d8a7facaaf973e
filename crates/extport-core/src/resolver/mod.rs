/*!
# Namespace Resolver

Turns a symbolic dotted class name into the files that define it.

Prefixes are consulted longest first; a prefix matches a name when the name
starts with the prefix followed by a dot. The winning prefix decides the
strategy:

- **disabled**: the name is satisfied by convention, nothing to load
- **query**: a [`ClassQuery`] reports the class source and any overrides
- **directory**: the rest of the name becomes a path under a base directory,
  probed against each configured extension in order

Names no prefix covers are an error, except names under the reserved
framework root (`Ext` by default) when that root has no mapping of its own.
*/

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, RewriteError};

pub mod query;

pub use query::{ClassQuery, ClassRecord, ManifestQuery, QueryAnswer};

/// What to do when a query returns neither a class nor a list of classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedQueryPolicy {
    /// Abort the rewrite with [`RewriteError::MalformedQueryResult`]
    #[default]
    Fail,
    /// Log a warning and load nothing for the name
    Skip,
}

/// How names under one prefix are resolved
pub enum Strategy {
    Disabled,
    Query(Box<dyn ClassQuery>),
    Directory(String),
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Disabled => f.write_str("Disabled"),
            Strategy::Query(_) => f.write_str("Query(..)"),
            Strategy::Directory(dir) => f.debug_tuple("Directory").field(dir).finish(),
        }
    }
}

/// Prefix to strategy mapping, kept ordered longest prefix first
#[derive(Debug, Default)]
pub struct NamespaceMapping {
    entries: Vec<(String, Strategy)>,
}

impl NamespaceMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the strategy for `prefix`
    pub fn insert(&mut self, prefix: impl Into<String>, strategy: Strategy) {
        let prefix = prefix.into();
        self.entries.retain(|(existing, _)| *existing != prefix);
        // stable: equal lengths keep insertion order
        let position = self
            .entries
            .iter()
            .position(|(existing, _)| existing.len() < prefix.len())
            .unwrap_or(self.entries.len());
        self.entries.insert(position, (prefix, strategy));
    }

    pub fn disable(mut self, prefix: impl Into<String>) -> Self {
        self.insert(prefix, Strategy::Disabled);
        self
    }

    pub fn directory(mut self, prefix: impl Into<String>, dir: impl Into<String>) -> Self {
        self.insert(prefix, Strategy::Directory(dir.into()));
        self
    }

    pub fn query<Q: ClassQuery + 'static>(mut self, prefix: impl Into<String>, query: Q) -> Self {
        self.insert(prefix, Strategy::Query(Box::new(query)));
        self
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == prefix)
    }

    /// Longest prefix covering `name`
    pub fn lookup(&self, name: &str) -> Option<(&str, &Strategy)> {
        self.entries
            .iter()
            .find(|(prefix, _)| {
                name.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            })
            .map(|(prefix, strategy)| (prefix.as_str(), strategy))
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(prefix, _)| prefix.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves symbolic names to file paths
#[derive(Debug)]
pub struct NamespaceResolver {
    mapping: NamespaceMapping,
    extensions: Vec<String>,
    reserved_root: String,
    malformed_policy: MalformedQueryPolicy,
    root: Option<PathBuf>,
}

impl NamespaceResolver {
    pub fn new(mapping: NamespaceMapping) -> Self {
        Self {
            mapping,
            extensions: vec!["js".to_string()],
            reserved_root: "Ext".to_string(),
            malformed_policy: MalformedQueryPolicy::default(),
            root: None,
        }
    }

    /// Candidate extensions, tried in order. A leading dot is optional.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    pub fn with_reserved_root(mut self, root: impl Into<String>) -> Self {
        self.reserved_root = root.into();
        self
    }

    pub fn with_malformed_policy(mut self, policy: MalformedQueryPolicy) -> Self {
        self.malformed_policy = policy;
        self
    }

    /// Probe directory candidates relative to `root` instead of the working
    /// directory. Returned paths stay relative.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn mapping(&self) -> &NamespaceMapping {
        &self.mapping
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Resolve a symbolic name to zero or more paths
    pub fn resolve(&self, name: &str) -> Result<Vec<String>> {
        let Some((prefix, strategy)) = self.mapping.lookup(name) else {
            return self.resolve_unmapped(name);
        };

        match strategy {
            Strategy::Disabled => {
                debug!(name, prefix, "Prefix disabled, nothing to load");
                Ok(Vec::new())
            }
            Strategy::Query(query) => self.resolve_query(prefix, name, query.as_ref()),
            Strategy::Directory(dir) => self.resolve_directory(prefix, name, dir).map(|p| vec![p]),
        }
    }

    fn resolve_unmapped(&self, name: &str) -> Result<Vec<String>> {
        let reserved = name
            .strip_prefix(self.reserved_root.as_str())
            .is_some_and(|rest| rest.starts_with('.'));
        if reserved && !self.mapping.contains_prefix(&self.reserved_root) {
            debug!(name, "Provided by the framework");
            return Ok(Vec::new());
        }
        Err(RewriteError::UnresolvedNamespace {
            name: name.to_string(),
        })
    }

    fn resolve_query(&self, prefix: &str, name: &str, query: &dyn ClassQuery) -> Result<Vec<String>> {
        match query.query(name) {
            QueryAnswer::Class(record) => {
                let mut paths = Vec::with_capacity(1 + record.overrides.len());
                paths.push(record.src);
                paths.extend(record.overrides);
                Ok(paths)
            }
            QueryAnswer::Classes(records) => Ok(records.into_iter().map(|r| r.src).collect()),
            QueryAnswer::Malformed(reason) => match self.malformed_policy {
                MalformedQueryPolicy::Fail => Err(RewriteError::MalformedQueryResult {
                    prefix: prefix.to_string(),
                    name: name.to_string(),
                    reason,
                }),
                MalformedQueryPolicy::Skip => {
                    warn!(prefix, name, %reason, "Skipping malformed query result");
                    Ok(Vec::new())
                }
            },
        }
    }

    fn resolve_directory(&self, prefix: &str, name: &str, dir: &str) -> Result<String> {
        let relative = name[prefix.len()..].replace('.', "/");
        let file_prefix = format!("{}{}", dir.trim_end_matches('/'), relative);

        for ext in &self.extensions {
            let candidate = format!("{file_prefix}.{ext}");
            let on_disk = match &self.root {
                Some(root) => root.join(&candidate),
                None => PathBuf::from(&candidate),
            };
            debug!(file = %on_disk.display(), "Checking file");
            if on_disk.is_file() {
                debug!(file = %on_disk.display(), "Found");
                return Ok(candidate);
            }
        }

        Err(RewriteError::FileNotFound {
            candidate: file_prefix,
            extensions: self.extensions.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &std::path::Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_mapping_orders_longest_prefix_first() {
        let mapping = NamespaceMapping::new()
            .directory("A", "a")
            .directory("A.B.C", "abc")
            .directory("A.B", "ab");
        let prefixes: Vec<_> = mapping.prefixes().collect();
        assert_eq!(prefixes, vec!["A.B.C", "A.B", "A"]);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "abc/Widget.js");
        touch(temp.path(), "ab/C/Widget.js");

        let resolver = NamespaceResolver::new(
            NamespaceMapping::new()
                .directory("A.B", "ab")
                .directory("A.B.C", "abc"),
        )
        .with_root(temp.path());

        assert_eq!(resolver.resolve("A.B.C.Widget").unwrap(), vec!["abc/Widget.js"]);
    }

    #[test]
    fn test_prefix_must_end_at_a_dot() {
        let mapping = NamespaceMapping::new().disable("App");
        assert!(mapping.lookup("App.Main").is_some());
        assert!(mapping.lookup("Application.Main").is_none());
        assert!(mapping.lookup("App").is_none());
    }

    #[test]
    fn test_insert_replaces_existing_prefix() {
        let mut mapping = NamespaceMapping::new().directory("App", "src");
        mapping.insert("App", Strategy::Disabled);
        assert_eq!(mapping.len(), 1);
        assert!(matches!(mapping.lookup("App.X"), Some((_, Strategy::Disabled))));
    }

    #[test]
    fn test_directory_probes_extensions_in_order() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "src/app/view/Main.ts");
        touch(temp.path(), "src/app/view/Main.js");

        let resolver = NamespaceResolver::new(NamespaceMapping::new().directory("App", "src/app/"))
            .with_extensions([".ts", "js"])
            .with_root(temp.path());
        let paths = resolver.resolve("App.view.Main").unwrap();
        assert_eq!(paths, vec!["src/app/view/Main.ts"]);
        assert!(temp.path().join(&paths[0]).is_file());
    }

    #[test]
    fn test_directory_miss_names_candidates() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = NamespaceResolver::new(NamespaceMapping::new().directory("App", "src/app"))
            .with_extensions(["js", "mjs"])
            .with_root(temp.path());

        match resolver.resolve("App.view.Missing") {
            Err(RewriteError::FileNotFound { candidate, extensions }) => {
                assert_eq!(candidate, "src/app/view/Missing");
                assert_eq!(extensions, vec!["js", "mjs"]);
            }
            other => panic!("Expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_reserved_root_without_mapping() {
        let resolver = NamespaceResolver::new(NamespaceMapping::new());
        assert!(resolver.resolve("Ext.panel.Panel").unwrap().is_empty());
        assert!(matches!(
            resolver.resolve("Other.panel.Panel"),
            Err(RewriteError::UnresolvedNamespace { name }) if name == "Other.panel.Panel"
        ));
    }

    #[test]
    fn test_reserved_root_with_mapping_uses_it() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "ext/panel/Panel.js");
        let resolver = NamespaceResolver::new(NamespaceMapping::new().directory("Ext", "ext"))
            .with_root(temp.path());
        assert_eq!(resolver.resolve("Ext.panel.Panel").unwrap(), vec!["ext/panel/Panel.js"]);
    }

    #[test]
    fn test_custom_reserved_root() {
        let resolver = NamespaceResolver::new(NamespaceMapping::new()).with_reserved_root("Sencha");
        assert!(resolver.resolve("Sencha.Thing").unwrap().is_empty());
        assert!(resolver.resolve("Ext.Thing").is_err());
    }

    #[test]
    fn test_disabled_prefix() {
        let resolver = NamespaceResolver::new(NamespaceMapping::new().disable("App"));
        assert!(resolver.resolve("App.view.Main").unwrap().is_empty());
    }

    #[test]
    fn test_query_answers() {
        let resolver = NamespaceResolver::new(NamespaceMapping::new().query("Lib", |name: &str| {
            match name {
                "Lib.One" => QueryAnswer::Class(
                    ClassRecord::new("lib/One.js").with_overrides(["lib/One.override.js"]),
                ),
                "Lib.Many" => QueryAnswer::Classes(vec![
                    ClassRecord::new("lib/a.js"),
                    ClassRecord::new("lib/b.js"),
                ]),
                _ => QueryAnswer::Malformed("unknown".to_string()),
            }
        }));

        assert_eq!(
            resolver.resolve("Lib.One").unwrap(),
            vec!["lib/One.js", "lib/One.override.js"]
        );
        assert_eq!(resolver.resolve("Lib.Many").unwrap(), vec!["lib/a.js", "lib/b.js"]);
        assert!(matches!(
            resolver.resolve("Lib.Other"),
            Err(RewriteError::MalformedQueryResult { .. })
        ));
    }

    #[test]
    fn test_malformed_query_can_be_skipped() {
        let resolver = NamespaceResolver::new(
            NamespaceMapping::new().query("Lib", |_: &str| QueryAnswer::Malformed("bad".into())),
        )
        .with_malformed_policy(MalformedQueryPolicy::Skip);
        assert!(resolver.resolve("Lib.Thing").unwrap().is_empty());
    }
}
