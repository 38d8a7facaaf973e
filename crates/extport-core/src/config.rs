/*!
# Configuration

JSON configuration for a rewrite run:

```json
{
  "paths": {
    "App": "src/app",
    "Ext": false,
    "Lib": { "manifest": "lib/classes.json" }
  },
  "extensions": ["js"],
  "sourceType": "module",
  "emitImportStatements": false,
  "entries": ["require", "requires", "uses"],
  "cacheDirectory": ".cache"
}
```
*/

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Result, RewriteError};
use crate::resolver::{ManifestQuery, MalformedQueryPolicy, NamespaceMapping, NamespaceResolver, Strategy};
use crate::splicer::{LineEnding, LoadStyle};
use crate::syntax::SourceType;

/// How one namespace prefix is mapped
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPathSpec")]
pub enum PathSpec {
    /// `false`: names under the prefix need no loading
    Disabled,
    /// `"dir"`: names map to files under a directory
    Directory(String),
    /// `{ "manifest": "file.json" }`: names are looked up in a class manifest
    Manifest(PathBuf),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPathSpec {
    Flag(bool),
    Directory(String),
    Manifest { manifest: PathBuf },
}

impl TryFrom<RawPathSpec> for PathSpec {
    type Error = String;

    fn try_from(raw: RawPathSpec) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawPathSpec::Flag(false) => Ok(PathSpec::Disabled),
            RawPathSpec::Flag(true) => {
                Err("`true` is not a path mapping; use false to disable a prefix".to_string())
            }
            RawPathSpec::Directory(dir) => Ok(PathSpec::Directory(dir)),
            RawPathSpec::Manifest { manifest } => Ok(PathSpec::Manifest(manifest)),
        }
    }
}

/// Options for a rewrite run
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RewriteConfig {
    pub paths: IndexMap<String, PathSpec>,
    pub extensions: Vec<String>,
    pub source_type: SourceType,
    pub emit_import_statements: bool,
    /// Built-in entries to run; all of them when absent
    pub entries: Option<Vec<String>>,
    /// Tree cache location; `null` disables caching
    pub cache_directory: Option<PathBuf>,
    pub cache_max_entries: Option<usize>,
    pub reserved_root: String,
    pub malformed_query: MalformedQueryPolicy,
    pub line_ending: LineEnding,
    /// Directory that directory-strategy candidates are probed under
    pub root: Option<PathBuf>,
    /// Directory of the config file, for resolving relative manifest paths
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            paths: IndexMap::new(),
            extensions: vec!["js".to_string()],
            source_type: SourceType::Module,
            emit_import_statements: false,
            entries: None,
            cache_directory: Some(PathBuf::from(".cache")),
            cache_max_entries: None,
            reserved_root: "Ext".to_string(),
            malformed_query: MalformedQueryPolicy::Fail,
            line_ending: LineEnding::Crlf,
            root: None,
            config_dir: None,
        }
    }
}

impl RewriteConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RewriteError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&content)
            .map_err(|e| RewriteError::config(format!("{}: {e}", path.display())))?;
        config.config_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(RewriteError::config("extensions must not be empty"));
        }
        if let Some(prefix) = self.paths.keys().find(|p| p.is_empty() || p.ends_with('.')) {
            return Err(RewriteError::config(format!("invalid namespace prefix '{prefix}'")));
        }
        Ok(())
    }

    pub fn load_style(&self) -> LoadStyle {
        if self.emit_import_statements {
            LoadStyle::Import
        } else {
            LoadStyle::Require
        }
    }

    /// Build the runtime mapping, loading any class manifests
    pub fn namespace_mapping(&self) -> Result<NamespaceMapping> {
        let mut mapping = NamespaceMapping::new();
        for (prefix, spec) in &self.paths {
            let strategy = match spec {
                PathSpec::Disabled => Strategy::Disabled,
                PathSpec::Directory(dir) => Strategy::Directory(dir.clone()),
                PathSpec::Manifest(manifest) => {
                    let path = match &self.config_dir {
                        Some(dir) if manifest.is_relative() => dir.join(manifest),
                        _ => manifest.clone(),
                    };
                    Strategy::Query(Box::new(ManifestQuery::from_file(path)?))
                }
            };
            mapping.insert(prefix.clone(), strategy);
        }
        Ok(mapping)
    }

    pub fn resolver(&self) -> Result<NamespaceResolver> {
        let mut resolver = NamespaceResolver::new(self.namespace_mapping()?)
            .with_extensions(self.extensions.iter().cloned())
            .with_reserved_root(self.reserved_root.clone())
            .with_malformed_policy(self.malformed_query);
        if let Some(root) = &self.root {
            resolver = resolver.with_root(root.clone());
        }
        Ok(resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RewriteConfig::from_json_str("{}").unwrap();
        assert_eq!(config.extensions, vec!["js"]);
        assert_eq!(config.source_type, SourceType::Module);
        assert_eq!(config.cache_directory, Some(PathBuf::from(".cache")));
        assert_eq!(config.reserved_root, "Ext");
        assert_eq!(config.load_style(), LoadStyle::Require);
        assert!(config.entries.is_none());
    }

    #[test]
    fn test_path_specs() {
        let config = RewriteConfig::from_json_str(
            r#"{
                "paths": { "App": "src/app", "Ext": false, "Lib": { "manifest": "lib.json" } },
                "emitImportStatements": true,
                "sourceType": "script",
                "cacheDirectory": null,
                "malformedQuery": "skip",
                "lineEnding": "lf"
            }"#,
        )
        .unwrap();

        let specs: Vec<_> = config.paths.iter().collect();
        assert_eq!(specs[0], (&"App".to_string(), &PathSpec::Directory("src/app".into())));
        assert_eq!(specs[1].1, &PathSpec::Disabled);
        assert_eq!(specs[2].1, &PathSpec::Manifest("lib.json".into()));
        assert_eq!(config.load_style(), LoadStyle::Import);
        assert_eq!(config.source_type, SourceType::Script);
        assert_eq!(config.cache_directory, None);
        assert_eq!(config.malformed_query, MalformedQueryPolicy::Skip);
        assert_eq!(config.line_ending, LineEnding::Lf);
    }

    #[test]
    fn test_true_is_rejected() {
        let err = RewriteConfig::from_json_str(r#"{ "paths": { "App": true } }"#).unwrap_err();
        assert!(err.to_string().contains("not a path mapping"));
    }

    #[test]
    fn test_unknown_keys_and_bad_prefixes_are_rejected() {
        assert!(RewriteConfig::from_json_str(r#"{ "pathz": {} }"#).is_err());
        assert!(RewriteConfig::from_json_str(r#"{ "paths": { "App.": "x" } }"#).is_err());
        assert!(RewriteConfig::from_json_str(r#"{ "extensions": [] }"#).is_err());
    }

    #[test]
    fn test_manifest_paths_are_relative_to_config_file() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("classes.json"),
            r#"{ "Lib.Grid": { "src": "lib/Grid.js" } }"#,
        )
        .unwrap();
        let config_path = temp.path().join("extport.json");
        fs::write(&config_path, r#"{ "paths": { "Lib": { "manifest": "classes.json" } } }"#).unwrap();

        let config = RewriteConfig::from_file(&config_path).unwrap();
        let resolver = config.resolver().unwrap();
        assert_eq!(resolver.resolve("Lib.Grid").unwrap(), vec!["lib/Grid.js"]);
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let config = RewriteConfig::from_json_str(r#"{ "paths": { "Lib": { "manifest": "/nonexistent/classes.json" } } }"#)
            .unwrap();
        assert!(matches!(config.resolver(), Err(RewriteError::Io(_))));
    }
}
