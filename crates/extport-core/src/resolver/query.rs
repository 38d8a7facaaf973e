use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, RewriteError};

/// One class as reported by a query: its source plus companion overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub src: String,
    pub overrides: Vec<String>,
}

impl ClassRecord {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            overrides: Vec::new(),
        }
    }

    pub fn with_overrides<I, S>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides.extend(overrides.into_iter().map(Into::into));
        self
    }
}

/// What a query returned for one symbolic name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAnswer {
    /// One class; resolves to its source followed by its overrides
    Class(ClassRecord),
    /// Several classes; resolves to one source per class
    Classes(Vec<ClassRecord>),
    /// The backing data had neither shape
    Malformed(String),
}

/// A resolver that knows class locations by name
pub trait ClassQuery: Send + Sync {
    fn query(&self, name: &str) -> QueryAnswer;
}

impl<F> ClassQuery for F
where
    F: Fn(&str) -> QueryAnswer + Send + Sync,
{
    fn query(&self, name: &str) -> QueryAnswer {
        self(name)
    }
}

/// Class query backed by a JSON manifest of the form
///
/// ```json
/// {
///   "Lib.grid.Panel": { "src": "lib/grid/Panel.js", "overrides": ["lib/overrides/Panel.js"] },
///   "Lib.all": [ { "src": "lib/a.js" }, { "src": "lib/b.js" } ]
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManifestQuery {
    classes: Map<String, Value>,
}

impl ManifestQuery {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| RewriteError::Manifest {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_value(value).map_err(|reason| {
            RewriteError::config(format!("{}: {reason}", path.display()))
        })
    }

    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Object(classes) => Ok(Self { classes }),
            other => Err(format!(
                "class manifest must be a JSON object, found {}",
                json_type(&other)
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassQuery for ManifestQuery {
    fn query(&self, name: &str) -> QueryAnswer {
        match self.classes.get(name) {
            None => QueryAnswer::Malformed(format!("{name} is not listed in the manifest")),
            Some(Value::Object(record)) => match class_record(record) {
                Ok(record) => QueryAnswer::Class(record),
                Err(reason) => QueryAnswer::Malformed(reason),
            },
            Some(Value::Array(items)) => {
                let records: std::result::Result<Vec<_>, _> = items
                    .iter()
                    .map(|item| match item {
                        Value::Object(record) => class_record(record),
                        other => Err(format!("list element is {}", json_type(other))),
                    })
                    .collect();
                match records {
                    Ok(records) => QueryAnswer::Classes(records),
                    Err(reason) => QueryAnswer::Malformed(reason),
                }
            }
            Some(other) => QueryAnswer::Malformed(format!(
                "expected an object or a list, found {}",
                json_type(other)
            )),
        }
    }
}

fn class_record(record: &Map<String, Value>) -> std::result::Result<ClassRecord, String> {
    let src = record
        .get("src")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing string \"src\"".to_string())?;
    let overrides = match record.get("overrides") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("override is {}", json_type(item)))
            })
            .collect::<std::result::Result<_, _>>()?,
        Some(other) => return Err(format!("\"overrides\" is {}", json_type(other))),
    };
    Ok(ClassRecord {
        src: src.to_string(),
        overrides,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
