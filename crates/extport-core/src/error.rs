use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while rewriting a source file
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Unable to resolve {name}. Check the \"paths\" option for a prefix matching this namespace")]
    UnresolvedNamespace { name: String },

    #[error("Unable to find file {candidate} with any of the extensions [{}]", extensions.join(", "))]
    FileNotFound {
        candidate: String,
        extensions: Vec<String>,
    },

    #[error("Malformed query result for {name} (prefix {prefix}): {reason}")]
    MalformedQueryResult {
        prefix: String,
        name: String,
        reason: String,
    },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid class manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RewriteError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error came out of namespace resolution
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedNamespace { .. }
                | Self::FileNotFound { .. }
                | Self::MalformedQueryResult { .. }
        )
    }
}

/// Result type for rewrite operations
pub type Result<T> = std::result::Result<T, RewriteError>;
