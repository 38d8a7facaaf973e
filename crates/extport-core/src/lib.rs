//! # Extport Core
//!
//! Rewrites Ext JS class-system sources into module-loader form:
//! - JavaScript parsing into an immutable syntax tree
//! - Entry patterns that recognise class-system dependency declarations
//! - A collector that turns matches into cuts and dependency groups
//! - Namespace resolution from class names to file paths
//! - A splicer that deletes the cuts and prepends load statements
//! - A content-addressed cache of parsed trees
//!
//! The [`ClassParser`] ties these together for one source text at a time;
//! [`FileRewriter`] applies it to files and directories.

#![warn(clippy::all)]

pub mod cache;
pub mod class_parser;
pub mod collector;
pub mod config;
pub mod entry;
pub mod error;
pub mod file_rewriter;
pub mod resolver;
pub mod splicer;
pub mod syntax;

// Re-export commonly used types
pub use cache::{CacheStats, DirectoryCache, EvictionPolicy, Fingerprint, MemoryCache, NoCache, TreeCache};
pub use class_parser::{ClassParser, ClassParserBuilder};
pub use collector::{Collection, Collector, Cut, DependencyGroups};
pub use config::{PathSpec, RewriteConfig};
pub use entry::{base_entries, entries_by_name, Action, Entry, FnEntry, ENTRY_NAMES};
pub use error::{Result, RewriteError};
pub use file_rewriter::{FileRewriter, RewriteSummary};
pub use resolver::{
    ClassQuery, ClassRecord, MalformedQueryPolicy, ManifestQuery, NamespaceMapping,
    NamespaceResolver, QueryAnswer, Strategy,
};
pub use splicer::{LineEnding, LoadStyle, Splicer};
pub use syntax::{JavaScriptParser, Node, ParseTree, SourceParser, SourceType, SyntaxTree};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for extport components
pub fn init_tracing() {
    init_tracing_with("extport_core=info");
}

/// Initialize tracing with a fallback directive used when `RUST_LOG` is unset
pub fn init_tracing_with(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    // A subscriber may already be installed by the host; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
