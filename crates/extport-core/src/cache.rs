/*!
# Tree Cache

Content-addressed storage for parsed syntax trees.

Entries are keyed by the SHA-256 of the exact input text and the source type it
is parsed as, so an entry can never go stale: changed content simply hashes to a
different key. Failures to read or write the cache are never fatal; they are
logged and treated as misses. That includes entries that decode but describe a
malformed tree.
*/

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::syntax::{SourceType, SyntaxTree};

/// Bumped whenever the serialized tree layout changes
const FORMAT_VERSION: u32 = 1;

/// Content-derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Key for `content` parsed as `source_type`. The same text parsed as a
    /// script and as a module may produce different trees, or fail in one mode.
    pub fn for_source(content: &str, source_type: SourceType) -> Self {
        let tag = match source_type {
            SourceType::Module => "module",
            SourceType::Script => "script",
        };
        let mut hasher = Sha256::new();
        hasher.update(tag.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Cache entry has format version {found}, expected {}", FORMAT_VERSION)]
    VersionMismatch { found: u32 },

    #[error("Cache entry holds a malformed tree: {0}")]
    InvalidTree(String),
}

/// Storage for parsed trees keyed by fingerprint
pub trait TreeCache: Send + Sync {
    fn get(&self, fingerprint: &Fingerprint) -> Option<SyntaxTree>;

    fn put(&self, fingerprint: &Fingerprint, tree: &SyntaxTree);

    /// Whether `put` stores anything at all
    fn is_enabled(&self) -> bool {
        true
    }
}

/// How many entries a cache directory may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    #[default]
    Unbounded,
    /// Keep at most this many entries, dropping the least recently written
    MaxEntries(usize),
}

#[derive(Deserialize)]
struct CachedTree {
    format_version: u32,
    tree: SyntaxTree,
}

/// Write-side twin of [`CachedTree`]; bincode encodes both identically
#[derive(Serialize)]
struct CachedTreeRef<'a> {
    format_version: u32,
    tree: &'a SyntaxTree,
}

/// Flat directory with one file per fingerprint
pub struct DirectoryCache {
    dir: PathBuf,
    policy: EvictionPolicy,
}

impl DirectoryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            policy: EvictionPolicy::Unbounded,
        }
    }

    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(fingerprint.as_str())
    }

    fn read(&self, fingerprint: &Fingerprint) -> Result<SyntaxTree, CacheError> {
        let bytes = fs::read(self.entry_path(fingerprint))?;
        let cached: CachedTree = bincode::deserialize(&bytes)?;
        if cached.format_version != FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                found: cached.format_version,
            });
        }
        cached.tree.validate().map_err(CacheError::InvalidTree)?;
        Ok(cached.tree)
    }

    fn write(&self, fingerprint: &Fingerprint, tree: &SyntaxTree) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let bytes = bincode::serialize(&CachedTreeRef {
            format_version: FORMAT_VERSION,
            tree,
        })?;

        // Rename into place so readers never see a partial entry
        let target = self.entry_path(fingerprint);
        let staging = self
            .dir
            .join(format!(".{}.{}.tmp", fingerprint, std::process::id()));
        fs::write(&staging, bytes)?;
        if let Err(e) = fs::rename(&staging, &target) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }

    /// Fingerprint files currently stored, with their modification times
    fn entries(&self) -> Result<Vec<(PathBuf, std::time::SystemTime)>, CacheError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                entries.push((entry.path(), metadata.modified()?));
            }
        }
        Ok(entries)
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply the eviction policy, returning how many entries were removed
    pub fn prune(&self) -> Result<usize, CacheError> {
        let max = match self.policy {
            EvictionPolicy::Unbounded => return Ok(0),
            EvictionPolicy::MaxEntries(max) => max,
        };

        let mut entries = self.entries()?;
        if entries.len() <= max {
            return Ok(0);
        }
        entries.sort_by_key(|(_, modified)| *modified);
        let excess = entries.len() - max;
        for (path, _) in entries.iter().take(excess) {
            fs::remove_file(path)?;
        }
        debug!(removed = excess, dir = %self.dir.display(), "Pruned tree cache");
        Ok(excess)
    }
}

impl TreeCache for DirectoryCache {
    fn get(&self, fingerprint: &Fingerprint) -> Option<SyntaxTree> {
        match self.read(fingerprint) {
            Ok(tree) => Some(tree),
            Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(%fingerprint, error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    fn put(&self, fingerprint: &Fingerprint, tree: &SyntaxTree) {
        if let Err(e) = self.write(fingerprint, tree) {
            warn!(%fingerprint, error = %e, "Failed to write cache entry");
            return;
        }
        if let Err(e) = self.prune() {
            warn!(error = %e, "Failed to prune tree cache");
        }
    }
}

/// In-process cache, mostly useful for tests and long-running hosts
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<Fingerprint, SyntaxTree>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TreeCache for MemoryCache {
    fn get(&self, fingerprint: &Fingerprint) -> Option<SyntaxTree> {
        self.entries.lock().get(fingerprint).cloned()
    }

    fn put(&self, fingerprint: &Fingerprint, tree: &SyntaxTree) {
        self.entries.lock().insert(fingerprint.clone(), tree.clone());
    }
}

/// A cache that never stores anything
pub struct NoCache;

impl TreeCache for NoCache {
    fn get(&self, _fingerprint: &Fingerprint) -> Option<SyntaxTree> {
        None
    }

    fn put(&self, _fingerprint: &Fingerprint, _tree: &SyntaxTree) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Hit/miss counters observed by the class parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}
