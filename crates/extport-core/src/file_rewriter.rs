/*!
# FileRewriter - File-based Rewriting

Applies a [`ClassParser`] to single files or whole source trees. Directory runs
mirror the source layout under the output directory and keep going past
per-file failures, which are collected in the [`RewriteSummary`].
*/

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use crate::class_parser::ClassParser;

pub struct FileRewriter {
    parser: ClassParser,
    source_extensions: Vec<String>,
}

impl FileRewriter {
    pub fn new(parser: ClassParser) -> Self {
        Self {
            parser,
            source_extensions: vec!["js".to_string()],
        }
    }

    /// Set the file extensions picked up by directory runs
    pub fn source_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn parser(&self) -> &ClassParser {
        &self.parser
    }

    /// Rewrite the contents of one file without writing anything
    pub fn rewrite_source<P: AsRef<Path>>(&self, source_file: P) -> Result<String> {
        let path = source_file.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        self.parser
            .parse(&content)
            .with_context(|| format!("Failed to rewrite {}", path.display()))
    }

    /// Rewrite one file into `output_file`
    pub fn rewrite_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source_file: P,
        output_file: Q,
    ) -> Result<RewriteSummary> {
        let source_path = source_file.as_ref();
        let output_path = output_file.as_ref();

        let original = fs::read_to_string(source_path)
            .with_context(|| format!("Failed to read {}", source_path.display()))?;
        let rewritten = self
            .parser
            .parse(&original)
            .with_context(|| format!("Failed to rewrite {}", source_path.display()))?;

        let changed = rewritten != original;
        // An unchanged file rewritten in place is left alone
        if changed || !same_file(source_path, output_path) {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(output_path, &rewritten)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
        }
        debug!(source = %source_path.display(), output = %output_path.display(), changed, "Rewrote file");

        Ok(RewriteSummary {
            files_processed: 1,
            files_rewritten: u64::from(changed),
            errors: Vec::new(),
        })
    }

    /// Rewrite a file or every source file under a directory in place
    pub fn rewrite_in_place<P: AsRef<Path>>(&self, path: P) -> Result<RewriteSummary> {
        let path = path.as_ref();
        if path.is_dir() {
            self.rewrite_directory(path, path)
        } else {
            self.rewrite_file(path, path)
        }
    }

    /// Rewrite all source files under `source_dir` into `output_dir`
    pub fn rewrite_directory<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source_dir: P,
        output_dir: Q,
    ) -> Result<RewriteSummary> {
        let source_path = source_dir.as_ref();
        let output_path = output_dir.as_ref();

        if !source_path.is_dir() {
            return Err(anyhow!("Source directory does not exist: {}", source_path.display()));
        }
        fs::create_dir_all(output_path)?;

        let mut summary = RewriteSummary::new();
        let skip = (source_path != output_path).then(|| output_path.to_path_buf());
        self.rewrite_directory_recursive(source_path, source_path, output_path, skip.as_deref(), &mut summary)?;

        info!(
            processed = summary.files_processed,
            rewritten = summary.files_rewritten,
            errors = summary.errors.len(),
            "Rewrote {}",
            source_path.display()
        );
        Ok(summary)
    }

    fn rewrite_directory_recursive(
        &self,
        current_dir: &Path,
        source_root: &Path,
        output_root: &Path,
        skip: Option<&Path>,
        summary: &mut RewriteSummary,
    ) -> Result<()> {
        let mut entries = fs::read_dir(current_dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<PathBuf>>>()?;
        entries.sort();

        for path in entries {
            if is_hidden(&path) || skip.is_some_and(|skip| path == skip) {
                continue;
            }

            if path.is_dir() {
                self.rewrite_directory_recursive(&path, source_root, output_root, skip, summary)?;
            } else if self.should_process_file(&path) {
                let output_file = output_root.join(path.strip_prefix(source_root)?);
                match self.rewrite_file(&path, &output_file) {
                    Ok(file_summary) => summary.merge(file_summary),
                    Err(e) => {
                        let message = format!("{}: {e:#}", path.display());
                        warn!(error = %message, "Skipping file");
                        summary.files_processed += 1;
                        summary.errors.push(message);
                    }
                }
            }
        }
        Ok(())
    }

    fn should_process_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.source_extensions.contains(&ext))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Summary of a rewrite run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewriteSummary {
    pub files_processed: u64,
    /// Files whose output differs from their input
    pub files_rewritten: u64,
    pub errors: Vec<String>,
}

impl RewriteSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: RewriteSummary) {
        self.files_processed += other.files_processed;
        self.files_rewritten += other.files_rewritten;
        self.errors.extend(other.errors);
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{NamespaceMapping, NamespaceResolver};

    fn rewriter(root: &Path) -> FileRewriter {
        let resolver = NamespaceResolver::new(NamespaceMapping::new().directory("App", "src/app"))
            .with_root(root);
        let parser = ClassParser::builder(resolver)
            .line_ending(crate::splicer::LineEnding::Lf)
            .build()
            .unwrap();
        FileRewriter::new(parser)
    }

    #[test]
    fn test_should_process_file() {
        let temp = tempfile::tempdir().unwrap();
        let rewriter = rewriter(temp.path()).source_extensions([".JS", "mjs"]);
        assert!(rewriter.should_process_file(Path::new("a/b.js")));
        assert!(rewriter.should_process_file(Path::new("a/b.MJS")));
        assert!(!rewriter.should_process_file(Path::new("a/b.json")));
        assert!(!rewriter.should_process_file(Path::new("Makefile")));
    }

    #[test]
    fn test_unchanged_file_in_place_is_not_rewritten() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("plain.js");
        fs::write(&file, "var a = 1;").unwrap();

        let summary = rewriter(temp.path()).rewrite_in_place(&file).unwrap();
        assert_eq!(summary.files_processed, 1);
        assert_eq!(summary.files_rewritten, 0);
        assert_eq!(fs::read_to_string(&file).unwrap(), "var a = 1;");
    }

    #[test]
    fn test_missing_source_directory() {
        let temp = tempfile::tempdir().unwrap();
        let err = rewriter(temp.path())
            .rewrite_directory(temp.path().join("nope"), temp.path().join("out"))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_summary_merge() {
        let mut summary = RewriteSummary::new();
        summary.merge(RewriteSummary {
            files_processed: 2,
            files_rewritten: 1,
            errors: vec!["bad".to_string()],
        });
        assert_eq!(summary.files_processed, 2);
        assert!(!summary.success());
    }
}
