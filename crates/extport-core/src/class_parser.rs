/*!
# Class Parser

Rewrites one source text: fingerprint, cached or fresh parse, collection,
resolution and splicing.
*/

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheStats, DirectoryCache, EvictionPolicy, Fingerprint, NoCache, TreeCache};
use crate::collector::Collector;
use crate::config::RewriteConfig;
use crate::entry::{base_entries, entries_by_name, Entry};
use crate::error::Result;
use crate::resolver::NamespaceResolver;
use crate::splicer::{LineEnding, LoadStyle, Splicer};
use crate::syntax::{JavaScriptParser, ParseTree, SourceParser, SourceType, SyntaxTree};

pub struct ClassParser {
    resolver: NamespaceResolver,
    entries: Vec<Box<dyn Entry>>,
    parser: Mutex<Box<dyn SourceParser>>,
    cache: Box<dyn TreeCache>,
    source_type: SourceType,
    style: LoadStyle,
    line_ending: LineEnding,
    stats: Mutex<CacheStats>,
}

impl ClassParser {
    /// Build a parser from configuration, loading manifests and opening the cache
    pub fn new(config: &RewriteConfig) -> Result<Self> {
        let entries = match &config.entries {
            Some(names) => entries_by_name(names.as_slice())?,
            None => base_entries(),
        };

        let mut builder = Self::builder(config.resolver()?)
            .entries(entries)
            .source_type(config.source_type)
            .imports(config.emit_import_statements)
            .line_ending(config.line_ending);

        if let Some(dir) = &config.cache_directory {
            let policy = config
                .cache_max_entries
                .map(EvictionPolicy::MaxEntries)
                .unwrap_or_default();
            builder = builder.cache(DirectoryCache::new(dir).with_policy(policy));
        }

        builder.build()
    }

    /// Start a parser around `resolver` with every built-in entry and no cache
    pub fn builder(resolver: NamespaceResolver) -> ClassParserBuilder {
        ClassParserBuilder {
            resolver,
            entries: None,
            parser: None,
            cache: Box::new(NoCache),
            source_type: SourceType::default(),
            style: LoadStyle::default(),
            line_ending: LineEnding::default(),
        }
    }

    /// Rewrite `content`, returning the new source text
    pub fn parse(&self, content: &str) -> Result<String> {
        let syntax = self.syntax_tree(content)?;
        let insert_at = syntax.program_start();
        let tree = ParseTree::new(syntax, content);

        let collection = Collector::new(&self.entries).collect(&tree);
        if collection.groups.is_empty() && collection.cuts.is_empty() {
            return Ok(content.to_string());
        }

        Splicer::new(&self.resolver)
            .style(self.style)
            .line_ending(self.line_ending)
            .splice(content, insert_at, &collection)
    }

    fn syntax_tree(&self, content: &str) -> Result<SyntaxTree> {
        let fingerprint = Fingerprint::for_source(content, self.source_type);
        if let Some(tree) = self.cache.get(&fingerprint) {
            debug!(%fingerprint, "Tree cache hit");
            self.stats.lock().hits += 1;
            return Ok(tree);
        }

        debug!(%fingerprint, "Tree cache miss");
        self.stats.lock().misses += 1;

        let tree = self.parser.lock().parse(content, self.source_type)?;
        if self.cache.is_enabled() {
            self.cache.put(&fingerprint, &tree);
            self.stats.lock().writes += 1;
        }
        Ok(tree)
    }

    pub fn cache_stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    pub fn resolver(&self) -> &NamespaceResolver {
        &self.resolver
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name())
    }
}

pub struct ClassParserBuilder {
    resolver: NamespaceResolver,
    entries: Option<Vec<Box<dyn Entry>>>,
    parser: Option<Box<dyn SourceParser>>,
    cache: Box<dyn TreeCache>,
    source_type: SourceType,
    style: LoadStyle,
    line_ending: LineEnding,
}

impl ClassParserBuilder {
    pub fn entries(mut self, entries: Vec<Box<dyn Entry>>) -> Self {
        self.entries = Some(entries);
        self
    }

    /// Replace the tree-sitter JavaScript parser
    pub fn parser<P: SourceParser + 'static>(mut self, parser: P) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    pub fn cache<C: TreeCache + 'static>(mut self, cache: C) -> Self {
        self.cache = Box::new(cache);
        self
    }

    pub fn no_cache(self) -> Self {
        self.cache(NoCache)
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    /// Emit `import` statements instead of `require` calls
    pub fn imports(mut self, imports: bool) -> Self {
        self.style = if imports {
            LoadStyle::Import
        } else {
            LoadStyle::Require
        };
        self
    }

    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn build(self) -> Result<ClassParser> {
        let parser = match self.parser {
            Some(parser) => parser,
            None => Box::new(JavaScriptParser::new()?),
        };
        Ok(ClassParser {
            resolver: self.resolver,
            entries: self.entries.unwrap_or_else(base_entries),
            parser: Mutex::new(parser),
            cache: self.cache,
            source_type: self.source_type,
            style: self.style,
            line_ending: self.line_ending,
            stats: Mutex::new(CacheStats::default()),
        })
    }
}
