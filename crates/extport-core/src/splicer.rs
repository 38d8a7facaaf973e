/*!
# Splicer

Rewrites the original text from a [`Collection`]: cut regions are deleted,
then the generated load statements are inserted at the start of the program.

All names are resolved before the text is touched, so a resolution failure
leaves no partial result behind.
*/

use indexmap::IndexSet;
use serde::Deserialize;
use tracing::warn;

use crate::collector::{Collection, Cut};
use crate::error::Result;
use crate::resolver::NamespaceResolver;

/// Syntax of the generated load statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStyle {
    /// `require('path');`, deferred names wrapped in one `setTimeout` block
    #[default]
    Require,
    /// `import 'path';`, deferred names emitted as ordinary imports
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Crlf,
    Lf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Crlf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

pub struct Splicer<'r> {
    resolver: &'r NamespaceResolver,
    style: LoadStyle,
    line_ending: LineEnding,
}

impl<'r> Splicer<'r> {
    pub fn new(resolver: &'r NamespaceResolver) -> Self {
        Self {
            resolver,
            style: LoadStyle::default(),
            line_ending: LineEnding::default(),
        }
    }

    pub fn style(mut self, style: LoadStyle) -> Self {
        self.style = style;
        self
    }

    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Produce the rewritten text. `insert_at` is the program start offset.
    pub fn splice(&self, source: &str, insert_at: usize, collection: &Collection) -> Result<String> {
        let block = self.load_block(collection)?;

        let mut text = apply_cuts(source, &collection.cuts);
        if !block.is_empty() {
            let mut at = insert_at.min(text.len());
            while !text.is_char_boundary(at) {
                at -= 1;
            }
            text.insert_str(at, &block);
        }
        Ok(text)
    }

    /// Every load statement, in emission order, as one block of text
    pub fn load_block(&self, collection: &Collection) -> Result<String> {
        let mut emitted: IndexSet<String> = IndexSet::new();
        let mut block = String::new();

        for (_, names) in collection.groups.sync_buckets() {
            for name in names {
                for path in self.resolver.resolve(name)? {
                    if !path.is_empty() && emitted.insert(path.clone()) {
                        block.push_str(&self.statement(&path));
                    }
                }
            }
        }

        let mut deferred = String::new();
        for name in collection.groups.deferred() {
            for path in self.resolver.resolve(name)? {
                if !path.is_empty() && emitted.insert(path.clone()) {
                    deferred.push_str(&self.statement(&path));
                }
            }
        }

        if !deferred.is_empty() {
            match self.style {
                // the wrapper always breaks with \n; only the statements
                // inside follow the configured line ending
                LoadStyle::Require => {
                    block.push_str(&format!("setTimeout(function() {{\n {deferred} }});\n"));
                }
                LoadStyle::Import => block.push_str(&deferred),
            }
        }

        Ok(block)
    }

    /// One load statement for `path`, including its line ending
    pub fn statement(&self, path: &str) -> String {
        let literal = js_string_literal(path);
        let nl = self.line_ending.as_str();
        match self.style {
            LoadStyle::Require => format!("require({literal});{nl}"),
            LoadStyle::Import => format!("import {literal};{nl}"),
        }
    }
}

/// Delete every cut, last first, dropping a separator the cut left dangling
pub fn apply_cuts(source: &str, cuts: &[Cut]) -> String {
    let mut ordered = cuts.to_vec();
    ordered.sort_by(|a, b| b.end.cmp(&a.end));

    let mut text = source.to_string();
    for cut in ordered {
        let (Some(head), Some(tail)) = (text.get(..cut.start), text.get(cut.end..)) else {
            warn!(start = cut.start, end = cut.end, "Skipping cut outside the text");
            continue;
        };
        if cut.start > cut.end {
            warn!(start = cut.start, end = cut.end, "Skipping inverted cut");
            continue;
        }
        text = format!("{head}{}", strip_leading_separator(tail));
    }
    text
}

/// Remove leading whitespace plus one `,` when the text starts with them
fn strip_leading_separator(tail: &str) -> &str {
    tail.trim_start().strip_prefix(',').unwrap_or(tail)
}

/// Single-quoted JavaScript string literal
fn js_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('\'');
    for c in value.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '\'' => literal.push_str("\\'"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\u{2028}' => literal.push_str("\\u2028"),
            '\u{2029}' => literal.push_str("\\u2029"),
            c => literal.push(c),
        }
    }
    literal.push('\'');
    literal
}
