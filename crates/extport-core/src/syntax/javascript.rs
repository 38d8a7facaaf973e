use tree_sitter::Node as TsNode;

use super::{NodeId, SourceParser, SourceType, SyntaxNode, SyntaxTree};
use crate::error::{Result, RewriteError};

/// JavaScript parser using tree-sitter-javascript
pub struct JavaScriptParser {
    parser: tree_sitter::Parser,
}

impl JavaScriptParser {
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .map_err(|e| RewriteError::parse(format!("Failed to set JavaScript language: {e}")))?;

        Ok(Self { parser })
    }

    /// Copy the named nodes of a tree-sitter tree into an arena in pre-order
    fn convert(root: TsNode<'_>) -> SyntaxTree {
        let mut tree = SyntaxTree::new();
        let mut stack: Vec<(TsNode<'_>, Option<NodeId>, Option<&'static str>)> =
            vec![(root, None, None)];

        while let Some((node, parent, field)) = stack.pop() {
            let mut converted = SyntaxNode::new(node.kind(), node.start_byte()..node.end_byte());
            if let Some(field) = field {
                converted = converted.with_field(field);
            }
            let id = tree.push(converted, parent);

            let mut named = Vec::new();
            let mut cursor = node.walk();
            if cursor.goto_first_child() {
                loop {
                    let child = cursor.node();
                    if child.is_named() {
                        named.push((child, cursor.field_name()));
                    }
                    if !cursor.goto_next_sibling() {
                        break;
                    }
                }
            }
            // reversed so the stack pops them in source order
            stack.extend(named.into_iter().rev().map(|(child, field)| (child, Some(id), field)));
        }

        tree
    }

    fn first_error(root: TsNode<'_>) -> Option<TsNode<'_>> {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                return Some(node);
            }
            if !node.has_error() {
                continue;
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        None
    }
}

impl SourceParser for JavaScriptParser {
    fn parse(&mut self, source: &str, source_type: SourceType) -> Result<SyntaxTree> {
        let parsed = self
            .parser
            .parse(source, None)
            .ok_or_else(|| RewriteError::parse("tree-sitter returned no tree"))?;
        let root = parsed.root_node();

        if root.has_error() {
            let message = match Self::first_error(root) {
                Some(node) => {
                    let position = node.start_position();
                    format!(
                        "syntax error at line {}, column {} (offset {})",
                        position.row + 1,
                        position.column + 1,
                        node.start_byte()
                    )
                }
                None => "syntax error".to_string(),
            };
            return Err(RewriteError::parse(message));
        }

        if source_type == SourceType::Script {
            let mut cursor = root.walk();
            let module_item = root
                .named_children(&mut cursor)
                .find(|n| matches!(n.kind(), "import_statement" | "export_statement"));
            if let Some(item) = module_item {
                return Err(RewriteError::parse(format!(
                    "{} is not allowed in a script (line {})",
                    item.kind(),
                    item.start_position().row + 1
                )));
            }
        }

        Ok(Self::convert(root))
    }

    fn name(&self) -> &'static str {
        "tree-sitter-javascript"
    }
}
