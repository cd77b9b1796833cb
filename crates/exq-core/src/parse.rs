//! Parse tree wrapper that holds a parsed file and its source.

use tree_sitter::{Node, Parser, Tree};

use crate::error::{Error, Result};
use crate::language::Language;

/// A parsed source file. The tree and its source live and die together; every
/// operation that needs an AST parses its own file and discards the tree when
/// it is done.
pub struct ParseTree {
    tree: Tree,
    source: String,
    language: Language,
}

impl ParseTree {
    /// Parse source code with the grammar for `language`.
    pub fn parse(source: String, language: Language) -> Result<Self> {
        let mut parser = Parser::new();
        let ts_language = language.tree_sitter_language();
        parser
            .set_language(&ts_language)
            .map_err(|e| Error::Parse(format!("failed to set language: {e}")))?;
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| Error::Parse("failed to parse source".into()))?;
        Ok(Self {
            tree,
            source,
            language,
        })
    }

    /// Get the root node of the parse tree.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Get the source code.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the source code as bytes, for query execution.
    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// Get the language used for parsing.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Source text of a node in this tree.
    pub fn text_of(&self, node: Node) -> &str {
        &self.source[node.start_byte()..node.end_byte()]
    }
}
