//! Query execution: run a compiled query against a target file and collect
//! the positions captured by the root label.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use streaming_iterator::StreamingIterator;
use tracing::debug;
use tree_sitter::{Query, QueryCursor};

use crate::error::{Error, Result};
use crate::extract::WILDCARD_MARKER;
use crate::language::Language;
use crate::parse::ParseTree;
use crate::query::ROOT_CAPTURE;

/// One resolved occurrence of a pattern in a target file.
///
/// `row` is 1-based, `column` is 0-based, matching editor jump conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub row: usize,
    pub column: usize,
    pub text: String,
}

/// Run `query` against the file at `path`.
pub fn resolve_matches(path: &Utf8Path, query: &str) -> Result<Vec<Match>> {
    let language = Language::detect(path)?;
    let contents = std::fs::read_to_string(path.as_std_path())?;
    resolve_matches_in(language, &contents, query)
}

/// Run `query` against in-memory `contents`, returning every root-capture
/// occurrence in source order. An empty result set is an error so callers
/// can distinguish "pattern absent" from "pattern everywhere".
pub fn resolve_matches_in(language: Language, contents: &str, query: &str) -> Result<Vec<Match>> {
    let tree = ParseTree::parse(contents.to_string(), language)?;
    let ts_language = language.tree_sitter_language();
    let compiled =
        Query::new(&ts_language, query).map_err(|e| Error::InvalidQuery(e.to_string()))?;

    let mut matches = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut iter = cursor.matches(&compiled, tree.root_node(), tree.source_bytes());
    while let Some(m) = iter.next() {
        for capture in m.captures {
            let name = compiled
                .capture_names()
                .get(capture.index as usize)
                .copied()
                .unwrap_or_default();
            if name != ROOT_CAPTURE {
                continue;
            }
            let position = capture.node.start_position();
            let text = capture_text(contents, capture.node, position.row);
            matches.push(Match {
                row: position.row + 1,
                column: position.column,
                text,
            });
        }
    }

    if matches.is_empty() {
        debug!(query, "query produced no matches");
        return Err(Error::NoMatch);
    }
    Ok(matches)
}

/// Pick the display text for a matched node. Lines still carrying a
/// wildcard marker show the whole source line so the marker stays visible;
/// multi-line nodes are re-joined with per-line trailing whitespace
/// stripped; everything else is the node's trimmed text.
fn capture_text(contents: &str, node: tree_sitter::Node<'_>, row: usize) -> String {
    let line = contents.lines().nth(row).unwrap_or_default();
    if line.contains(WILDCARD_MARKER) {
        return line.trim().to_string();
    }
    let text = &contents[node.byte_range()];
    if text.contains('\n') {
        text.lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = r#"package sample

type Env struct{}

func (e *Env) Inst() *Env { return e }

func (e *Env) Foo() {}

func useIt(e *Env) {
	e.Inst().Foo()
}

func useOther(f *Env) {
	f.Inst().Foo()
}
"#;

    const EXACT_QUERY: &str = r#"(call_expression function: (selector_expression operand: (call_expression function: (selector_expression operand: (identifier) @name0 (#eq? @name0 "e") field: (field_identifier) @field1 (#eq? @field1 "Inst")) arguments: (argument_list)) field: (field_identifier) @field2 (#eq? @field2 "Foo")) arguments: (argument_list)) @x"#;

    const WILDCARD_QUERY: &str = r#"(call_expression function: (selector_expression operand: (call_expression function: (selector_expression operand: (identifier) field: (field_identifier) @field0 (#eq? @field0 "Inst")) arguments: (argument_list)) field: (field_identifier) @field1 (#eq? @field1 "Foo")) arguments: (argument_list)) @x"#;

    #[test]
    fn test_exact_query_matches_single_receiver() {
        let matches = resolve_matches_in(Language::Go, TARGET, EXACT_QUERY).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].row, 10);
        assert_eq!(matches[0].column, 1);
        assert_eq!(matches[0].text, "e.Inst().Foo()");
    }

    #[test]
    fn test_wildcard_query_matches_all_receivers() {
        let matches = resolve_matches_in(Language::Go, TARGET, WILDCARD_QUERY).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, "e.Inst().Foo()");
        assert_eq!(matches[1].text, "f.Inst().Foo()");
        assert!(matches[0].row < matches[1].row);
    }

    #[test]
    fn test_compiled_chained_pattern_matches_end_to_end() {
        // Chained calls put several distinct names under predicate in one
        // pattern; each needs its own capture so the predicates are checked
        // independently.
        let pattern = "package main\n\nfunc example() {\n\t//asq_start\n\te.Inst().Foo()\n\t//asq_end\n}\n";
        let query =
            crate::extract::extract_query_from_source(pattern, Language::Go).unwrap();
        let matches = resolve_matches_in(Language::Go, TARGET, &query).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].row, 10);
        assert_eq!(matches[0].text, "e.Inst().Foo()");
    }

    #[test]
    fn test_no_match_is_an_error() {
        let query = r#"(call_expression function: (selector_expression operand: (identifier) @name0 (#eq? @name0 "nothing") field: (field_identifier) @field1 (#eq? @field1 "Here")) arguments: (argument_list)) @x"#;
        let err = resolve_matches_in(Language::Go, TARGET, query).unwrap_err();
        assert!(matches!(err, Error::NoMatch));
    }

    #[test]
    fn test_invalid_query_is_reported() {
        let err = resolve_matches_in(Language::Go, TARGET, "(not_a_node_kind) @x").unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_multiline_match_strips_trailing_whitespace() {
        let source = "package sample\n\nfunc f() {\t\n\treturn\t\n}\t\n";
        let query = "(function_declaration) @x";
        let matches = resolve_matches_in(Language::Go, source, query).unwrap();
        assert_eq!(matches.len(), 1);
        for line in matches[0].text.lines() {
            assert_eq!(line, line.trim_end());
        }
    }

    #[test]
    fn test_resolve_from_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.go");
        std::fs::write(&path, TARGET).unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(path).unwrap();
        let matches = resolve_matches(&path, EXACT_QUERY).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].row, 10);
    }

    #[test]
    fn test_bare_return_matches_every_return() {
        let source = "package sample\n\nfunc a() { return }\n\nfunc b() {\n\treturn\n}\n";
        let matches = resolve_matches_in(Language::Go, source, "(return_statement) @x").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, "return");
    }
}
