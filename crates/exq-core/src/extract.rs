//! Pattern extraction: locate the marked region of an annotated source
//! file, collect its wildcard intervals, and compile the enclosed node into
//! a tree-sitter query string.

use camino::Utf8Path;
use tracing::debug;
use tree_sitter::Node;

use crate::error::{Error, Result};
use crate::intervals::WildcardIntervals;
use crate::language::Language;
use crate::parse::ParseTree;
use crate::query::{build_node, compile_query, PatternContext};

/// Normalized text of the comment opening a pattern region.
pub const START_MARKER: &str = "asq_start";
/// Normalized text of the comment closing a pattern region.
pub const END_MARKER: &str = "asq_end";
/// Raw comment text marking the next syntactic entity as a wildcard.
pub const WILDCARD_MARKER: &str = "/***/";

/// Compile the pattern annotated in the file at `path` into a query string.
pub fn extract_query(path: &Utf8Path) -> Result<String> {
    let language = Language::detect(path)?;
    let source = std::fs::read_to_string(path.as_std_path())?;
    extract_query_from_source(&source, language)
}

/// Compile the pattern annotated in `source` into a query string.
pub fn extract_query_from_source(source: &str, language: Language) -> Result<String> {
    let tree = ParseTree::parse(source.to_string(), language)?;
    let root = tree.root_node();

    let region = locate_region(root, tree.source())?;
    debug!(start = region.start, end = region.end, "pattern region located");

    let pattern = find_pattern_node(root, region.start, region.end)
        .ok_or(Error::NoPatternNode)?;

    let mut ctx = PatternContext::new(region.intervals);
    let node = build_node(pattern, tree.source(), &mut ctx);
    Ok(compile_query(&node))
}

struct Region {
    start: usize,
    end: usize,
    intervals: WildcardIntervals,
}

/// Strip comment delimiters and surrounding whitespace so `//asq_start`,
/// `/* asq_start */` and friends all normalize to the bare marker word.
fn normalize_comment(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix("//").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("/*").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("*/").unwrap_or(trimmed);
    trimmed.trim()
}

/// Scan comments in source order for the boundary markers, feeding wildcard
/// markers between them into the interval tracker.
fn locate_region(root: Node<'_>, source: &str) -> Result<Region> {
    let mut intervals = WildcardIntervals::new();
    let mut start = None;
    let mut end = None;
    let mut collecting = false;

    for comment in comments_in_order(root) {
        let raw = &source[comment.byte_range()];
        match normalize_comment(raw) {
            START_MARKER => {
                start = Some(comment.end_byte());
                collecting = true;
                continue;
            }
            END_MARKER => {
                end = Some(comment.start_byte());
                break;
            }
            _ => {}
        }
        if collecting && raw == WILDCARD_MARKER {
            intervals.add(comment.start_byte(), comment.end_byte());
        }
    }

    match (start, end) {
        (Some(start), Some(end)) => {
            intervals.close(end);
            Ok(Region {
                start,
                end,
                intervals,
            })
        }
        _ => Err(Error::MarkersNotFound),
    }
}

fn comments_in_order(root: Node<'_>) -> Vec<Node<'_>> {
    let mut comments = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "comment" {
            comments.push(node);
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    comments
}

/// Pre-order search for the first statement or declaration whose span lies
/// inside the region. Expression statements yield their inner expression;
/// return statements and function declarations are taken whole.
fn find_pattern_node(root: Node<'_>, start: usize, end: usize) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.start_byte() >= start && node.end_byte() <= end {
            match node.kind() {
                "expression_statement" => {
                    return node.named_child(0).or(Some(node));
                }
                "return_statement" | "function_declaration" | "method_declaration" => {
                    return Some(node);
                }
                _ => {}
            }
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> Result<String> {
        extract_query_from_source(source, Language::Go)
    }

    #[test]
    fn test_exact_match_chained_call() {
        let source = r#"package main

func example() {
	//asq_start
	e.Inst().Foo()
	//asq_end
}
"#;
        assert_eq!(
            extract(source).unwrap(),
            r#"(call_expression function: (selector_expression operand: (call_expression function: (selector_expression operand: (identifier) @name0 (#eq? @name0 "e") field: (field_identifier) @field1 (#eq? @field1 "Inst")) arguments: (argument_list)) field: (field_identifier) @field2 (#eq? @field2 "Foo")) arguments: (argument_list)) @x"#
        );
    }

    #[test]
    fn test_wildcard_receiver() {
        let source = r#"package main

func example() {
	//asq_start
	/***/e.Inst().Foo()
	//asq_end
}
"#;
        assert_eq!(
            extract(source).unwrap(),
            r#"(call_expression function: (selector_expression operand: (call_expression function: (selector_expression operand: (identifier) field: (field_identifier) @field0 (#eq? @field0 "Inst")) arguments: (argument_list)) field: (field_identifier) @field1 (#eq? @field1 "Foo")) arguments: (argument_list)) @x"#
        );
    }

    #[test]
    fn test_bare_return() {
        let source = r#"package main

func example() {
	//asq_start
	return
	//asq_end
}
"#;
        assert_eq!(extract(source).unwrap(), "(return_statement) @x");
    }

    #[test]
    fn test_return_true() {
        let source = r#"package main

func example() bool {
	//asq_start
	return true
	//asq_end
}
"#;
        assert_eq!(
            extract(source).unwrap(),
            "(return_statement (expression_list (true))) @x"
        );
    }

    #[test]
    fn test_function_declaration_single_return() {
        let source = r#"package example1
//asq_start
func Example() {
	return
}
//asq_end
"#;
        assert_eq!(
            extract(source).unwrap(),
            r#"(function_declaration name: (identifier) @name0 (#eq? @name0 "Example") body: (return_statement)) @x"#
        );
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let source = r#"package main

func example() {
	//asq_start
	/***/e.Inst().Foo()
	//asq_end
}
"#;
        assert_eq!(extract(source).unwrap(), extract(source).unwrap());
    }

    #[test]
    fn test_block_comment_markers_accepted() {
        let source = r#"package main

func example() {
	/* asq_start */
	e.Close()
	/* asq_end */
}
"#;
        assert_eq!(
            extract(source).unwrap(),
            r#"(call_expression function: (selector_expression operand: (identifier) @name0 (#eq? @name0 "e") field: (field_identifier) @field1 (#eq? @field1 "Close")) arguments: (argument_list)) @x"#
        );
    }

    #[test]
    fn test_missing_markers() {
        let source = "package main\n\nfunc example() {}\n";
        assert!(matches!(extract(source), Err(Error::MarkersNotFound)));
    }

    #[test]
    fn test_missing_end_marker() {
        let source = r#"package main

func example() {
	//asq_start
	e.Close()
}
"#;
        assert!(matches!(extract(source), Err(Error::MarkersNotFound)));
    }

    #[test]
    fn test_empty_region() {
        let source = r#"package main

func example() {
	//asq_start
	//asq_end
	e.Close()
}
"#;
        assert!(matches!(extract(source), Err(Error::NoPatternNode)));
    }

    #[test]
    fn test_extract_from_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_asq_pattern.go");
        std::fs::write(
            &path,
            "package main\n\nfunc example() {\n\t//asq_start\n\treturn\n\t//asq_end\n}\n",
        )
        .unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(path).unwrap();
        assert_eq!(extract_query(&path).unwrap(), "(return_statement) @x");
    }

    #[test]
    fn test_prefix_escape_in_extracted_pattern() {
        let source = r#"package main

func example() {
	//asq_start
	_asq_conn.Close()
	//asq_end
}
"#;
        assert_eq!(
            extract(source).unwrap(),
            r#"(call_expression function: (selector_expression operand: (identifier) field: (field_identifier) @field0 (#eq? @field0 "Close")) arguments: (argument_list)) @x"#
        );
    }
}
