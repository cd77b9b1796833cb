//! Grouping of raw matches into presentable snippets.
//!
//! Matches inside a function collapse into one group carrying the whole
//! function text; everything else pools into a single root group built from
//! a fixed-radius context window with function bodies cut out.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::language::Language;
use crate::parse::ParseTree;
use crate::resolve::Match;

/// Lines of context shown around root-level matches.
pub const CONTEXT_RADIUS: usize = 5;

/// One deduplicated group of matches, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchGroup {
    pub file_path: Utf8PathBuf,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub snippet: String,
    /// True when the snippet is a whole enclosing function.
    pub is_function: bool,
}

#[derive(Debug, Clone, Copy)]
struct FuncSpan {
    start_line: usize,
    end_line: usize,
    start_byte: usize,
}

impl FuncSpan {
    fn contains_row(&self, row: usize) -> bool {
        self.start_line <= row && row <= self.end_line
    }
}

/// Group matches previously resolved against the file at `path`.
pub fn group_matches(path: &Utf8Path, matches: &[Match]) -> Result<Vec<MatchGroup>> {
    let language = Language::detect(path)?;
    let contents = std::fs::read_to_string(path.as_std_path())?;
    group_matches_in(language, &contents, path, matches)
}

/// Group matches against in-memory `contents`; `path` is only recorded on
/// the produced groups.
pub fn group_matches_in(
    language: Language,
    contents: &str,
    path: &Utf8Path,
    matches: &[Match],
) -> Result<Vec<MatchGroup>> {
    let spans = function_spans(contents, language)?;
    let lines: Vec<&str> = contents.lines().collect();

    // Partition by enclosing function, keeping the root rows separate.
    let mut function_hits: Vec<FuncSpan> = Vec::new();
    let mut root_rows: Vec<usize> = Vec::new();
    for m in matches {
        match spans.iter().find(|s| s.contains_row(m.row)) {
            Some(span) => {
                if !function_hits.iter().any(|s| s.start_byte == span.start_byte) {
                    function_hits.push(*span);
                }
            }
            None => root_rows.push(m.row),
        }
    }
    function_hits.sort_by_key(|s| s.start_byte);

    let mut groups: Vec<MatchGroup> = function_hits
        .into_iter()
        .map(|span| MatchGroup {
            file_path: path.to_owned(),
            start_line: span.start_line,
            end_line: span.end_line,
            snippet: lines[span.start_line - 1..span.end_line].join("\n"),
            is_function: true,
        })
        .collect();

    if let Some(group) = root_group(path, &lines, &spans, &root_rows) {
        groups.push(group);
    }
    Ok(groups)
}

/// Build the root snippet: expand the matched rows by the context radius,
/// drop any line belonging to a function, then trim blank edges.
fn root_group(
    path: &Utf8Path,
    lines: &[&str],
    spans: &[FuncSpan],
    rows: &[usize],
) -> Option<MatchGroup> {
    let min_row = *rows.iter().min()?;
    let max_row = *rows.iter().max()?;
    let window_start = min_row.saturating_sub(CONTEXT_RADIUS).max(1);
    let window_end = (max_row + CONTEXT_RADIUS).min(lines.len());

    let kept: Vec<&str> = (window_start..=window_end)
        .filter(|row| !spans.iter().any(|s| s.contains_row(*row)))
        .map(|row| lines[row - 1])
        .collect();

    let first = kept.iter().position(|l| !l.trim().is_empty())?;
    let last = kept.iter().rposition(|l| !l.trim().is_empty())?;

    Some(MatchGroup {
        file_path: path.to_owned(),
        start_line: window_start + first,
        end_line: window_start + last,
        snippet: kept[first..=last].join("\n"),
        is_function: false,
    })
}

fn function_spans(contents: &str, language: Language) -> Result<Vec<FuncSpan>> {
    let tree = ParseTree::parse(contents.to_string(), language)?;
    let root = tree.root_node();
    let mut spans = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "function_declaration" | "method_declaration") {
            spans.push(FuncSpan {
                start_line: node.start_position().row + 1,
                end_line: node.end_position().row + 1,
                start_byte: node.start_byte(),
            });
            continue;
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    spans.sort_by_key(|s| s.start_byte);
    Ok(spans)
}
