//! Command-line frontend: compile an annotated pattern file into a query,
//! then either print the query or search the working tree with it.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use tracing::debug;
use walkdir::WalkDir;

use exq_core::{extract_query, group_matches_in, resolve_matches_in, Language, WILDCARD_PREFIX};

#[derive(Parser)]
#[command(name = "exq", version, about = "Structural code search by annotated example")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a tree-sitter query from an annotated Go file
    TreeSitter {
        /// Path to the annotated Go file
        file: Utf8PathBuf,
    },
    /// Search the current directory tree for matches of the annotated pattern
    Query {
        /// Path to the annotated Go file
        file: Utf8PathBuf,
        /// Emit grouped snippets in <especially_relevant_code_snippet> blocks
        #[arg(long)]
        cursor: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::TreeSitter { file } => {
            let query = extract_query(&file).context("failed to generate query")?;
            println!("{query}");
            Ok(())
        }
        Command::Query { file, cursor } => run_query(&file, cursor),
    }
}

fn run_query(file: &Utf8Path, cursor: bool) -> Result<()> {
    let query = extract_query(file).context("failed to generate query")?;

    for entry in WalkDir::new(".") {
        let entry = entry.context("failed to walk directory")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = Utf8Path::from_path(entry.path()) else {
            continue;
        };
        if !is_search_target(path) {
            continue;
        }
        let display_path = strip_walk_prefix(path);
        if let Err(e) = search_file(display_path, &query, cursor) {
            // A file that does not parse or does not match is skipped, not
            // reported.
            debug!(path = %display_path, error = %e, "skipping file");
        }
    }
    Ok(())
}

/// Paths from the walk carry a `./` prefix the output should not show.
fn strip_walk_prefix(path: &Utf8Path) -> &Utf8Path {
    path.strip_prefix("./").unwrap_or(path)
}

/// Go sources only; pattern files themselves are excluded by the `_asq_`
/// basename convention.
fn is_search_target(path: &Utf8Path) -> bool {
    path.extension() == Some("go")
        && !path
            .file_name()
            .is_some_and(|name| name.starts_with(WILDCARD_PREFIX))
}

fn search_file(path: &Utf8Path, query: &str, cursor: bool) -> Result<()> {
    let contents = std::fs::read_to_string(path.as_std_path())?;
    let matches = resolve_matches_in(Language::Go, &contents, query)?;

    if cursor {
        let groups = group_matches_in(Language::Go, &contents, path, &matches)?;
        for group in groups {
            println!("<especially_relevant_code_snippet>");
            println!("go");
            if group.is_function || matches.len() > 1 {
                println!("{}", group.file_path);
            } else {
                println!("{}:{}", group.file_path, group.start_line);
            }
            println!("{}", group.snippet);
            println!("</especially_relevant_code_snippet>");
            println!();
        }
    } else {
        for m in &matches {
            println!("//asq_match {path}:{}:{}\n{}", m.row, m.column, m.text);
        }
    }
    Ok(())
}
