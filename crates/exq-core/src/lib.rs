pub mod error;
pub mod extract;
pub mod group;
pub mod intervals;
pub mod language;
pub mod parse;
pub mod query;
pub mod resolve;

pub use error::{Error, Result};
pub use extract::{extract_query, extract_query_from_source, END_MARKER, START_MARKER, WILDCARD_MARKER};
pub use group::{group_matches, group_matches_in, MatchGroup, CONTEXT_RADIUS};
pub use intervals::{Interval, WildcardIntervals};
pub use language::Language;
pub use parse::ParseTree;
pub use query::{build_node, compile_query, PatternContext, QueryNode, ROOT_CAPTURE, WILDCARD_PREFIX};
pub use resolve::{resolve_matches, resolve_matches_in, Match};
