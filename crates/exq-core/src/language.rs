//! Language detection and grammar configuration.

use camino::Utf8Path;
use tree_sitter::Language as TsLanguage;

use crate::error::{Error, Result};

/// Languages the query compiler models. Only Go's node taxonomy is compiled
/// into structural queries; other extensions are rejected during detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
}

impl Language {
    /// Detect the language of a file from its extension.
    pub fn detect(path: &Utf8Path) -> Result<Self> {
        let ext = path.extension().ok_or(Error::UnknownLanguage)?;
        Self::from_extension(ext).ok_or_else(|| Error::UnsupportedLanguage(ext.to_string()))
    }

    /// Detect language from a bare file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "go" => Some(Language::Go),
            _ => None,
        }
    }

    /// Get the tree-sitter grammar for this language.
    pub fn tree_sitter_language(&self) -> TsLanguage {
        match self {
            Language::Go => tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Get the display name for this language.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Go => "Go",
        }
    }

    /// Lowercase tag used in presentation output.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Go => "go",
        }
    }

    /// Get the file extensions for this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Go => &["go"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_go() {
        assert_eq!(
            Language::detect(Utf8Path::new("pkg/util/thing.go")).unwrap(),
            Language::Go
        );
    }

    #[test]
    fn test_detect_unsupported_extension() {
        let err = Language::detect(Utf8Path::new("main.rs")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(ext) if ext == "rs"));
    }

    #[test]
    fn test_detect_no_extension() {
        let err = Language::detect(Utf8Path::new("Makefile")).unwrap_err();
        assert!(matches!(err, Error::UnknownLanguage));
    }
}
