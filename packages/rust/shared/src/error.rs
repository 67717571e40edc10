//! Error types for quizcards.
//!
//! Library crates use [`QuizcardsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all quizcards operations.
#[derive(Debug, thiserror::Error)]
pub enum QuizcardsError {
    /// Configuration, data layout, or corpus schema error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Structural error in an article or a generated table.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Prompt template could not be filled.
    #[error("template error: {message}")]
    Template { message: String },

    /// Text-generation backend error (transport, HTTP status, or reply shape).
    #[error("generation error: {0}")]
    Generation(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad argument, unusable reply content, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QuizcardsError>;

impl QuizcardsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a template error from any displayable message.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = QuizcardsError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = QuizcardsError::template("missing value for placeholder `bonuses`");
        assert!(err.to_string().contains("`bonuses`"));

        let err = QuizcardsError::Generation("HTTP 429".into());
        assert_eq!(err.to_string(), "generation error: HTTP 429");
    }

    #[test]
    fn io_error_carries_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = QuizcardsError::io("data/qbreader/tossups.json", source);
        let msg = err.to_string();
        assert!(msg.contains("tossups.json"));
        assert!(msg.contains("gone"));
    }
}
