//! Configuration errors

use std::path::PathBuf;

use tearoff_core::config::ProfileError;

/// Errors raised while loading a profile configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML syntax or schema error
    #[error("invalid profile file: {0}")]
    Toml(#[from] toml::de::Error),
    /// Unknown profile reference or value out of range
    #[error(transparent)]
    Profile(#[from] ProfileError),
    /// A required key is absent
    #[error("[{section}] is missing `{field}`")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },
    /// Named layer change or exposure profile that is not known or not
    /// defined in the file
    #[error("unknown {kind} {reference}")]
    UnknownReference {
        kind: &'static str,
        reference: String,
    },
    /// Two keys that exclude each other are both set
    #[error("[{section}] sets both `{first}` and `{second}`")]
    Conflict {
        section: &'static str,
        first: &'static str,
        second: &'static str,
    },
    /// Legacy line that is not `key = value`
    #[error("line {line}: expected `key = value`, got {content:?}")]
    Syntax { line: usize, content: String },
}

impl ConfigError {
    /// Check if this is an unknown profile or curve reference
    pub fn is_unknown_profile(&self) -> bool {
        match self {
            ConfigError::Profile(e) => e.is_unknown_profile(),
            ConfigError::UnknownReference { .. } => true,
            _ => false,
        }
    }
}
