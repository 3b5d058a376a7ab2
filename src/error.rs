use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while discovering assets or assembling materials.
///
/// Only [`TextureError::InvalidConfig`] escapes [`crate::apply::apply_textures`];
/// everything else is downgraded to a warning string by the orchestration layer.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("{category} category: texture directory not found at {}", path.display())]
    AssetDirectoryMissing { category: String, path: PathBuf },

    #[error("unreadable texture '{}': {reason}", path.display())]
    ChannelFileUnreadable { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    MeshUnavailable(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TextureError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        TextureError::InvalidConfig(msg.into())
    }

    /// Misconfiguration is a caller bug; everything else is an environment issue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TextureError::InvalidConfig(_))
    }
}

pub type Result<T, E = TextureError> = std::result::Result<T, E>;
