use sd_core::SceneError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DraftError {
    /// The source asset a draft depends on cannot be found.
    #[error("source asset {name:?} not found")]
    AssetNotFound { name: String },

    /// The manifest could not be decoded.
    #[error("malformed draft manifest at {path:?}: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Draft ids are used as directory names and must be one plain segment.
    #[error("invalid draft id {0:?}")]
    InvalidId(String),

    /// Source asset names become file names inside the package.
    #[error("invalid source asset name {0:?}")]
    InvalidAssetName(String),

    #[error("draft {0:?} not found")]
    NotFound(String),

    /// The package's copy of the source asset no longer parses.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl DraftError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DraftError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a single record was left out of a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record's node index has no shape node in the re-extracted asset.
    StaleNodeReference { node_index: usize, node_count: usize },
    /// The raster file for a user image is missing or unreadable.
    MissingRasterAsset { file: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::StaleNodeReference { node_index, node_count } => {
                write!(f, "node index {node_index} is stale ({node_count} nodes extracted)")
            }
            SkipReason::MissingRasterAsset { file } => write!(f, "raster asset {file:?} is missing"),
        }
    }
}
