//! Error types for file transforms.

use camino::{Utf8Path, Utf8PathBuf};

/// Why a file could not be transformed.
///
/// A failed file is dropped from the output; other files keep flowing.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The file's contents are a live stream.
    #[error("Streaming not supported!")]
    StreamingNotSupported { path: Utf8PathBuf },

    /// The minification engine reported fatal errors.
    #[error("{message}")]
    Engine { path: Utf8PathBuf, message: String },

    /// The engine's source map could not be merged into the file's.
    #[error("failed to apply source map to {path}: {source}")]
    SourceMap {
        path: Utf8PathBuf,
        #[source]
        source: SourceMapError,
    },
}

impl TransformError {
    /// Path of the file that failed.
    pub fn path(&self) -> &Utf8Path {
        match self {
            TransformError::StreamingNotSupported { path }
            | TransformError::Engine { path, .. }
            | TransformError::SourceMap { path, .. } => path,
        }
    }
}

/// Errors reading, writing or composing source maps.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceMapError {
    #[error("invalid source map JSON: {0}")]
    Json(String),

    #[error("failed to compose source maps: {0}")]
    Compose(String),
}
