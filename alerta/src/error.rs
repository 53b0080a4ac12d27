//! Error types used by the crate.

use std::fmt::{Display, Formatter};

use alerta_types::TypesError;
use thiserror::Error;

use crate::pipeline::Stage;

/// Alerta error type.
#[derive(Debug, Error)]
pub enum AlertaError {
    /// Referenced attribute does not exist in the collection schema.
    #[error("attribute `{0}` does not exist in the collection schema")]
    Schema(String),
    /// Invalid geometry that could not be repaired, or a geometry operation that produced no well-defined result.
    #[error("invalid geometry{}: {message}", key.as_ref().map(|k| format!(" for `{k}`")).unwrap_or_default())]
    Geometry {
        /// Join key of the feature the geometry belongs to, when known.
        key: Option<String>,
        /// Details.
        message: String,
    },
    /// Coordinate reference system lookup or transformation failure.
    #[error("crs error: {0}")]
    Crs(#[from] TypesError),
    /// Two collections that must share a coordinate system do not.
    #[error("crs mismatch: {0} vs {1}")]
    CrsMismatch(String, String),
    /// An operation was called on data it is not defined for.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// Error reading/writing data to the FS.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Input data could not be decoded.
    #[error("failed to decode data: {0}")]
    Decoding(String),
    /// The container type is not supported for the requested direction.
    #[error("unsupported container: {0}")]
    UnsupportedFormat(String),
    /// Invalid pipeline configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Error categories of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Referenced attribute absent.
    Schema,
    /// Invalid or unrepairable geometry.
    Geometry,
    /// No transform path between systems.
    Crs,
    /// Operation invoked on data it is not defined for, e.g. area on degrees.
    Precondition,
    /// Read or write failure.
    Io,
}

impl AlertaError {
    /// Creates a geometry error without key context.
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry {
            key: None,
            message: message.into(),
        }
    }

    /// Attaches the join key to a geometry error. Other errors are returned unchanged.
    pub fn with_key(self, join_key: &str) -> Self {
        match self {
            Self::Geometry { key: None, message } => Self::Geometry {
                key: Some(join_key.to_string()),
                message,
            },
            other => other,
        }
    }

    /// Category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::Geometry { .. } => ErrorKind::Geometry,
            Self::Crs(_) | Self::CrsMismatch(..) => ErrorKind::Crs,
            Self::Precondition(_) | Self::Config(_) => ErrorKind::Precondition,
            Self::Io(_) | Self::Decoding(_) | Self::UnsupportedFormat(_) => ErrorKind::Io,
        }
    }
}

impl From<geojson::Error> for AlertaError {
    fn from(value: geojson::Error) -> Self {
        Self::Decoding(value.to_string())
    }
}

impl From<serde_json::Error> for AlertaError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decoding(value.to_string())
    }
}

impl From<csv::Error> for AlertaError {
    fn from(value: csv::Error) -> Self {
        if value.is_io_error() {
            match value.into_kind() {
                csv::ErrorKind::Io(err) => Self::Io(err),
                other => Self::Decoding(format!("{other:?}")),
            }
        } else {
            Self::Decoding(value.to_string())
        }
    }
}

impl From<shapefile::Error> for AlertaError {
    fn from(value: shapefile::Error) -> Self {
        match value {
            shapefile::Error::IoError(err) => Self::Io(err),
            other => Self::Decoding(other.to_string()),
        }
    }
}

impl From<shapefile::dbase::Error> for AlertaError {
    fn from(value: shapefile::dbase::Error) -> Self {
        Self::Decoding(value.to_string())
    }
}

/// Result type alias for alerta operations.
pub type Result<T> = std::result::Result<T, AlertaError>;

/// Error returned by the pipeline orchestrator: the stage that failed and the reason.
#[derive(Debug, Error)]
pub struct PipelineFailure {
    /// Stage that produced the error.
    pub stage: Stage,
    /// Underlying error.
    #[source]
    pub source: AlertaError,
}

impl Display for PipelineFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.source)
    }
}
