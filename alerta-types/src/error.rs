//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    /// The authority code is not in the registry of supported systems.
    #[error("unknown coordinate reference system EPSG:{0}")]
    UnknownCrs(u32),
    /// There is no transformation path between the two systems.
    #[error("no transformation from {from} to {to}")]
    NoTransform {
        /// Source system.
        from: String,
        /// Target system.
        to: String,
    },
    /// A coordinate could not be transformed (outside of the projection domain).
    #[error("coordinate ({x}, {y}) cannot be transformed")]
    OutsideDomain {
        /// X (longitude or easting) of the offending coordinate.
        x: f64,
        /// Y (latitude or northing) of the offending coordinate.
        y: f64,
    },
    /// The projection definition was rejected by the projection backend.
    #[error("invalid projection definition `{0}`")]
    Definition(String),
}
