//! Georeferencing types used by the `alerta` pipeline.
//!
//! The crate knows about a small registry of coordinate reference systems (see [`geo::Crs`]) and how to move
//! coordinates between them (see [`geo::Projection`]). Geometries themselves are plain [`geo_types`] values:
//! coordinates of a geographic system are stored as `x = longitude`, `y = latitude` in degrees, coordinates of a
//! projected system as `x = easting`, `y = northing` in metres.

pub mod error;
pub mod geo;

pub use error::TypesError;
pub use geo::{Crs, CrsKind, Datum, ProjectionType};
