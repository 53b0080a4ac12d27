//! Coordinate reference systems (see [`Crs`]) and conversion between them (see [`Projection`]).

mod crs;
mod datum;
pub mod impls;
pub mod traits;

pub use crs::{Crs, CrsKind, ProjectionType};
pub use datum::Datum;
pub use traits::projection::{ChainProjection, CoordProjection, InvertedProjection, Projection};
