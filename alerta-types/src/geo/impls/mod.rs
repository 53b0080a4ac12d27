//! Implementations of the [`Projection`](crate::geo::Projection) trait.

pub mod projection;
