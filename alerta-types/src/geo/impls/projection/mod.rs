//! Implementations for some of the common projections.
mod identity;

pub use identity::IdentityProjection;

#[cfg(feature = "geodesy")]
mod geodesy;
#[cfg(feature = "geodesy")]
pub use geodesy::GeodesyProjection;
