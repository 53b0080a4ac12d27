//! Components of the alert pipeline.
//!
//! Each component takes ownership of its input collection and returns a new one, using a [`GeometryEngine`] for
//! every geometric operation.
//!
//! [`GeometryEngine`]: crate::engine::GeometryEngine

mod area;
mod dissolve;
mod filter;
mod overlay;
mod reproject;
mod writer;

pub use area::{AreaCalculator, AREA_FIELD, SQUARE_METRES_PER_HECTARE};
pub use dissolve::DissolveAggregator;
pub use filter::{LikePattern, StatusFilter};
pub use overlay::OverlayIntersector;
pub use reproject::CrsReprojector;
pub use writer::ResultWriter;
