//! Alerta measures how much of each rural property under analysis is covered by deforestation alerts.
//!
//! Given the rural property cadastre (CAR) and a set of alert footprints, the pipeline
//!
//! * keeps the properties whose status contains a pattern (by default `analise` in `des_condic`),
//! * intersects them with the alerts, carrying the property identifier (`cod_imovel`) to every fragment,
//! * merges the fragments of each property into one geometry,
//! * transforms the result into a metric coordinate system (by default SIRGAS 2000 / UTM zone 22S, EPSG:31982),
//! * computes the affected area in hectares,
//! * and writes a `(cod_imovel, area_ha, geometry)` table.
//!
//! # Quick start
//!
//! ```no_run
//! use alerta::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new("data/car.geojson", "data/alerts.geojson", "results")
//!     .with_source_crs(4674);
//! config.validate()?;
//!
//! let result = Pipeline::new(config).run()?;
//! println!("{} properties written to {}", result.features.len(), result.destination.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Main components
//!
//! * [`FeatureCollection`] is an ordered set of features sharing a coordinate system.
//! * [`GeometryEngine`](engine::GeometryEngine) provides every geometric primitive: reading, intersection, union,
//!   transformation, area and writing. [`GeoEngine`](engine::GeoEngine) implements it with the `geo` crate.
//! * The [`stage`] components each perform one step over a collection.
//! * [`Pipeline`] sequences the stages and reports which one failed.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod feature;
pub mod io;
pub mod pipeline;
pub mod stage;

pub use config::PipelineConfig;
pub use error::{AlertaError, ErrorKind, PipelineFailure};
pub use feature::{AttributeValue, Attributes, Feature, FeatureCollection, FeatureId, JoinKey};
pub use pipeline::{Pipeline, PipelineResult, PipelineState, Stage};

// Reexport alerta_types
pub use alerta_types;
