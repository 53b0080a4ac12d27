//! Geometry engines.
//!
//! The pipeline never touches coordinates itself. Every geometric primitive it needs (reading, predicate
//! evaluation, intersection, union, coordinate transformation, area, writing) is requested from a
//! [`GeometryEngine`]. An engine instance is acquired at the start of a pipeline run and dropped at its end, so any
//! native resources it holds are released on every exit path.
//!
//! [`GeoEngine`] is the engine built on the `geo` crate.

mod geo_engine;
mod index;
mod validity;

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use alerta_types::geo::CoordProjection;
use alerta_types::Crs;

use crate::error::Result;
use crate::feature::FeatureCollection;
use crate::stage::LikePattern;

pub use geo_engine::{GeoEngine, GeoEngineOptions};

/// A named feature source together with the columns to load from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Location of the source.
    pub path: PathBuf,
    /// Attribute columns to load. Empty means all columns.
    pub columns: Vec<String>,
    /// Coordinate system to assign to the data, overriding whatever the source declares.
    pub crs: Option<Crs>,
}

impl Source {
    /// Source with all columns and the declared coordinate system.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            columns: Vec::new(),
            crs: None,
        }
    }

    /// Restricts loading to the given columns.
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Assigns the coordinate system of the data.
    pub fn with_crs(mut self, crs: Option<Crs>) -> Self {
        self.crs = crs;
        self
    }
}

/// Capabilities the pipeline needs from a geometry backend.
pub trait GeometryEngine {
    /// Polygonal geometry value handled by the engine.
    type Geometry: Clone + Debug + Send + Sync;

    /// Short name of the engine, used in logs.
    fn name(&self) -> &'static str;

    /// Reads features from the source.
    fn read(&self, source: &Source) -> Result<FeatureCollection<Self::Geometry>>;

    /// Evaluates the substring predicate against an attribute value.
    fn matches(&self, value: &str, pattern: &LikePattern) -> bool {
        pattern.matches(value)
    }

    /// Returns pairs of indices `(left, right)` whose geometries may overlap, sorted by `left` and then `right`.
    ///
    /// Every pair with a non-empty intersection must be present. Extra pairs are allowed.
    fn candidate_pairs(
        &self,
        left: &[&Self::Geometry],
        right: &[&Self::Geometry],
    ) -> Vec<(usize, usize)>;

    /// Checks that the geometry is valid input for [`intersection`](Self::intersection) and
    /// [`union`](Self::union).
    fn validate(&self, geometry: &Self::Geometry) -> Result<()>;

    /// Attempts to fix invalid geometry (snapping, removal of degenerate parts, resolution of self-intersections).
    fn repair(&self, geometry: &Self::Geometry) -> Self::Geometry;

    /// Intersection of two geometries. `None` if it is empty or has zero area.
    fn intersection(
        &self,
        a: &Self::Geometry,
        b: &Self::Geometry,
    ) -> Result<Option<Self::Geometry>>;

    /// Union of all the parts. The result does not depend on the order of the parts.
    fn union(&self, parts: Vec<Self::Geometry>) -> Result<Self::Geometry>;

    /// Coordinate conversion between two systems.
    fn transformation(&self, from: &Crs, to: &Crs) -> Result<Box<CoordProjection>> {
        Ok(from.transformation_to(to)?)
    }

    /// Applies the coordinate conversion to every vertex of the geometry.
    fn transform(
        &self,
        geometry: &Self::Geometry,
        projection: &CoordProjection,
    ) -> Result<Self::Geometry>;

    /// Planar area in squared units of the coordinate system.
    fn planar_area(&self, geometry: &Self::Geometry) -> f64;

    /// Writes the features to the destination, replacing an existing container.
    fn write(
        &self,
        features: &FeatureCollection<Self::Geometry>,
        destination: &Path,
        layer_name: &str,
    ) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod tests {
    use geo::BoundingRect;
    use geo_types::MultiPolygon;

    use super::*;
    use crate::error::AlertaError;

    /// [`GeoEngine`] that reports every geometry reaching west of `x = 0` as invalid, before and after repair.
    pub(crate) struct WestRejectingEngine {
        pub(crate) inner: GeoEngine,
    }

    impl WestRejectingEngine {
        pub(crate) fn new() -> Self {
            Self {
                inner: GeoEngine::open(GeoEngineOptions::default()).unwrap(),
            }
        }
    }

    impl GeometryEngine for WestRejectingEngine {
        type Geometry = MultiPolygon<f64>;

        fn name(&self) -> &'static str {
            "west-rejecting"
        }

        fn read(&self, source: &Source) -> Result<FeatureCollection<Self::Geometry>> {
            self.inner.read(source)
        }

        fn candidate_pairs(
            &self,
            left: &[&Self::Geometry],
            right: &[&Self::Geometry],
        ) -> Vec<(usize, usize)> {
            self.inner.candidate_pairs(left, right)
        }

        fn validate(&self, geometry: &Self::Geometry) -> Result<()> {
            match geometry.bounding_rect() {
                Some(rect) if rect.min().x < 0.0 => Err(AlertaError::geometry("west of the origin")),
                _ => self.inner.validate(geometry),
            }
        }

        fn repair(&self, geometry: &Self::Geometry) -> Self::Geometry {
            self.inner.repair(geometry)
        }

        fn intersection(
            &self,
            a: &Self::Geometry,
            b: &Self::Geometry,
        ) -> Result<Option<Self::Geometry>> {
            self.inner.intersection(a, b)
        }

        fn union(&self, parts: Vec<Self::Geometry>) -> Result<Self::Geometry> {
            self.inner.union(parts)
        }

        fn transform(
            &self,
            geometry: &Self::Geometry,
            projection: &CoordProjection,
        ) -> Result<Self::Geometry> {
            self.inner.transform(geometry, projection)
        }

        fn planar_area(&self, geometry: &Self::Geometry) -> f64 {
            self.inner.planar_area(geometry)
        }

        fn write(
            &self,
            features: &FeatureCollection<Self::Geometry>,
            destination: &Path,
            layer_name: &str,
        ) -> Result<()> {
            self.inner.write(features, destination, layer_name)
        }
    }
}
