use std::cmp::Ordering;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use alerta_types::geo::CoordProjection;
use alerta_types::TypesError;
use geo::{Area, BooleanOps, BoundingRect, MapCoords};
use geo_types::{Coord, MultiPolygon};
use serde::{Deserialize, Serialize};

use super::index::EnvelopeIndex;
use super::validity;
use super::{GeometryEngine, Source};
use crate::error::{AlertaError, Result};
use crate::feature::FeatureCollection;
use crate::io;

/// Tuning parameters of the [`GeoEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoEngineOptions {
    /// Grid size coordinates are snapped to when repairing geometry, in units of the coordinate system.
    pub snap_grid: f64,
    /// Intersection parts with area not larger than this are treated as degenerate and dropped.
    pub min_fragment_area: f64,
}

impl Default for GeoEngineOptions {
    fn default() -> Self {
        Self {
            snap_grid: 1e-9,
            min_fragment_area: 0.0,
        }
    }
}

/// Geometry engine built on the `geo` crate, with an `rstar` index for overlay candidates and `geodesy` for
/// coordinate transformations.
///
/// Geometries are `MultiPolygon<f64>`. Sources are GeoJSON (`.geojson`, `.json`) or ESRI Shapefile (`.shp`) files.
/// Destinations are GeoJSON or CSV (`.csv`, geometry as WKT) files.
#[derive(Debug, Default)]
pub struct GeoEngine {
    options: GeoEngineOptions,
    repaired: AtomicUsize,
}

impl GeoEngine {
    /// Opens an engine session.
    pub fn open(options: GeoEngineOptions) -> Result<Self> {
        if !options.snap_grid.is_finite() || options.snap_grid < 0.0 {
            return Err(AlertaError::Config(format!(
                "snap grid must be a non-negative number, got {}",
                options.snap_grid
            )));
        }

        log::debug!("Geo engine session opened with {options:?}");
        Ok(Self {
            options,
            repaired: AtomicUsize::new(0),
        })
    }

    /// Options the engine was opened with.
    pub fn options(&self) -> &GeoEngineOptions {
        &self.options
    }

    /// Number of geometries repaired during the session.
    pub fn repaired_count(&self) -> usize {
        self.repaired.load(AtomicOrdering::Relaxed)
    }

    fn drop_degenerate(&self, geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
        MultiPolygon::new(
            geometry
                .0
                .into_iter()
                .filter(|p| p.unsigned_area() > self.options.min_fragment_area)
                .collect(),
        )
    }
}

impl Drop for GeoEngine {
    fn drop(&mut self) {
        log::debug!(
            "Geo engine session closed, {} geometries repaired",
            self.repaired_count()
        );
    }
}

fn has_non_finite(geometry: &MultiPolygon<f64>) -> bool {
    geometry
        .0
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .flat_map(|ring| ring.0.iter())
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
}

/// Sort key that makes the union independent from the input order.
fn envelope_order(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Ordering {
    let key = |g: &MultiPolygon<f64>| {
        g.bounding_rect()
            .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y])
            .unwrap_or([f64::INFINITY; 4])
    };

    let (ka, kb) = (key(a), key(b));
    ka.iter()
        .zip(kb.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.unsigned_area().total_cmp(&b.unsigned_area()))
}

impl GeometryEngine for GeoEngine {
    type Geometry = MultiPolygon<f64>;

    fn name(&self) -> &'static str {
        "geo"
    }

    fn read(&self, source: &Source) -> Result<FeatureCollection<Self::Geometry>> {
        io::read_features(source)
    }

    fn candidate_pairs(
        &self,
        left: &[&Self::Geometry],
        right: &[&Self::Geometry],
    ) -> Vec<(usize, usize)> {
        let index = EnvelopeIndex::build(right);
        left.iter()
            .enumerate()
            .flat_map(|(i, geometry)| index.candidates(geometry).into_iter().map(move |j| (i, j)))
            .collect()
    }

    fn validate(&self, geometry: &Self::Geometry) -> Result<()> {
        validity::validate(geometry).map_err(|invalid| AlertaError::geometry(invalid.to_string()))
    }

    fn repair(&self, geometry: &Self::Geometry) -> Self::Geometry {
        self.repaired.fetch_add(1, AtomicOrdering::Relaxed);
        validity::repair(geometry, self.options.snap_grid)
    }

    fn intersection(
        &self,
        a: &Self::Geometry,
        b: &Self::Geometry,
    ) -> Result<Option<Self::Geometry>> {
        let result = a.intersection(b);
        if has_non_finite(&result) {
            return Err(AlertaError::geometry(
                "intersection produced non-finite coordinates",
            ));
        }

        let result = self.drop_degenerate(result);
        if result.0.is_empty() {
            Ok(None)
        } else {
            Ok(Some(result))
        }
    }

    fn union(&self, mut parts: Vec<Self::Geometry>) -> Result<Self::Geometry> {
        parts.sort_by(envelope_order);

        // Cascaded union: merge neighbours pairwise until one geometry is left.
        while parts.len() > 1 {
            let mut next = Vec::with_capacity(parts.len() / 2 + 1);
            let mut iter = parts.into_iter();
            while let Some(a) = iter.next() {
                match iter.next() {
                    Some(b) => next.push(a.union(&b)),
                    None => next.push(a),
                }
            }
            parts = next;
        }

        let result = parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]));
        if has_non_finite(&result) {
            return Err(AlertaError::geometry(
                "union produced non-finite coordinates",
            ));
        }

        Ok(result)
    }

    fn transform(
        &self,
        geometry: &Self::Geometry,
        projection: &CoordProjection,
    ) -> Result<Self::Geometry> {
        let transformed = geometry.try_map_coords(|c: Coord<f64>| {
            projection
                .project(&c)
                .ok_or(TypesError::OutsideDomain { x: c.x, y: c.y })
        })?;

        Ok(transformed)
    }

    fn planar_area(&self, geometry: &Self::Geometry) -> f64 {
        geometry.unsigned_area()
    }

    fn write(
        &self,
        features: &FeatureCollection<Self::Geometry>,
        destination: &Path,
        layer_name: &str,
    ) -> Result<()> {
        io::write_features(features, destination, layer_name)
    }
}
