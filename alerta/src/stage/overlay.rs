use std::borrow::Cow;

use alerta_types::Crs;

use super::CrsReprojector;
use crate::engine::GeometryEngine;
use crate::error::{AlertaError, Result};
use crate::feature::{Attributes, FeatureCollection, FeatureId};

/// Pairwise intersection of two feature collections.
#[derive(Debug, Clone)]
pub struct OverlayIntersector {
    retained_key: String,
}

impl OverlayIntersector {
    /// Creates an intersector that carries the `retained_key` attribute of the left features to the output.
    pub fn new(retained_key: impl Into<String>) -> Self {
        Self {
            retained_key: retained_key.into(),
        }
    }

    /// Emits one feature for every overlapping pair `(left, right)`, with the intersection as geometry and the
    /// retained key of the left feature as its only attribute.
    ///
    /// Output is ordered by the left feature and then by the right feature, whichever candidate search the engine
    /// uses. Pairs with empty or zero-area intersection are omitted. Geometries taking part in a candidate pair are
    /// validated once; invalid ones get a single repair attempt before the overlay fails.
    pub fn intersect<E: GeometryEngine>(
        &self,
        engine: &E,
        left: FeatureCollection<E::Geometry>,
        right: FeatureCollection<E::Geometry>,
    ) -> Result<FeatureCollection<E::Geometry>> {
        left.require_field(&self.retained_key)?;
        let right = align_crs(engine, left.crs(), right)?;

        let mut output = FeatureCollection::new(left.crs().clone(), [self.retained_key.clone()]);

        let left_geometries: Vec<&E::Geometry> = left.iter().map(|f| &f.geometry).collect();
        let right_geometries: Vec<&E::Geometry> = right.iter().map(|f| &f.geometry).collect();
        let pairs = engine.candidate_pairs(&left_geometries, &right_geometries);
        log::debug!(
            "{} candidate pairs for {}x{} features",
            pairs.len(),
            left.len(),
            right.len()
        );

        let mut prepared_right: Vec<Option<Cow<E::Geometry>>> =
            (0..right.len()).map(|_| None).collect();
        let mut current_left: Option<(usize, Cow<E::Geometry>)> = None;

        for (i, j) in pairs {
            let left_feature = &left.features()[i];
            let key = left_feature.join_key(&self.retained_key);
            let with_key = |err: AlertaError| match &key {
                Some(key) => err.with_key(key.as_str()),
                None => err,
            };

            if current_left.as_ref().map(|(index, _)| *index) != Some(i) {
                let geometry = prepare(engine, &left_feature.geometry, left_feature.id())
                    .map_err(with_key)?;
                current_left = Some((i, geometry));
            }

            if prepared_right[j].is_none() {
                let right_feature = &right.features()[j];
                let geometry = prepare(engine, &right_feature.geometry, right_feature.id())?;
                prepared_right[j] = Some(geometry);
            }

            let (Some((_, left_geometry)), Some(right_geometry)) =
                (&current_left, &prepared_right[j])
            else {
                continue;
            };

            let Some(intersection) = engine
                .intersection(left_geometry, right_geometry)
                .map_err(with_key)?
            else {
                continue;
            };

            let mut attributes = Attributes::new();
            if let Some(value) = left_feature.get(&self.retained_key) {
                attributes.insert(self.retained_key.clone(), value.clone());
            }

            output.push(attributes, intersection);
        }

        Ok(output)
    }
}

/// Brings the right collection into the coordinate system of the left one.
fn align_crs<E: GeometryEngine>(
    engine: &E,
    target: &Crs,
    features: FeatureCollection<E::Geometry>,
) -> Result<FeatureCollection<E::Geometry>> {
    if features.crs() == target {
        return Ok(features);
    }

    log::warn!(
        "Overlay layers have different coordinate systems, transforming {} features from {} to {}",
        features.len(),
        features.crs(),
        target
    );

    let source = features.crs().to_string();
    CrsReprojector::new(target.clone())
        .reproject(engine, features)
        .map_err(|err| match err {
            AlertaError::Crs(inner) => {
                log::debug!("No transformation from {source} to {target}: {inner}");
                AlertaError::CrsMismatch(target.to_string(), source)
            }
            other => other,
        })
}

/// Validates the geometry, repairing it once if needed.
fn prepare<'a, E: GeometryEngine>(
    engine: &E,
    geometry: &'a E::Geometry,
    id: FeatureId,
) -> Result<Cow<'a, E::Geometry>> {
    let Err(err) = engine.validate(geometry) else {
        return Ok(Cow::Borrowed(geometry));
    };

    log::debug!("Repairing geometry of feature {id}: {err}");
    let repaired = engine.repair(geometry);
    match engine.validate(&repaired) {
        Ok(()) => Ok(Cow::Owned(repaired)),
        Err(AlertaError::Geometry { key, message }) => Err(AlertaError::Geometry {
            key,
            message: format!("feature {id} is invalid after repair: {message}"),
        }),
        Err(other) => Err(other),
    }
}
