use ahash::{HashMap, HashMapExt};
use rayon::prelude::*;

use crate::attributes;
use crate::engine::GeometryEngine;
use crate::error::Result;
use crate::feature::{Feature, FeatureCollection, JoinKey};

/// Groups features by a key and merges the geometries of each group.
#[derive(Debug, Clone)]
pub struct DissolveAggregator {
    key: String,
}

/// Groups in the order their keys first appear. Items without a key are counted and skipped.
fn group_by_key<G>(items: impl IntoIterator<Item = (Option<JoinKey>, G)>) -> (Vec<(JoinKey, Vec<G>)>, usize) {
    let mut index: HashMap<JoinKey, usize> = HashMap::new();
    let mut groups: Vec<(JoinKey, Vec<G>)> = Vec::new();
    let mut without_key = 0;

    for (join_key, geometry) in items {
        let Some(join_key) = join_key else {
            without_key += 1;
            continue;
        };

        match index.get(&join_key) {
            Some(&position) => groups[position].1.push(geometry),
            None => {
                index.insert(join_key.clone(), groups.len());
                groups.push((join_key, vec![geometry]));
            }
        }
    }

    (groups, without_key)
}

impl DissolveAggregator {
    /// Creates an aggregator grouping by the `key` attribute.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Replaces every group of features sharing a key value with one feature holding the union of their
    /// geometries.
    ///
    /// Output has exactly one feature per distinct key, in the order keys first appear in the input, and the key
    /// as its only attribute. Disjoint parts stay in one multi-part geometry. Features with a missing or null key
    /// are dropped.
    pub fn dissolve<E: GeometryEngine>(
        &self,
        engine: &E,
        features: FeatureCollection<E::Geometry>,
    ) -> Result<FeatureCollection<E::Geometry>> {
        features.require_field(&self.key)?;
        let (crs, _, features) = features.into_parts();

        let mut output = FeatureCollection::new(crs, [self.key.clone()]);
        for (join_key, parts) in self.group(features) {
            let geometry = union_with_repair(engine, &join_key, parts)?;
            output.push(attributes! { self.key.as_str() => join_key }, geometry);
        }

        Ok(output)
    }

    /// Same as [`dissolve`](Self::dissolve), but the input is split into `partitions` contiguous chunks that are
    /// dissolved in parallel. Keys present in several chunks are merged with a second dissolve of the partial
    /// results, so the output equals that of the unpartitioned dissolve.
    pub fn dissolve_partitioned<E: GeometryEngine + Sync>(
        &self,
        engine: &E,
        features: FeatureCollection<E::Geometry>,
        partitions: usize,
    ) -> Result<FeatureCollection<E::Geometry>> {
        if partitions <= 1 || features.len() <= 1 {
            return self.dissolve(engine, features);
        }

        features.require_field(&self.key)?;
        let (crs, _, features) = features.into_parts();

        let chunk_size = features.len().div_ceil(partitions);
        let mut chunks: Vec<Vec<Feature<E::Geometry>>> = Vec::with_capacity(partitions);
        let mut remaining = features.into_iter().peekable();
        while remaining.peek().is_some() {
            chunks.push(remaining.by_ref().take(chunk_size).collect());
        }

        log::debug!(
            "Dissolving {} chunks of up to {chunk_size} features",
            chunks.len()
        );

        let partials: Vec<Vec<(JoinKey, E::Geometry)>> = chunks
            .into_par_iter()
            .map(|chunk| {
                self.group(chunk)
                    .into_iter()
                    .map(|(join_key, parts)| {
                        let geometry = union_with_repair(engine, &join_key, parts)?;
                        Ok((join_key, geometry))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let (groups, _) = group_by_key(
            partials
                .into_iter()
                .flatten()
                .map(|(join_key, geometry)| (Some(join_key), geometry)),
        );

        let mut output = FeatureCollection::new(crs, [self.key.clone()]);
        for (join_key, mut parts) in groups {
            let geometry = if parts.len() == 1 {
                parts.remove(0)
            } else {
                union_with_repair(engine, &join_key, parts)?
            };
            output.push(attributes! { self.key.as_str() => join_key }, geometry);
        }

        Ok(output)
    }

    fn group<G>(&self, features: Vec<Feature<G>>) -> Vec<(JoinKey, Vec<G>)> {
        let (groups, without_key) = group_by_key(
            features
                .into_iter()
                .map(|feature| (feature.join_key(&self.key), feature.geometry)),
        );

        if without_key > 0 {
            log::warn!(
                "{without_key} features without `{}` value were left out of the dissolve",
                self.key
            );
        }

        groups
    }
}

/// Unions the parts. If the engine fails or the result is invalid, the parts are repaired and the union is tried
/// once more before the error is returned.
fn union_with_repair<E: GeometryEngine>(
    engine: &E,
    join_key: &JoinKey,
    parts: Vec<E::Geometry>,
) -> Result<E::Geometry> {
    let union = |parts: Vec<E::Geometry>| -> Result<E::Geometry> {
        let geometry = engine.union(parts)?;
        engine.validate(&geometry)?;
        Ok(geometry)
    };

    match union(parts.clone()) {
        Ok(geometry) => Ok(geometry),
        Err(err) => {
            log::debug!("Union of `{join_key}` failed ({err}), retrying with repaired parts");
            let repaired = parts.iter().map(|part| engine.repair(part)).collect();
            union(repaired).map_err(|err| err.with_key(join_key.as_str()))
        }
    }
}
