use std::path::Path;

use super::area::AREA_FIELD;
use crate::engine::GeometryEngine;
use crate::error::Result;
use crate::feature::{Attributes, FeatureCollection};

/// Persists the final feature table.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    key_field: String,
    layer_name: String,
}

impl ResultWriter {
    /// Creates a writer of `(key_field, area_ha, geometry)` tables into a layer with the given name.
    pub fn new(key_field: impl Into<String>, layer_name: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            layer_name: layer_name.into(),
        }
    }

    /// Writes the key, the area and the geometry of every feature to `destination`, replacing an existing file.
    ///
    /// Other attributes are not written. Fails with a schema error if the key or the area column is missing.
    pub fn write<E: GeometryEngine>(
        &self,
        engine: &E,
        features: &FeatureCollection<E::Geometry>,
        destination: &Path,
    ) -> Result<()> {
        let columns = [self.key_field.as_str(), AREA_FIELD];
        for column in columns {
            features.require_field(column)?;
        }

        log::debug!(
            "Writing {} features to {} (layer `{}`)",
            features.len(),
            destination.display(),
            self.layer_name
        );

        if features.schema().iter().map(String::as_str).eq(columns) {
            return engine.write(features, destination, &self.layer_name);
        }

        let mut table = FeatureCollection::new(features.crs().clone(), columns);
        for feature in features.iter() {
            let attributes: Attributes = columns
                .iter()
                .filter_map(|&name| Some((name.to_string(), feature.get(name)?.clone())))
                .collect();
            table.push(attributes, feature.geometry.clone());
        }

        engine.write(&table, destination, &self.layer_name)
    }
}
