use alerta_types::Crs;

use crate::engine::GeometryEngine;
use crate::error::Result;
use crate::feature::FeatureCollection;

/// Converts feature coordinates into another coordinate system.
#[derive(Debug, Clone)]
pub struct CrsReprojector {
    target: Crs,
}

impl CrsReprojector {
    /// Creates a reprojector into the `target` system.
    pub fn new(target: Crs) -> Self {
        Self { target }
    }

    /// Target coordinate system.
    pub fn target(&self) -> &Crs {
        &self.target
    }

    /// Transforms every geometry into the target system. Feature count, order, ids and attributes are kept.
    ///
    /// The transformation is resolved before any feature is touched, so a missing transform path is reported
    /// even for an empty collection.
    pub fn reproject<E: GeometryEngine>(
        &self,
        engine: &E,
        features: FeatureCollection<E::Geometry>,
    ) -> Result<FeatureCollection<E::Geometry>> {
        let projection = engine.transformation(features.crs(), &self.target)?;
        log::debug!(
            "Transforming {} features from {} to {}",
            features.len(),
            features.crs(),
            self.target
        );

        features.try_map_geometries(self.target.clone(), |feature| {
            engine.transform(&feature.geometry, projection.as_ref())
        })
    }
}
