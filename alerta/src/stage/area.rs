use crate::engine::GeometryEngine;
use crate::error::{AlertaError, Result};
use crate::feature::{AttributeValue, FeatureCollection};

/// Name of the attribute holding the area in hectares.
pub const AREA_FIELD: &str = "area_ha";

/// Square metres in a hectare.
pub const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// Adds the planar area in hectares to every feature.
#[derive(Debug, Clone, Default)]
pub struct AreaCalculator;

impl AreaCalculator {
    /// Sets `area_ha = planar_area / 10 000` on every feature.
    ///
    /// The collection must be in a projected system with metric units. Areas of geographic coordinates are
    /// meaningless and are rejected with [`AlertaError::Precondition`].
    pub fn compute_area_ha<E: GeometryEngine>(
        &self,
        engine: &E,
        mut features: FeatureCollection<E::Geometry>,
    ) -> Result<FeatureCollection<E::Geometry>> {
        if !features.crs().is_projected() {
            return Err(AlertaError::Precondition(format!(
                "area can only be computed in a projected coordinate system, got {}",
                features.crs()
            )));
        }

        features.add_field(AREA_FIELD);
        for feature in features.features_mut() {
            let area = engine.planar_area(&feature.geometry) / SQUARE_METRES_PER_HECTARE;
            feature
                .attributes
                .insert(AREA_FIELD.to_string(), AttributeValue::Float(area));
        }

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes;
    use crate::engine::{GeoEngine, GeoEngineOptions};
    use alerta_types::Crs;
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    use geo_types::{polygon, MultiPolygon};

    fn square(side: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 500_000.0, y: 8_900_000.0),
            (x: 500_000.0 + side, y: 8_900_000.0),
            (x: 500_000.0 + side, y: 8_900_000.0 + side),
            (x: 500_000.0, y: 8_900_000.0 + side),
            (x: 500_000.0, y: 8_900_000.0),
        ]])
    }

    fn area_of(fc: &FeatureCollection<MultiPolygon<f64>>, index: usize) -> f64 {
        fc.features()[index]
            .get(AREA_FIELD)
            .and_then(|v| v.as_f64())
            .unwrap()
    }

    #[test]
    fn hectares_scale_with_square_of_side() {
        let engine = GeoEngine::open(GeoEngineOptions::default()).unwrap();
        let mut fc = FeatureCollection::new(Crs::SIRGAS2000_UTM_22S, ["cod_imovel"]);
        fc.push(attributes! { "cod_imovel" => "A" }, square(100.0));
        fc.push(attributes! { "cod_imovel" => "B" }, square(200.0));
        fc.push(attributes! { "cod_imovel" => "C" }, MultiPolygon::new(vec![]));

        let result = AreaCalculator.compute_area_ha(&engine, fc).unwrap();

        assert_eq!(result.schema(), ["cod_imovel", AREA_FIELD]);
        assert_relative_eq!(area_of(&result, 0), 1.0, epsilon = 1e-9);
        assert_relative_eq!(area_of(&result, 1), 4.0 * area_of(&result, 0), epsilon = 1e-9);
        assert_eq!(area_of(&result, 2), 0.0);
        assert!(result.iter().all(|f| f
            .get(AREA_FIELD)
            .and_then(|v| v.as_f64())
            .is_some_and(|area| area >= 0.0)));
    }

    #[test]
    fn geographic_crs_is_rejected() {
        let engine = GeoEngine::open(GeoEngineOptions::default()).unwrap();
        let fc: FeatureCollection<MultiPolygon<f64>> =
            FeatureCollection::new(Crs::SIRGAS2000, ["cod_imovel"]);

        assert_matches!(
            AreaCalculator.compute_area_ha(&engine, fc),
            Err(AlertaError::Precondition(_))
        );
    }
}
