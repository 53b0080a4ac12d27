use geo_types::Coord;
use geodesy::prelude::*;

use crate::error::TypesError;
use crate::geo::traits::projection::Projection;

/// Projection backed by a [`geodesy`] operator.
///
/// The input side works with geographic coordinates in degrees (`x = longitude`, `y = latitude`), the output side
/// with whatever the operator produces, metres for all cartographic projections.
pub struct GeodesyProjection {
    context: Minimal,
    op: OpHandle,
}

impl GeodesyProjection {
    /// Instantiates the operator from its definition, e.g. `utm zone=22 south ellps=GRS80`.
    pub fn new(definition: &str) -> Result<Self, TypesError> {
        let mut context = Minimal::new();
        let op = context
            .op(definition)
            .map_err(|_| TypesError::Definition(definition.to_string()))?;
        Ok(Self { context, op })
    }
}

impl Projection for GeodesyProjection {
    type InPoint = Coord<f64>;
    type OutPoint = Coord<f64>;

    fn project(&self, input: &Coord<f64>) -> Option<Coord<f64>> {
        let mut data = [Coor2D::geo(input.y, input.x)];
        self.context.apply(self.op, Fwd, &mut data).ok()?;

        if !data[0].0[0].is_finite() || !data[0].0[1].is_finite() {
            return None;
        }

        Some(Coord {
            x: data[0].0[0],
            y: data[0].0[1],
        })
    }

    fn unproject(&self, input: &Coord<f64>) -> Option<Coord<f64>> {
        let mut data = [Coor2D([input.x, input.y])];
        self.context.apply(self.op, Inv, &mut data).ok()?;

        let lon = data[0].0[0].to_degrees();
        let lat = data[0].0[1].to_degrees();
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }

        Some(Coord { x: lon, y: lat })
    }
}
