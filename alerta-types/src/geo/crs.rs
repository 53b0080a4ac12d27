use std::fmt::{Display, Formatter};

use geo_types::Coord;

use crate::error::TypesError;
use crate::geo::datum::Datum;
use crate::geo::impls::projection::IdentityProjection;
use crate::geo::traits::projection::{ChainProjection, CoordProjection, InvertedProjection};

/// Coordinate reference system identified by an EPSG authority code.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    code: u32,
    datum: Datum,
    projection_type: ProjectionType,
}

/// Kind of units a coordinate system works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrsKind {
    /// Longitude and latitude in degrees.
    Geographic,
    /// Planar coordinates in metres.
    Projected,
}

/// How coordinates of a [`Crs`] are obtained from geographic coordinates on its datum.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProjectionType {
    /// No projection, coordinates are longitude and latitude.
    None,
    /// Universal Transverse Mercator.
    Utm {
        /// Zone number, 1 to 60.
        zone: u8,
        /// Southern hemisphere zone (false northing of 10 000 km).
        south: bool,
    },
    /// Any other projection, given as a geodesy operator definition.
    Other(String),
}

const SIRGAS2000_UTM_SOUTH: std::ops::RangeInclusive<u32> = 31978..=31985;
const WGS84_UTM_NORTH: std::ops::RangeInclusive<u32> = 32601..=32660;
const WGS84_UTM_SOUTH: std::ops::RangeInclusive<u32> = 32701..=32760;

impl Crs {
    /// WGS 84 geographic coordinates (EPSG:4326).
    pub const WGS84: Crs = Crs {
        code: 4326,
        datum: Datum::WGS84,
        projection_type: ProjectionType::None,
    };

    /// SIRGAS 2000 geographic coordinates (EPSG:4674).
    pub const SIRGAS2000: Crs = Crs {
        code: 4674,
        datum: Datum::SIRGAS2000,
        projection_type: ProjectionType::None,
    };

    /// SIRGAS 2000 / UTM zone 22S (EPSG:31982).
    pub const SIRGAS2000_UTM_22S: Crs = Crs {
        code: 31982,
        datum: Datum::SIRGAS2000,
        projection_type: ProjectionType::Utm {
            zone: 22,
            south: true,
        },
    };

    /// Looks the system up in the registry of supported EPSG codes.
    pub fn from_epsg(code: u32) -> Result<Crs, TypesError> {
        let crs = match code {
            4326 => Self::WGS84,
            4674 => Self::SIRGAS2000,
            c if SIRGAS2000_UTM_SOUTH.contains(&c) => Crs {
                code,
                datum: Datum::SIRGAS2000,
                projection_type: ProjectionType::Utm {
                    // 31978 is zone 18S
                    zone: (c - 31978 + 18) as u8,
                    south: true,
                },
            },
            c if WGS84_UTM_NORTH.contains(&c) => Crs {
                code,
                datum: Datum::WGS84,
                projection_type: ProjectionType::Utm {
                    zone: (c - 32600) as u8,
                    south: false,
                },
            },
            c if WGS84_UTM_SOUTH.contains(&c) => Crs {
                code,
                datum: Datum::WGS84,
                projection_type: ProjectionType::Utm {
                    zone: (c - 32700) as u8,
                    south: true,
                },
            },
            _ => return Err(TypesError::UnknownCrs(code)),
        };

        Ok(crs)
    }

    /// Creates a projected system from a geodesy operator definition.
    ///
    /// The definition must take geographic coordinates on `datum` and produce metric coordinates.
    pub fn custom(code: u32, datum: Datum, definition: impl Into<String>) -> Crs {
        Crs {
            code,
            datum,
            projection_type: ProjectionType::Other(definition.into()),
        }
    }

    /// Authority name. All supported systems come from the EPSG registry.
    pub fn authority(&self) -> &'static str {
        "EPSG"
    }

    /// Authority code of the system.
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Datum the system is defined on.
    pub fn datum(&self) -> Datum {
        self.datum
    }

    /// Projection type of the system.
    pub fn projection_type(&self) -> &ProjectionType {
        &self.projection_type
    }

    /// Whether coordinates are degrees or metres.
    pub fn kind(&self) -> CrsKind {
        match self.projection_type {
            ProjectionType::None => CrsKind::Geographic,
            _ => CrsKind::Projected,
        }
    }

    /// Returns true for systems with metric coordinates.
    pub fn is_projected(&self) -> bool {
        self.kind() == CrsKind::Projected
    }

    /// Geodesy operator definition that projects geographic coordinates on the datum into this system.
    ///
    /// Returns `None` for geographic systems.
    pub fn definition(&self) -> Option<String> {
        match &self.projection_type {
            ProjectionType::None => None,
            ProjectionType::Utm { zone, south } => Some(format!(
                "utm zone={zone}{} ellps={}",
                if *south { " south" } else { "" },
                self.datum.ellipsoid()
            )),
            ProjectionType::Other(definition) => Some(definition.clone()),
        }
    }

    /// Projection from geographic coordinates into this system.
    ///
    /// Returns `None` for geographic systems.
    pub fn get_projection(&self) -> Result<Option<Box<CoordProjection>>, TypesError> {
        match self.definition() {
            None => Ok(None),
            Some(definition) => Ok(Some(projection_from_definition(&definition)?)),
        }
    }

    /// Builds the coordinate conversion from this system into `target`.
    pub fn transformation_to(&self, target: &Crs) -> Result<Box<CoordProjection>, TypesError> {
        if self.code == target.code {
            return Ok(Box::new(IdentityProjection::<Coord<f64>>::new()));
        }

        let no_transform = |_| TypesError::NoTransform {
            from: self.to_string(),
            to: target.to_string(),
        };
        let source_projection = self.get_projection().map_err(no_transform)?;
        let target_projection = target.get_projection().map_err(no_transform)?;

        let projection: Box<CoordProjection> = match (source_projection, target_projection) {
            // Both supported geographic systems are realised on the same reference frame to well below the
            // precision of the source data, so no datum shift is applied.
            (None, None) => Box::new(IdentityProjection::<Coord<f64>>::new()),
            (None, Some(forward)) => forward,
            (Some(source), None) => Box::new(InvertedProjection::new(source)),
            (Some(source), Some(forward)) => Box::new(ChainProjection::new(
                Box::new(InvertedProjection::new(source)),
                forward,
            )),
        };

        Ok(projection)
    }
}

#[cfg(feature = "geodesy")]
fn projection_from_definition(definition: &str) -> Result<Box<CoordProjection>, TypesError> {
    use crate::geo::impls::projection::GeodesyProjection;

    Ok(Box::new(GeodesyProjection::new(definition)?))
}

#[cfg(not(feature = "geodesy"))]
fn projection_from_definition(definition: &str) -> Result<Box<CoordProjection>, TypesError> {
    Err(TypesError::Definition(definition.to_string()))
}

impl Display for Crs {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.authority(), self.code)
    }
}
