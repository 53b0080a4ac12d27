/// Reference ellipsoid of a coordinate system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datum {
    name: &'static str,
    semimajor: f64,
    inv_flattening: f64,
}

impl Datum {
    /// World Geodetic System 1984.
    pub const WGS84: Self = Datum {
        name: "WGS84",
        semimajor: 6_378_137.0,
        inv_flattening: 298.257223563,
    };

    /// SIRGAS 2000 uses the GRS 1980 ellipsoid.
    pub const SIRGAS2000: Self = Datum {
        name: "GRS80",
        semimajor: 6_378_137.0,
        inv_flattening: 298.257222101,
    };

    /// Name of the ellipsoid as understood by the projection backend (`ellps=` parameter).
    pub fn ellipsoid(&self) -> &'static str {
        self.name
    }

    /// Semi-major axis in metres.
    pub fn semimajor(&self) -> f64 {
        self.semimajor
    }

    /// Inverse flattening.
    pub fn inv_flattening(&self) -> f64 {
        self.inv_flattening
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::WGS84
    }
}
