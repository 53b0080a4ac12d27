//! Validity checks and repair of polygonal geometry.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{BooleanOps, MapCoords, RemoveRepeatedPoints};
use geo_types::{Coord, Line, LineString, MultiPolygon, Polygon};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

/// Reason a geometry is not valid.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Invalidity {
    NonFinite,
    TooFewPoints { polygon: usize, ring: usize },
    NotClosed { polygon: usize, ring: usize },
    ZeroArea { polygon: usize, ring: usize },
    SelfIntersection { polygon: usize, ring: usize, at: Coord<f64> },
}

impl std::fmt::Display for Invalidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite => write!(f, "non-finite coordinate"),
            Self::TooFewPoints { polygon, ring } => {
                write!(f, "ring {ring} of polygon {polygon} has fewer than 4 points")
            }
            Self::NotClosed { polygon, ring } => {
                write!(f, "ring {ring} of polygon {polygon} is not closed")
            }
            Self::ZeroArea { polygon, ring } => {
                write!(f, "ring {ring} of polygon {polygon} has zero area")
            }
            Self::SelfIntersection { polygon, ring, at } => write!(
                f,
                "ring {ring} of polygon {polygon} self-intersects near ({}, {})",
                at.x, at.y
            ),
        }
    }
}

/// Ring 0 is the exterior, rings 1.. are the interiors.
fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

pub(super) fn validate(geometry: &MultiPolygon<f64>) -> Result<(), Invalidity> {
    for (polygon_index, polygon) in geometry.0.iter().enumerate() {
        for (ring_index, ring) in rings(polygon).enumerate() {
            validate_ring(ring).map_err(|err| match err {
                RingError::NonFinite => Invalidity::NonFinite,
                RingError::TooFewPoints => Invalidity::TooFewPoints {
                    polygon: polygon_index,
                    ring: ring_index,
                },
                RingError::NotClosed => Invalidity::NotClosed {
                    polygon: polygon_index,
                    ring: ring_index,
                },
                RingError::ZeroArea => Invalidity::ZeroArea {
                    polygon: polygon_index,
                    ring: ring_index,
                },
                RingError::SelfIntersection(at) => Invalidity::SelfIntersection {
                    polygon: polygon_index,
                    ring: ring_index,
                    at,
                },
            })?;
        }
    }

    Ok(())
}

enum RingError {
    NonFinite,
    TooFewPoints,
    NotClosed,
    ZeroArea,
    SelfIntersection(Coord<f64>),
}

fn validate_ring(ring: &LineString<f64>) -> Result<(), RingError> {
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(RingError::NonFinite);
    }

    if ring.0.len() < 4 {
        return Err(RingError::TooFewPoints);
    }

    if !ring.is_closed() {
        return Err(RingError::NotClosed);
    }

    if ring_area_signed(ring) == 0.0 {
        return Err(RingError::ZeroArea);
    }

    if let Some(at) = find_self_intersection(ring) {
        return Err(RingError::SelfIntersection(at));
    }

    Ok(())
}

/// Shoelace formula over the closed ring.
pub(super) fn ring_area_signed(ring: &LineString<f64>) -> f64 {
    let mut iter = ring.0.iter();
    let Some(mut prev) = iter.next() else {
        return 0.0;
    };

    let mut aggr = 0.0;
    for p in iter {
        aggr += prev.x * p.y - p.x * prev.y;
        prev = p;
    }

    aggr / 2.0
}

type SegmentEntry = GeomWithData<Rectangle<[f64; 2]>, usize>;

fn find_self_intersection(ring: &LineString<f64>) -> Option<Coord<f64>> {
    // zero-length segments come from repeated points, which are allowed
    let segments: Vec<Line<f64>> = ring.lines().filter(|l| l.start != l.end).collect();
    let count = segments.len();
    if count < 3 {
        return None;
    }

    let entries: Vec<SegmentEntry> = segments
        .iter()
        .enumerate()
        .map(|(i, s)| GeomWithData::new(Rectangle::from_corners(s.start.into(), s.end.into()), i))
        .collect();
    let tree = RTree::bulk_load(entries);

    for (i, segment) in segments.iter().enumerate() {
        let envelope = AABB::from_corners(segment.start.into(), segment.end.into());
        for candidate in tree.locate_in_envelope_intersecting(&envelope) {
            let j = candidate.data;
            if j <= i {
                continue;
            }

            // touching at a vertex is allowed, only proper crossings and overlaps are reported
            match line_intersection(*segment, segments[j]) {
                None => {}
                Some(LineIntersection::SinglePoint {
                    intersection,
                    is_proper: true,
                }) => return Some(intersection),
                Some(LineIntersection::SinglePoint { .. }) => {}
                Some(LineIntersection::Collinear { intersection }) => {
                    return Some(intersection.start)
                }
            }
        }
    }

    None
}

/// Snaps coordinates to the grid, removes repeated points and degenerate rings, and resolves self-intersections.
pub(super) fn repair(geometry: &MultiPolygon<f64>, snap_grid: f64) -> MultiPolygon<f64> {
    let snapped = if snap_grid > 0.0 {
        geometry.map_coords(|c| Coord {
            x: (c.x / snap_grid).round() * snap_grid,
            y: (c.y / snap_grid).round() * snap_grid,
        })
    } else {
        geometry.clone()
    };

    let deduplicated = snapped.remove_repeated_points();

    let polygons: Vec<Polygon<f64>> = deduplicated
        .0
        .into_iter()
        .filter_map(|polygon| {
            let (exterior, interiors) = polygon.into_inner();
            let exterior = clean_ring(exterior)?;
            let interiors = interiors.into_iter().filter_map(clean_ring).collect();
            Some(Polygon::new(exterior, interiors))
        })
        .collect();

    // The boolean overlay rebuilds ring topology, splitting self-intersecting rings into valid parts.
    MultiPolygon::new(polygons).union(&MultiPolygon::new(vec![]))
}

fn clean_ring(mut ring: LineString<f64>) -> Option<LineString<f64>> {
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return None;
    }

    ring.close();
    if ring.0.len() < 4 || ring_area_signed(&ring) == 0.0 {
        return None;
    }

    Some(ring)
}
