use geo::BoundingRect;
use geo_types::MultiPolygon;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

type Entry = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// R-tree over the bounding boxes of a set of geometries.
pub(super) struct EnvelopeIndex {
    tree: RTree<Entry>,
}

pub(super) fn envelope(geometry: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    let rect = geometry.bounding_rect()?;
    // rstar cannot order NaN envelopes
    let corners = [rect.min().x, rect.min().y, rect.max().x, rect.max().y];
    if corners.iter().any(|c| !c.is_finite()) {
        return None;
    }

    Some(AABB::from_corners(
        [rect.min().x, rect.min().y],
        [rect.max().x, rect.max().y],
    ))
}

impl EnvelopeIndex {
    pub(super) fn build(geometries: &[&MultiPolygon<f64>]) -> Self {
        let entries: Vec<Entry> = geometries
            .iter()
            .enumerate()
            .filter_map(|(index, geometry)| {
                let env = envelope(geometry)?;
                Some(GeomWithData::new(
                    Rectangle::from_corners(env.lower(), env.upper()),
                    index,
                ))
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Indices of the geometries whose bounding boxes intersect the geometry's bounding box, in ascending order.
    pub(super) fn candidates(&self, geometry: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(env) = envelope(geometry) else {
            return vec![];
        };

        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&env)
            .map(|entry| entry.data)
            .collect();
        found.sort_unstable();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, MultiPolygon};

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]])
    }

    #[test]
    fn finds_overlapping_envelopes() {
        let geometries = [square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0), square(0.5, 0.5, 1.0)];
        let refs: Vec<_> = geometries.iter().collect();
        let index = EnvelopeIndex::build(&refs);

        assert_eq!(index.candidates(&square(0.2, 0.2, 0.1)), vec![0]);
        assert_eq!(index.candidates(&square(0.9, 0.9, 0.2)), vec![0, 2]);
        assert!(index.candidates(&square(10.0, 10.0, 1.0)).is_empty());
    }

    #[test]
    fn empty_geometry_has_no_candidates() {
        let geometries = [square(0.0, 0.0, 1.0)];
        let refs: Vec<_> = geometries.iter().collect();
        let index = EnvelopeIndex::build(&refs);

        assert!(index.candidates(&MultiPolygon::new(vec![])).is_empty());
    }
}
