//! Trail/terrain predicates for [`FilterGroup`](crate::FilterGroup)s.

use crate::{Entity, VectorDocument, Way, KEY_HIGHWAY, KEY_LANDUSE};

/// Land-use values that are exported as terrain areas.
pub const AREA_LANDUSE_VALUES: &[&str] = &[
    "forest",
    "grass",
    "meadow",
    "reservoir",
    "farmland",
    "farmyard",
    "orchard",
    "vineyard",
    "residential",
    "industrial",
    "commercial",
    "quarry",
    "cemetery",
];

/// Highway values that are exported as trails.
pub const TRAIL_HIGHWAY_VALUES: &[&str] = &[
    "path",
    "footway",
    "track",
    "bridleway",
    "cycleway",
    "steps",
];

/// Entity carries a recognized land-use tag.
pub fn is_area<E: Entity>(entity: &E, _doc: &VectorDocument) -> bool {
    entity
        .tag(KEY_LANDUSE)
        .is_some_and(|v| AREA_LANDUSE_VALUES.contains(&v))
}

/// Entity carries a recognized path/trail tag.
pub fn is_trail<E: Entity>(entity: &E, _doc: &VectorDocument) -> bool {
    entity
        .tag(KEY_HIGHWAY)
        .is_some_and(|v| TRAIL_HIGHWAY_VALUES.contains(&v))
}

/// Lon/lat rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithinBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl WithinBounds {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    #[inline]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_x..=self.max_x).contains(&lon) && (self.min_y..=self.max_y).contains(&lat)
    }

    /// True if any node referenced by `way` lies inside the rectangle.
    /// Unknown references and nodes with malformed coordinates are skipped.
    pub fn matches_way(&self, way: &Way, doc: &VectorDocument) -> bool {
        way.refs()
            .iter()
            .filter_map(|&id| doc.node(id))
            .filter_map(|node| node.coordinates())
            .any(|(lon, lat)| self.contains(lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::SAMPLE;
    use crate::FilterGroup;

    #[test]
    fn area_and_trail_tags() {
        let doc = VectorDocument::from_xml(SAMPLE).unwrap();

        let areas: Vec<i64> = doc.ways().filter(|w| is_area(*w, &doc)).map(|w| w.id()).collect();
        let trails: Vec<i64> = doc.ways().filter(|w| is_trail(*w, &doc)).map(|w| w.id()).collect();

        assert_eq!(areas, vec![11]);
        // motorway is not a trail
        assert_eq!(trails, vec![10]);
    }

    #[test]
    fn bounds_match_any_referenced_node() {
        let doc = VectorDocument::from_xml(SAMPLE).unwrap();
        let bounds = WithinBounds::new(0.0, 5.0, 0.0, 5.0);

        assert!(bounds.matches_way(doc.way(10).unwrap(), &doc));
        // node 2 is inside, node 3 is not
        assert!(bounds.matches_way(doc.way(12).unwrap(), &doc));
        // node 3 is outside and node 4 has a malformed latitude
        assert!(!bounds.matches_way(doc.way(11).unwrap(), &doc));
    }

    #[test]
    fn bounds_are_inclusive() {
        let bounds = WithinBounds::new(0.0, 2.0, 1.0, 3.0);
        assert!(bounds.contains(0.0, 1.0));
        assert!(bounds.contains(2.0, 3.0));
        assert!(!bounds.contains(2.0001, 2.0));
    }

    #[test]
    fn grouped_with_document_filters() {
        let mut doc = VectorDocument::from_xml(SAMPLE).unwrap();
        let bounds = WithinBounds::new(0.0, 5.0, 0.0, 5.0);
        for kind in [is_area::<Way>, is_trail::<Way>] {
            doc.add_way_filter(
                FilterGroup::new()
                    .with(kind)
                    .with(move |w: &Way, d: &VectorDocument| bounds.matches_way(w, d)),
            );
        }
        doc.apply_filters();

        let mut ways: Vec<i64> = doc.included_ways().iter().copied().collect();
        ways.sort_unstable();
        assert_eq!(ways, vec![10]);
    }
}
