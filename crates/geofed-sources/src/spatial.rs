use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, Geometry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialFilterKind {
    Polygon,
    Circle,
    Select,
    Extent,
}

impl fmt::Display for SpatialFilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Polygon => "Polygon",
            Self::Circle => "Circle",
            Self::Select => "Select",
            Self::Extent => "Extent",
        };
        f.write_str(name)
    }
}

/// A geometry-based constraint narrowing which features are eligible for a search.
///
/// `Select` filters usually carry several geometries (one per selected feature),
/// the drawn kinds carry exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFilter {
    pub kind: SpatialFilterKind,
    pub geometries: Vec<Geometry>,
}

impl SpatialFilter {
    pub fn new(kind: SpatialFilterKind, geometries: Vec<Geometry>) -> Self {
        Self { kind, geometries }
    }

    /// Bounding box enclosing every geometry of the filter.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.geometries
            .iter()
            .filter_map(Geometry::bbox)
            .reduce(|acc, b| acc.union(&b))
    }
}
