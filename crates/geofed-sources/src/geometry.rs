//! Minimal GeoJSON-like geometry model.
//!
//! The coordinator never renders or reprojects geometries; it only carries them
//! between the drawing surface, the fetch layer and the highlight output. The one
//! piece of geometry logic it needs is a bounding box, which the in-memory fetcher
//! uses to evaluate spatial relations.

use serde::{Deserialize, Serialize};

/// `[x, y]` in the map's coordinate reference system.
pub type Coord = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    /// Drawn circle. Not part of GeoJSON, but the drawing surface produces it.
    Circle { center: Coord, radius: f64 },
}

impl Geometry {
    /// Axis-aligned bounding box, `None` for geometries without coordinates.
    #[must_use]
    pub fn bbox(&self) -> Option<BoundingBox> {
        match self {
            Self::Point(c) => Some(BoundingBox::from_coord(*c)),
            Self::LineString(coords) => BoundingBox::from_coords(coords.iter().copied()),
            Self::Polygon(rings) => BoundingBox::from_coords(rings.iter().flatten().copied()),
            Self::MultiPolygon(polygons) => {
                BoundingBox::from_coords(polygons.iter().flatten().flatten().copied())
            }
            Self::Circle { center, radius } => Some(BoundingBox {
                min_x: center[0] - radius,
                min_y: center[1] - radius,
                max_x: center[0] + radius,
                max_y: center[1] + radius,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn from_coord(c: Coord) -> Self {
        Self {
            min_x: c[0],
            min_y: c[1],
            max_x: c[0],
            max_y: c[1],
        }
    }

    pub fn from_coords(coords: impl IntoIterator<Item = Coord>) -> Option<Self> {
        coords
            .into_iter()
            .map(Self::from_coord)
            .reduce(|acc, b| acc.union(&b))
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// True when `other` lies entirely inside `self` (edges inclusive).
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }
}
