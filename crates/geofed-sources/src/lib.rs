//! Data layer for the geofed search coordinator.
//!
//! This crate owns everything the coordinator treats as "given": the configured
//! [`Source`]s and their [`SourceRegistry`], the [`Feature`] and [`Geometry`] model
//! returned by fetches, the user [`SearchOptions`], the [`SpatialFilter`] value that
//! constrains a fetch, and the [`FeatureFetcher`] / [`VisibleLayers`] capabilities the
//! coordinator calls into.
//!
//! A small in-memory backend ([`MemoryFetcher`]) and sample datasets ([`test_data`])
//! are included so the coordinator can be exercised without a WFS server.

pub mod feature;
pub mod fetch;
pub mod geometry;
pub mod memory;
pub mod options;
pub mod registry;
pub mod source;
pub mod spatial;
pub mod test_data;

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum SourceError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Duplicate source id '{0}' in source configuration")]
        DuplicateSourceId(String),
        #[error("Source '{0}' has no search fields configured")]
        NoSearchFields(String),
    }

    pub type Result<T> = std::result::Result<T, SourceError>;
}

pub use error::{Result, SourceError};

pub use feature::{Feature, FeatureCollectionResult, FeatureLabels, FetchFailure, Origin};
pub use fetch::{FeatureFetcher, FetchRequest, FetchResponse, VisibleLayers};
pub use geometry::{BoundingBox, Coord, Geometry};
pub use memory::MemoryFetcher;
pub use options::{SearchOptions, SpatialRelation};
pub use registry::SourceRegistry;
pub use source::Source;
pub use spatial::{SpatialFilter, SpatialFilterKind};
