//! Spatial filter state machine.
//!
//! ```text
//!   Idle ──start_drawing──▶ Drawing(tool) ──complete──▶ Active(filter)
//!    ▲                          │                           │
//!    └────────abort─────────────┘◀──────clear / new text────┘
//! ```
//!
//! At most one filter is active: starting a new drawing clears the previous filter.
//! The drawing interaction itself lives behind [`DrawingSurface`].

use async_trait::async_trait;
use geofed_sources::{Feature, SpatialFilter, SpatialFilterKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpatialError {
    #[error("No drawing in progress")]
    NotDrawing,
    #[error("The {0} tool produced no geometry")]
    EmptyShape(SpatialFilterKind),
}

/// Extra spatial search affordance contributed by a plugin adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialToolDescriptor {
    pub name: String,
    pub label: String,
    /// Kind of filter the tool's shapes turn into
    pub filter_kind: SpatialFilterKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpatialTool {
    Polygon,
    Circle,
    Select,
    Extent,
    Plugin(SpatialToolDescriptor),
}

impl SpatialTool {
    pub fn filter_kind(&self) -> SpatialFilterKind {
        match self {
            Self::Polygon => SpatialFilterKind::Polygon,
            Self::Circle => SpatialFilterKind::Circle,
            Self::Select => SpatialFilterKind::Select,
            Self::Extent => SpatialFilterKind::Extent,
            Self::Plugin(descriptor) => descriptor.filter_kind,
        }
    }
}

/// Map interaction that eventually yields the drawn shape or the selected features.
///
/// The returned future may never complete (the user walks away); the coordinator
/// aborts it when the drawing is cancelled or superseded.
#[async_trait]
pub trait DrawingSurface: Send + Sync {
    async fn start_drawing(&self, tool: &SpatialTool) -> anyhow::Result<Vec<Feature>>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SpatialState {
    #[default]
    Idle,
    Drawing(SpatialTool),
    Active(SpatialFilter),
}

#[derive(Debug, Clone, Default)]
pub struct SpatialFilterController {
    state: SpatialState,
}

impl SpatialFilterController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SpatialState {
        &self.state
    }

    pub fn current_filter(&self) -> Option<&SpatialFilter> {
        match &self.state {
            SpatialState::Active(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, SpatialState::Drawing(_))
    }

    /// Enter `Drawing(tool)`. Returns the filter this supersedes, if any.
    pub fn start_drawing(&mut self, tool: SpatialTool) -> Option<SpatialFilter> {
        debug!(?tool, "Spatial tool selected");
        match std::mem::replace(&mut self.state, SpatialState::Drawing(tool)) {
            SpatialState::Active(previous) => Some(previous),
            _ => None,
        }
    }

    /// Turn the drawn or selected features into the active filter.
    ///
    /// Features without geometry are ignored; if none has one the controller falls
    /// back to `Idle`.
    pub fn complete(&mut self, features: Vec<Feature>) -> Result<SpatialFilter, SpatialError> {
        let SpatialState::Drawing(tool) = &self.state else {
            return Err(SpatialError::NotDrawing);
        };
        let kind = tool.filter_kind();
        let geometries: Vec<_> = features.into_iter().filter_map(|f| f.geometry).collect();
        if geometries.is_empty() {
            self.state = SpatialState::Idle;
            return Err(SpatialError::EmptyShape(kind));
        }
        let filter = SpatialFilter::new(kind, geometries);
        self.state = SpatialState::Active(filter.clone());
        Ok(filter)
    }

    /// Install an externally supplied filter, cancelling any drawing.
    pub fn activate(&mut self, filter: SpatialFilter) {
        self.state = SpatialState::Active(filter);
    }

    /// Cancel an in-progress drawing. Returns false when nothing was being drawn.
    pub fn abort(&mut self) -> bool {
        if self.is_drawing() {
            self.state = SpatialState::Idle;
            true
        } else {
            false
        }
    }

    /// Back to `Idle` from any state. Returns false when already idle.
    pub fn clear(&mut self) -> bool {
        !matches!(
            std::mem::take(&mut self.state),
            SpatialState::Idle
        )
    }
}
