//! Map layers for pending edits.

use std::sync::Arc;

use crate::coord::Geometry;
use crate::staging::{StagedObject, StagingEvent, StagingObserver, StagingSnapshot};

/// Drawable layer identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    PendingSave,
    PendingDelete,
}

impl LayerId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingSave => "pending-save",
            Self::PendingDelete => "pending-delete",
        }
    }
}

/// How a layer is painted.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStyle {
    /// `#rrggbb`
    pub color: String,
    pub line_width: f32,
    pub opacity: f32,
}

impl LayerStyle {
    pub fn pending_save() -> Self {
        Self {
            color: "#1e90ff".to_string(),
            line_width: 3.0,
            opacity: 0.8,
        }
    }

    pub fn pending_delete() -> Self {
        Self {
            color: "#dc143c".to_string(),
            line_width: 3.0,
            opacity: 0.6,
        }
    }
}

/// Rendering surface that accepts geometry layers.
pub trait LayerSink: Send + Sync {
    fn add_layer(&self, id: LayerId, style: &LayerStyle, geometries: Vec<Geometry>);
    fn remove_layer(&self, id: LayerId);
}

/// Redraws the pending-edit layers whenever the staging store changes.
pub struct SavedLayerPresenter {
    sink: Arc<dyn LayerSink>,
}

impl SavedLayerPresenter {
    pub fn new(sink: Arc<dyn LayerSink>) -> Self {
        Self { sink }
    }

    /// Draws both layers from `snapshot`, replacing what was there.
    pub fn redraw(&self, snapshot: &StagingSnapshot) {
        self.replace(LayerId::PendingSave, &LayerStyle::pending_save(), &snapshot.saves);
        self.replace(LayerId::PendingDelete, &LayerStyle::pending_delete(), &snapshot.deletes);
    }

    fn replace(&self, id: LayerId, style: &LayerStyle, objects: &[StagedObject]) {
        self.sink.remove_layer(id);
        let geometries: Vec<Geometry> = objects.iter().filter_map(|o| o.geometry.clone()).collect();
        if !geometries.is_empty() {
            self.sink.add_layer(id, style, geometries);
        }
    }
}

impl StagingObserver for SavedLayerPresenter {
    fn staging_changed(&self, _event: &StagingEvent, snapshot: &StagingSnapshot) {
        self.redraw(snapshot);
    }
}
