/// Configuration for the history system.
use serde::{Deserialize, Serialize};

use crate::snapshot::SnapshotFormat;

/// Whether round-trip verification runs on every capture by default.
const DEFAULT_VERIFY_ROUND_TRIP: bool = true;

/// Configuration for a `HistoryManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Whether the container gets undo/redo at all.
    pub enabled: bool,
    /// Snapshot encoding.
    pub format: SnapshotFormat,
    /// Max snapshots kept in the history stack. `None` = unbounded.
    pub max_depth: Option<usize>,
    /// Decode each new snapshot once before accepting it.
    pub verify_round_trip: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: SnapshotFormat::default(),
            max_depth: None,
            verify_round_trip: DEFAULT_VERIFY_ROUND_TRIP,
        }
    }
}

impl HistoryConfig {
    /// Clamps `max_depth` so the seed snapshot always fits.
    pub fn sanitize(&mut self) {
        if let Some(depth) = self.max_depth.as_mut() {
            *depth = (*depth).max(1);
        }
    }
}
