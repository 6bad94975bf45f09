/// Snapshot-based undo/redo for observable state containers.
///
/// Provides a `HistoryManager` that subscribes to a container's mutation
/// notifications, records a serialized snapshot after every external change,
/// and replays snapshots on undo/redo without recording the replay itself.
/// History lives in memory only and is owned by one manager per container.
pub mod config;
pub mod container;
pub mod manager;
pub mod snapshot;

pub use config::HistoryConfig;
pub use container::{MutationCallback, Observable, SubscriptionId};
pub use manager::{HistoryManager, ReplayMode};
pub use snapshot::{Snapshot, SnapshotFormat};
