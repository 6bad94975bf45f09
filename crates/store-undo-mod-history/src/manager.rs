/// Snapshot-based undo/redo manager.
///
/// Every external mutation of the attached container is captured as a
/// serialized snapshot. Undo and redo replay stored snapshots back into the
/// container while capture is suppressed, so a replay never shows up as a
/// new history entry.
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::HistoryConfig;
use crate::container::{Observable, SubscriptionId};
use crate::snapshot::{Snapshot, SnapshotFormat};

/// What the manager is doing with its container right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    /// Mutations are external and get captured.
    #[default]
    Idle,
    /// An undo/redo is writing the container; mutations are not captured.
    Replaying,
}

/// The two stacks. `history` is oldest first and never empty once seeded.
#[derive(Debug, Default)]
struct Timeline {
    history: Vec<Snapshot>,
    future: Vec<Snapshot>,
}

/// State shared between the manager and its subscription callback.
#[derive(Debug)]
struct Recorder {
    timeline: RefCell<Timeline>,
    mode: Cell<ReplayMode>,
    config: HistoryConfig,
}

impl Recorder {
    /// Encodes `state`, optionally proving it decodes back to the same value.
    fn snapshot_of<S: Serialize + DeserializeOwned>(&self, state: &S) -> Result<Snapshot> {
        let snapshot = Snapshot::encode(self.config.format, state)?;
        if self.config.verify_round_trip {
            let restored: S = snapshot
                .decode()
                .context("Snapshot cannot be restored")?;
            let format = self.config.format;
            if fingerprint(format, state)? != fingerprint(format, &restored)? {
                bail!("Snapshot does not restore the captured state ({format:?} encoding is lossy)");
            }
        }
        Ok(snapshot)
    }

    /// Records a post-mutation state unless a replay caused the mutation.
    fn capture<S: Serialize + DeserializeOwned>(&self, state: &S) -> Result<()> {
        if self.mode.get() == ReplayMode::Replaying {
            return Ok(());
        }

        // Encode before touching the stacks so a failure leaves them intact
        let snapshot = self
            .snapshot_of(state)
            .context("Failed to capture state snapshot")?;

        let mut timeline = self.timeline.borrow_mut();
        timeline.history.push(snapshot);
        timeline.future.clear();

        if let Some(max) = self.config.max_depth {
            if timeline.history.len() > max {
                let excess = timeline.history.len() - max;
                timeline.history.drain(..excess);
                tracing::debug!("Evicted {excess} oldest snapshot(s)");
            }
        }
        tracing::trace!("Captured snapshot #{}", timeline.history.len());
        Ok(())
    }
}

/// Bytes that differ whenever two values serialize differently.
///
/// bincode keeps `Option` tags and exact float bits even where the snapshot
/// format folds them; types bincode cannot write fall back to `format`.
fn fingerprint<S: Serialize>(format: SnapshotFormat, value: &S) -> Result<Vec<u8>> {
    match bincode::serialize(value) {
        Ok(bytes) => Ok(bytes),
        Err(_) => Ok(Snapshot::encode(format, value)?.as_bytes().to_vec()),
    }
}

/// Holds the replay mode for as long as it lives.
struct ReplayGuard<'a> {
    mode: &'a Cell<ReplayMode>,
}

impl<'a> ReplayGuard<'a> {
    fn enter(mode: &'a Cell<ReplayMode>) -> Self {
        mode.set(ReplayMode::Replaying);
        Self { mode }
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.mode.set(ReplayMode::Idle);
    }
}

/// Manages undo/redo history for a single observable container.
///
/// Each container gets its own `HistoryManager` with independent stacks.
/// Dropping the manager releases its subscription.
pub struct HistoryManager<C: Observable> {
    container: Rc<C>,
    recorder: Rc<Recorder>,
    subscription: SubscriptionId,
}

impl<C: Observable> std::fmt::Debug for HistoryManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let timeline = self.recorder.timeline.borrow();
        f.debug_struct("HistoryManager")
            .field("history_len", &timeline.history.len())
            .field("future_len", &timeline.future.len())
            .field("mode", &self.recorder.mode.get())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl<C> HistoryManager<C>
where
    C: Observable + 'static,
    C::State: Serialize + DeserializeOwned + 'static,
{
    /// Attaches a manager with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the current state cannot be snapshotted.
    pub fn attach(container: Rc<C>) -> Result<Self> {
        Self::new(container, HistoryConfig::default())
    }

    /// Attaches a manager, seeding the history with the current state.
    ///
    /// The `enabled` flag is not consulted here; see [`HistoryManager::install`].
    ///
    /// # Errors
    ///
    /// Returns an error if the current state cannot be snapshotted.
    pub fn new(container: Rc<C>, mut config: HistoryConfig) -> Result<Self> {
        config.sanitize();
        let recorder = Rc::new(Recorder {
            timeline: RefCell::default(),
            mode: Cell::default(),
            config,
        });

        let seed = container
            .read_state(|state| recorder.snapshot_of(state))
            .context("Failed to capture initial state")?;
        recorder.timeline.borrow_mut().history.push(seed);

        let weak: Weak<Recorder> = Rc::downgrade(&recorder);
        let subscription = container.subscribe(Box::new(move |state: &C::State| {
            match weak.upgrade() {
                Some(recorder) => recorder.capture(state),
                None => Ok(()),
            }
        }));

        tracing::debug!("History attached ({subscription:?})");
        Ok(Self {
            container,
            recorder,
            subscription,
        })
    }

    /// Attaches a manager only if `config.enabled` is set.
    ///
    /// Returns `Ok(None)` for containers that opted out of history.
    ///
    /// # Errors
    ///
    /// Returns an error if the current state cannot be snapshotted.
    pub fn install(container: Rc<C>, config: HistoryConfig) -> Result<Option<Self>> {
        if !config.enabled {
            tracing::debug!("History disabled, not attaching");
            return Ok(None);
        }
        Self::new(container, config).map(Some)
    }

    /// Steps back to the previous snapshot.
    ///
    /// Returns `Ok(false)` when only the initial snapshot remains.
    ///
    /// # Errors
    ///
    /// Returns an error if the previous snapshot cannot be decoded (stacks
    /// and container are left untouched), or if a container subscriber fails
    /// while the restored state is applied (the step is still committed).
    pub fn undo(&mut self) -> Result<bool> {
        let previous: C::State = {
            let timeline = self.recorder.timeline.borrow();
            let [.., previous, _current] = timeline.history.as_slice() else {
                tracing::debug!("Nothing to undo");
                return Ok(false);
            };
            previous.decode().context("Failed to restore previous state")?
        };

        let applied = self.replay(previous);
        {
            let mut timeline = self.recorder.timeline.borrow_mut();
            if let Some(current) = timeline.history.pop() {
                timeline.future.push(current);
            }
        }
        applied.context("Container failed while applying undo")?;
        Ok(true)
    }

    /// Re-applies the most recently undone snapshot.
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`HistoryManager::undo`].
    pub fn redo(&mut self) -> Result<bool> {
        let next: C::State = {
            let timeline = self.recorder.timeline.borrow();
            let Some(next) = timeline.future.last() else {
                tracing::debug!("Nothing to redo");
                return Ok(false);
            };
            next.decode().context("Failed to restore next state")?
        };

        let applied = self.replay(next);
        {
            let mut timeline = self.recorder.timeline.borrow_mut();
            if let Some(next) = timeline.future.pop() {
                timeline.history.push(next);
            }
        }
        applied.context("Container failed while applying redo")?;
        Ok(true)
    }

    /// Drops all history and re-seeds it with the live state.
    ///
    /// # Errors
    ///
    /// Returns an error if the live state cannot be snapshotted; the
    /// existing history is kept in that case.
    pub fn clear(&mut self) -> Result<()> {
        let seed = self
            .container
            .read_state(|state| self.recorder.snapshot_of(state))
            .context("Failed to capture state for reset")?;
        let mut timeline = self.recorder.timeline.borrow_mut();
        timeline.history.clear();
        timeline.history.push(seed);
        timeline.future.clear();
        Ok(())
    }

    /// Writes `state` into the container with capture suppressed.
    fn replay(&self, state: C::State) -> Result<()> {
        let _guard = ReplayGuard::enter(&self.recorder.mode);
        self.container.replace_state(state)
    }
}

impl<C: Observable> HistoryManager<C> {
    /// Snapshots oldest to newest; the last one matches the live state.
    pub fn history(&self) -> Vec<Snapshot> {
        self.recorder.timeline.borrow().history.clone()
    }

    /// Undone snapshots; the last one is what `redo` applies next.
    pub fn future(&self) -> Vec<Snapshot> {
        self.recorder.timeline.borrow().future.clone()
    }

    /// Number of snapshots in the history stack.
    pub fn history_len(&self) -> usize {
        self.recorder.timeline.borrow().history.len()
    }

    /// Number of snapshots in the future stack.
    pub fn future_len(&self) -> usize {
        self.recorder.timeline.borrow().future.len()
    }

    pub fn can_undo(&self) -> bool {
        self.recorder.timeline.borrow().history.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.recorder.timeline.borrow().future.is_empty()
    }

    pub fn mode(&self) -> ReplayMode {
        self.recorder.mode.get()
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.recorder.config
    }

    pub fn container(&self) -> &Rc<C> {
        &self.container
    }
}

impl<C: Observable> Drop for HistoryManager<C> {
    fn drop(&mut self) {
        if !self.container.unsubscribe(self.subscription) {
            tracing::warn!("History subscription {:?} was already gone", self.subscription);
        }
    }
}
