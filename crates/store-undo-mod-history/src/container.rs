/// The contract a state container must honor to be tracked by a
/// `HistoryManager`.
use anyhow::Result;

/// Handle returned by [`Observable::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked with the new state after every mutation.
///
/// An error returned here is reported to whoever caused the mutation.
pub type MutationCallback<S> = Box<dyn FnMut(&S) -> Result<()>>;

/// An observable, whole-state-replaceable container.
///
/// Notifications must be synchronous: every subscriber has run by the time
/// a mutating call (including [`replace_state`](Observable::replace_state))
/// returns. The history manager's replay suppression relies on this.
pub trait Observable {
    type State;

    /// Registers `callback` to run after each mutation.
    fn subscribe(&self, callback: MutationCallback<Self::State>) -> SubscriptionId;

    /// Removes a subscription. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Swaps the entire state and notifies subscribers.
    ///
    /// The new state is applied even if a subscriber fails; the error
    /// reports that failure.
    fn replace_state(&self, state: Self::State) -> Result<()>;

    /// Runs `f` with read access to the live state.
    fn read_state<R>(&self, f: impl FnOnce(&Self::State) -> R) -> R;
}
