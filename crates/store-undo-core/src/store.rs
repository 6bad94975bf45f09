/// Observable state container.
///
/// A `Store` owns one state value and notifies subscribers synchronously
/// after every mutation, including whole-state replacement. This is the
/// container a `HistoryManager` attaches to.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Result;
use store_undo_mod_history::{MutationCallback, Observable, SubscriptionId};

type Slot<S> = Rc<RefCell<MutationCallback<S>>>;

/// A named, observable state container.
///
/// Subscribers run in registration order with read access to the new state.
/// They must not mutate the same store from inside the callback.
pub struct Store<S> {
    id: String,
    state: RefCell<S>,
    subscribers: RefCell<Vec<(SubscriptionId, Slot<S>)>>,
    next_subscription: Cell<u64>,
}

impl<S> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

impl<S> Store<S> {
    /// Creates a store with the given id and initial state.
    pub fn new(id: impl Into<String>, state: S) -> Self {
        Self {
            id: id.into(),
            state: RefCell::new(state),
            subscribers: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
        }
    }

    /// Returns the store id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Applies `f` to the state, then notifies subscribers.
    ///
    /// # Errors
    ///
    /// Returns the first subscriber error. The mutation itself is kept and
    /// every subscriber still runs.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R> {
        let out = f(&mut *self.state.borrow_mut());
        self.notify()?;
        Ok(out)
    }

    /// Runs `f` with read access to the state.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&*self.state.borrow())
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn notify(&self) -> Result<()> {
        // Clone the list so callbacks may subscribe or unsubscribe.
        let slots: Vec<Slot<S>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, slot)| Rc::clone(slot))
            .collect();

        let state = self.state.borrow();
        let mut first_error = None;
        for slot in slots {
            let mut callback = slot.borrow_mut();
            if let Err(e) = (*callback)(&*state) {
                tracing::warn!("Subscriber of store '{}' failed: {e:#}", self.id);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<S: Clone> Store<S> {
    /// Returns a clone of the current state.
    pub fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }
}

impl<S> Observable for Store<S> {
    type State = S;

    fn subscribe(&self, callback: MutationCallback<S>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscribers
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(callback))));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    fn replace_state(&self, state: S) -> Result<()> {
        *self.state.borrow_mut() = state;
        self.notify()
    }

    fn read_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.read(f)
    }
}
