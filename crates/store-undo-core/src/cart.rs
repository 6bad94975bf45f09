/// Shopping cart store with undo/redo history.
///
/// Each cart action is a single mutation of the underlying [`Store`], so
/// each one becomes exactly one undo step. Actions that would leave the
/// items unchanged do not mutate the store at all.
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use store_undo_config::LocalStorage;
use store_undo_mod_history::{HistoryConfig, HistoryManager, Observable, SubscriptionId};

use crate::product::Product;
use crate::store::Store;

/// Store id of the cart.
pub const CART_STORE_ID: &str = "CartStore";

/// Local storage key holding the persisted cart items.
pub const ITEMS_STORAGE_KEY: &str = "CartStore:items";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartState {
    pub items: Vec<Product>,
}

/// The cart: an observable store, its history, and optional persistence.
pub struct CartStore {
    store: Rc<Store<CartState>>,
    history: Option<HistoryManager<Store<CartState>>>,
    storage: Option<(Rc<LocalStorage>, SubscriptionId)>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("count", &self.count())
            .field("history", &self.history)
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}

impl CartStore {
    /// Creates an empty in-memory cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be attached.
    pub fn new(config: &HistoryConfig) -> Result<Self> {
        Self::build(CartState::default(), config, None)
    }

    /// Creates a cart whose items are loaded from and saved to `storage`.
    ///
    /// Unreadable stored items are discarded with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or the history cannot
    /// be attached.
    pub fn with_storage(config: &HistoryConfig, storage: Rc<LocalStorage>) -> Result<Self> {
        let stored = storage
            .get_item(ITEMS_STORAGE_KEY)
            .context("Failed to read stored cart items")?;
        let items = match stored {
            Some(json) => match serde_json::from_str::<Vec<Product>>(&json) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!("Discarding unreadable stored cart items: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        tracing::debug!("Restored {} cart item(s) from storage", items.len());
        Self::build(CartState { items }, config, Some(storage))
    }

    fn build(
        state: CartState,
        config: &HistoryConfig,
        storage: Option<Rc<LocalStorage>>,
    ) -> Result<Self> {
        let store = Rc::new(Store::new(CART_STORE_ID, state));

        // Persistence sees every mutation, replays included.
        let storage = storage.map(|storage| {
            let sink = Rc::clone(&storage);
            let id = store.subscribe(Box::new(move |state: &CartState| {
                let json =
                    serde_json::to_string(&state.items).context("Failed to encode cart items")?;
                sink.set_item(ITEMS_STORAGE_KEY, &json)
            }));
            (storage, id)
        });

        let history = HistoryManager::install(Rc::clone(&store), config.clone())
            .context("Failed to attach cart history")?;

        Ok(Self {
            store,
            history,
            storage,
        })
    }

    pub fn store(&self) -> &Rc<Store<CartState>> {
        &self.store
    }

    /// History manager, `None` when history is disabled.
    pub fn history(&self) -> Option<&HistoryManager<Store<CartState>>> {
        self.history.as_ref()
    }

    // ── Getters ─────────────────────────────────────────────────────

    pub fn items(&self) -> Vec<Product> {
        self.store.read(|s| s.items.clone())
    }

    pub fn count(&self) -> usize {
        self.store.read(|s| s.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Items grouped by product name, names in sorted order.
    pub fn grouped(&self) -> BTreeMap<String, Vec<Product>> {
        self.store.read(|s| {
            let mut groups: BTreeMap<String, Vec<Product>> = BTreeMap::new();
            for item in &s.items {
                groups.entry(item.name.clone()).or_default().push(item.clone());
            }
            groups
        })
    }

    /// Number of items named `name`.
    pub fn group_count(&self, name: &str) -> usize {
        self.store
            .read(|s| s.items.iter().filter(|i| i.name == name).count())
    }

    /// Sum of all item prices.
    pub fn total(&self) -> f64 {
        self.store.read(|s| s.items.iter().map(|i| i.price).sum())
    }

    // ── Actions ─────────────────────────────────────────────────────

    /// Appends `count` copies of `item`.
    pub fn add_items(&self, count: u32, item: &Product) -> Result<bool> {
        self.apply(|items| {
            items.extend(std::iter::repeat(item).take(count as usize).cloned());
        })
    }

    /// Removes every item named `name`.
    pub fn clear_item(&self, name: &str) -> Result<bool> {
        self.apply(|items| items.retain(|i| i.name != name))
    }

    /// Replaces all items named like `item` with `count` copies of it.
    pub fn set_item_count(&self, item: &Product, count: u32) -> Result<bool> {
        self.apply(|items| {
            items.retain(|i| i.name != item.name);
            items.extend(std::iter::repeat(item).take(count as usize).cloned());
        })
    }

    /// Summary line for a purchase of the current cart.
    pub fn checkout(&self, username: &str) -> String {
        format!(
            "{username} just bought {} items at a total of ${}",
            self.count(),
            self.total()
        )
    }

    /// Runs `edit` on a copy of the items and commits it as one mutation
    /// if anything changed. Returns whether the cart changed.
    fn apply(&self, edit: impl FnOnce(&mut Vec<Product>)) -> Result<bool> {
        let mut items = self.items();
        edit(&mut items);
        if self.store.read(|s| s.items == items) {
            return Ok(false);
        }
        self.store
            .mutate(|s| s.items = items)
            .with_context(|| format!("Failed to update {CART_STORE_ID}"))?;
        Ok(true)
    }

    // ── History ─────────────────────────────────────────────────────

    /// Undoes the last cart action. `Ok(false)` if there is nothing to undo
    /// or history is disabled.
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.as_mut() {
            Some(history) => history.undo(),
            None => Ok(false),
        }
    }

    /// Redoes the last undone cart action.
    pub fn redo(&mut self) -> Result<bool> {
        match self.history.as_mut() {
            Some(history) => history.redo(),
            None => Ok(false),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.as_ref().is_some_and(|h| h.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.history.as_ref().is_some_and(|h| h.can_redo())
    }

    /// Sizes of the history and future stacks.
    pub fn history_depth(&self) -> (usize, usize) {
        match &self.history {
            Some(h) => (h.history_len(), h.future_len()),
            None => (0, 0),
        }
    }
}

impl Drop for CartStore {
    fn drop(&mut self) {
        if let Some((_, id)) = self.storage.take() {
            self.store.unsubscribe(id);
        }
    }
}
