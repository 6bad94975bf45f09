// Integration tests for the cart store, its history, and local storage.

use std::rc::Rc;

use store_undo_config::LocalStorage;
use store_undo_core::{CartStore, HistoryConfig, Product, SnapshotFormat, ITEMS_STORAGE_KEY};

fn product(name: &str) -> Product {
    Product::new(name, 1.0)
}

fn names(cart: &CartStore) -> Vec<String> {
    cart.items().into_iter().map(|i| i.name).collect()
}

fn stored_names(storage: &LocalStorage) -> Vec<String> {
    let json = storage.get_item(ITEMS_STORAGE_KEY).unwrap().unwrap();
    let items: Vec<Product> = serde_json::from_str(&json).unwrap();
    items.into_iter().map(|i| i.name).collect()
}

// ── Reference Scenario ─────────────────────────────────────────────────

#[test]
fn test_cart_scenario() {
    let mut cart = CartStore::new(&HistoryConfig::default()).unwrap();
    let (a, b, c) = (product("A"), product("B"), product("C"));

    cart.add_items(1, &a).unwrap();
    cart.add_items(1, &b).unwrap();
    assert_eq!(names(&cart), vec!["A", "B"]);

    assert!(cart.undo().unwrap());
    assert_eq!(names(&cart), vec!["A"]);
    assert!(cart.undo().unwrap());
    assert!(names(&cart).is_empty());
    assert!(!cart.undo().unwrap());
    assert!(names(&cart).is_empty());

    assert!(cart.redo().unwrap());
    assert_eq!(names(&cart), vec!["A"]);

    cart.add_items(1, &c).unwrap();
    assert_eq!(names(&cart), vec!["A", "C"]);
    assert!(!cart.can_redo());
    assert!(!cart.redo().unwrap());
    assert_eq!(names(&cart), vec!["A", "C"]);
}

#[test]
fn test_history_stacks_track_actions() {
    let mut cart = CartStore::new(&HistoryConfig::default()).unwrap();
    let apple = product("Apple");
    cart.add_items(2, &apple).unwrap();
    cart.set_item_count(&apple, 5).unwrap();
    cart.clear_item("Apple").unwrap();
    assert_eq!(cart.history_depth(), (4, 0));

    cart.undo().unwrap();
    assert_eq!(cart.group_count("Apple"), 5);
    cart.undo().unwrap();
    assert_eq!(cart.group_count("Apple"), 2);
    assert_eq!(cart.history_depth(), (2, 2));

    let history = cart.history().unwrap();
    let text = history.history()[1].as_text().unwrap().to_string();
    assert!(text.contains("\"Apple\""));
}

#[test]
fn test_bincode_cart_history() {
    let config = HistoryConfig {
        format: SnapshotFormat::Bincode,
        ..HistoryConfig::default()
    };
    let mut cart = CartStore::new(&config).unwrap();
    cart.add_items(3, &product("X")).unwrap();
    cart.undo().unwrap();
    assert!(cart.is_empty());
    cart.redo().unwrap();
    assert_eq!(cart.count(), 3);
}

#[test]
fn test_undo_restores_computed_prices_exactly() {
    let mut cart = CartStore::new(&HistoryConfig::default()).unwrap();
    for i in 1..=200u32 {
        let price = f64::from(i * 48_271 % 100_000) / 7.0;
        cart.add_items(1, &Product::new(format!("P{i}"), price)).unwrap();
        let before = cart.items();

        cart.add_items(1, &product("X")).unwrap();
        assert!(cart.undo().unwrap());

        let after = cart.items();
        assert_eq!(after.len(), before.len());
        for (got, want) in after.iter().zip(&before) {
            assert_eq!(got.price.to_bits(), want.price.to_bits(), "{} drifted", want.name);
        }
    }
}

// ── Local Storage ──────────────────────────────────────────────────────

#[test]
fn test_items_persist_across_carts() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Rc::new(LocalStorage::open_in(dir.path()).unwrap());

    {
        let cart = CartStore::with_storage(&HistoryConfig::default(), Rc::clone(&storage)).unwrap();
        cart.add_items(2, &product("Apple")).unwrap();
    }

    let mut cart = CartStore::with_storage(&HistoryConfig::default(), Rc::clone(&storage)).unwrap();
    assert_eq!(names(&cart), vec!["Apple", "Apple"]);
    // History does not survive; the restored items are the new seed
    assert!(!cart.can_undo());
    assert!(!cart.undo().unwrap());
}

#[test]
fn test_undo_and_redo_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Rc::new(LocalStorage::open_in(dir.path()).unwrap());
    let mut cart = CartStore::with_storage(&HistoryConfig::default(), Rc::clone(&storage)).unwrap();

    cart.add_items(1, &product("A")).unwrap();
    cart.add_items(1, &product("B")).unwrap();
    assert_eq!(stored_names(&storage), vec!["A", "B"]);

    cart.undo().unwrap();
    assert_eq!(stored_names(&storage), vec!["A"]);

    cart.redo().unwrap();
    assert_eq!(stored_names(&storage), vec!["A", "B"]);
    assert_eq!(cart.history_depth(), (3, 0));
}

#[test]
fn test_unreadable_stored_items_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Rc::new(LocalStorage::open_in(dir.path()).unwrap());
    storage.set_item(ITEMS_STORAGE_KEY, "{ broken").unwrap();

    let cart = CartStore::with_storage(&HistoryConfig::default(), Rc::clone(&storage)).unwrap();
    assert!(cart.is_empty());

    cart.add_items(1, &product("A")).unwrap();
    assert_eq!(stored_names(&storage), vec!["A"]);
}

#[test]
fn test_dropping_cart_releases_subscriptions() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Rc::new(LocalStorage::open_in(dir.path()).unwrap());
    let cart = CartStore::with_storage(&HistoryConfig::default(), Rc::clone(&storage)).unwrap();
    let store = Rc::clone(cart.store());
    assert_eq!(store.subscriber_count(), 2);

    drop(cart);
    assert_eq!(store.subscriber_count(), 0);
}
