/// Observable stores for the cart application.
///
/// `Store` is the generic observable container; `CartStore` and
/// `ProductStore` are the application stores built on it. The cart is
/// tracked by a `HistoryManager` from `store-undo-mod-history`.
pub mod cart;
pub mod product;
pub mod store;

pub use cart::{CartState, CartStore, CART_STORE_ID, ITEMS_STORAGE_KEY};
pub use product::{Product, ProductState, ProductStore};
pub use store::Store;
pub use store_undo_mod_history::{HistoryConfig, HistoryManager, SnapshotFormat};
