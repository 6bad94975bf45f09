/// Product catalog store.
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::Store;

/// Catalog shipped with the binary, used when no catalog file is configured.
const BUILTIN_CATALOG: &str = include_str!("../data/products.json");

/// Store id of the product catalog.
pub const PRODUCT_STORE_ID: &str = "ProductStore";

/// A purchasable product. Cart items are copies of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    /// Image file name, informational only.
    #[serde(default)]
    pub image: String,
    pub price: f64,
}

impl Product {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            image: String::new(),
            price,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Product name must not be empty");
        }
        if !self.price.is_finite() || self.price < 0.0 {
            bail!("Product '{}' has an invalid price: {}", self.name, self.price);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductState {
    pub products: Vec<Product>,
}

/// Holds the product catalog. Not tracked by history.
#[derive(Debug)]
pub struct ProductStore {
    store: Rc<Store<ProductState>>,
}

impl Default for ProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            store: Rc::new(Store::new(PRODUCT_STORE_ID, ProductState::default())),
        }
    }

    /// Fills the catalog from the built-in product list.
    ///
    /// Returns the number of products loaded.
    pub fn fill(&self) -> Result<usize> {
        self.fill_from_json(BUILTIN_CATALOG)
            .context("Failed to load built-in catalog")
    }

    /// Fills the catalog from a JSON file containing an array of products.
    pub fn fill_from_path(&self, path: &Path) -> Result<usize> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        self.fill_from_json(&json)
            .with_context(|| format!("Failed to load catalog: {}", path.display()))
    }

    /// Replaces the catalog with the products in `json`.
    ///
    /// The catalog is left unchanged if any product is invalid.
    pub fn fill_from_json(&self, json: &str) -> Result<usize> {
        let products: Vec<Product> =
            serde_json::from_str(json).context("Failed to parse product list")?;
        for product in &products {
            product.validate()?;
        }
        let count = products.len();
        self.store.mutate(|state| state.products = products)?;
        tracing::debug!("Loaded {count} product(s)");
        Ok(count)
    }

    /// Returns all products in catalog order.
    pub fn products(&self) -> Vec<Product> {
        self.store.read(|state| state.products.clone())
    }

    /// Finds a product by name, ignoring ASCII case.
    pub fn find(&self, name: &str) -> Option<Product> {
        self.store.read(|state| {
            state
                .products
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
                .cloned()
        })
    }

    pub fn store(&self) -> &Rc<Store<ProductState>> {
        &self.store
    }
}
