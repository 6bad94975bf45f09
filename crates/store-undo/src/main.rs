use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use store_undo_config::{AppConfig, LocalStorage};
use store_undo_core::{CartStore, ProductStore};

mod shell;

use shell::Shell;

/// A shopping cart shell with undo/redo.
#[derive(Parser, Debug)]
#[command(name = "store-undo", version, about)]
struct Cli {
    /// Config file (defaults to store-undo.json next to the executable).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the local storage database.
    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// Keep the cart in memory only.
    #[arg(long = "no-persist")]
    no_persist: bool,

    /// Name shown in the checkout summary.
    #[arg(long)]
    user: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging on stderr so it doesn't mix with shell output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("Starting store-undo");

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_or_create(&config_path);
    if let Some(user) = cli.user {
        config.username = user;
    }
    if cli.no_persist {
        config.persist_cart = false;
    }
    config.sanitize();

    let products = ProductStore::new();
    let loaded = match config.products_file() {
        Some(path) => products.fill_from_path(&path)?,
        None => products.fill()?,
    };
    tracing::info!("Catalog has {loaded} product(s)");

    let cart = if config.persist_cart {
        let data_dir = cli
            .data_dir
            .unwrap_or_else(|| config.resolve_data_dir());
        let storage = LocalStorage::open_in(&data_dir)
            .with_context(|| format!("Failed to open storage in {}", data_dir.display()))?;
        CartStore::with_storage(&config.history, Rc::new(storage))?
    } else {
        CartStore::new(&config.history)?
    };

    let mut shell = Shell::new(cart, products, config);
    shell.run(io::stdin().lock(), io::stdout().lock())?;
    tracing::info!("Exiting with {} item(s) in the cart", shell.cart().count());
    Ok(())
}
