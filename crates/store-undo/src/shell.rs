/// Line-oriented shell driving the cart: the UI layer of the application.
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use store_undo_config::AppConfig;
use store_undo_core::{CartStore, Product, ProductStore};

const HELP: &str = "\
Commands:
  products                 list the catalog
  cart                     show the cart grouped by product
  add <product> [count]    add items (default 1)
  set <product> <count>    set how many of a product are in the cart
  remove <product>         remove a product from the cart
  undo                     undo the last cart change
  redo                     redo the last undone change
  history                  show undo/redo depth
  checkout                 buy everything in the cart
  help                     show this text
  quit                     exit";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Products,
    Cart,
    Add { product: String, count: u32 },
    Set { product: String, count: u32 },
    Remove { product: String },
    Undo,
    Redo,
    History,
    Checkout,
    Help,
    Quit,
}

/// Splits `args` into a product name and a trailing count, if present.
fn split_count(args: &[&str]) -> (String, Option<Result<u32, std::num::ParseIntError>>) {
    match args {
        [name @ .., last] if !name.is_empty() && last.chars().all(|c| c.is_ascii_digit()) => {
            (name.join(" "), Some(last.parse()))
        }
        _ => (args.join(" "), None),
    }
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| anyhow!("Empty command"))?
            .to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match verb.as_str() {
            "products" | "catalog" => Command::Products,
            "cart" | "ls" => Command::Cart,
            "add" => {
                let (product, count) = split_count(&args);
                if product.is_empty() {
                    bail!("Usage: add <product> [count]");
                }
                let count = match count {
                    Some(parsed) => parsed.context("Invalid count")?,
                    None => 1,
                };
                Command::Add { product, count }
            }
            "set" => {
                let (product, count) = split_count(&args);
                let Some(count) = count else {
                    bail!("Usage: set <product> <count>");
                };
                Command::Set {
                    product,
                    count: count.context("Invalid count")?,
                }
            }
            "remove" | "rm" => {
                if args.is_empty() {
                    bail!("Usage: remove <product>");
                }
                Command::Remove {
                    product: args.join(" "),
                }
            }
            "undo" | "u" => Command::Undo,
            "redo" | "r" => Command::Redo,
            "history" => Command::History,
            "checkout" => Command::Checkout,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("Unknown command '{other}' (try 'help')"),
        };
        Ok(command)
    }
}

/// Interactive session over one cart.
#[derive(Debug)]
pub struct Shell {
    cart: CartStore,
    products: ProductStore,
    config: AppConfig,
}

impl Shell {
    pub fn new(cart: CartStore, products: ProductStore, config: AppConfig) -> Self {
        Self {
            cart,
            products,
            config,
        }
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Reads commands from `input` until EOF or `quit`.
    ///
    /// Command errors are printed and the session continues; only I/O
    /// errors end it.
    pub fn run(&mut self, input: impl BufRead, mut out: impl Write) -> Result<()> {
        writeln!(out, "Type 'help' for commands.")?;
        for line in input.lines() {
            let line = line.context("Failed to read input")?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    if let Err(e) = self.execute(&command, &mut out) {
                        tracing::debug!("Command {command:?} failed: {e:#}");
                        writeln!(out, "error: {e:#}")?;
                    }
                }
                Err(e) => writeln!(out, "error: {e:#}")?,
            }
        }
        out.flush().context("Failed to flush output")?;
        Ok(())
    }

    /// Executes one command, writing its result to `out`.
    pub fn execute(&mut self, command: &Command, out: &mut impl Write) -> Result<()> {
        match command {
            Command::Products => {
                for p in self.products.products() {
                    writeln!(out, "  {:<12} ${:.2}", p.name, p.price)?;
                }
            }
            Command::Cart => self.print_cart(out)?,
            Command::Add { product, count } => {
                let item = self.lookup(product)?;
                self.check_count(*count)?;
                if self.cart.add_items(*count, &item)? {
                    writeln!(out, "Added {count} x {}.", item.name)?;
                } else {
                    writeln!(out, "Nothing to add.")?;
                }
            }
            Command::Set { product, count } => {
                let item = self.lookup(product)?;
                self.check_count(*count)?;
                if self.cart.set_item_count(&item, *count)? {
                    writeln!(out, "{} set to {count}.", item.name)?;
                } else {
                    writeln!(out, "{} already at {count}.", item.name)?;
                }
            }
            Command::Remove { product } => {
                let name = self
                    .products
                    .find(product)
                    .map(|p| p.name)
                    .unwrap_or_else(|| product.clone());
                if self.cart.clear_item(&name)? {
                    writeln!(out, "Removed {name}.")?;
                } else {
                    writeln!(out, "No {name} in the cart.")?;
                }
            }
            Command::Undo => {
                if self.cart.undo()? {
                    writeln!(out, "Undone.")?;
                    self.print_cart(out)?;
                } else {
                    writeln!(out, "Nothing to undo.")?;
                }
            }
            Command::Redo => {
                if self.cart.redo()? {
                    writeln!(out, "Redone.")?;
                    self.print_cart(out)?;
                } else {
                    writeln!(out, "Nothing to redo.")?;
                }
            }
            Command::History => match self.cart.history() {
                Some(_) => {
                    let (past, future) = self.cart.history_depth();
                    writeln!(
                        out,
                        "{} undo step(s), {future} redo step(s).",
                        past.saturating_sub(1)
                    )?;
                }
                None => writeln!(out, "History is disabled.")?,
            },
            Command::Checkout => {
                if self.cart.is_empty() {
                    writeln!(out, "The cart is empty.")?;
                } else {
                    writeln!(out, "{}", self.cart.checkout(&self.config.username))?;
                }
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => {}
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Product> {
        self.products
            .find(name)
            .ok_or_else(|| anyhow!("Unknown product '{name}'"))
    }

    fn check_count(&self, count: u32) -> Result<()> {
        if count > self.config.max_item_count {
            bail!(
                "Count {count} exceeds the limit of {}",
                self.config.max_item_count
            );
        }
        Ok(())
    }

    fn print_cart(&self, out: &mut impl Write) -> Result<()> {
        if self.cart.is_empty() {
            writeln!(out, "Cart is empty.")?;
            return Ok(());
        }
        for (name, items) in self.cart.grouped() {
            let subtotal: f64 = items.iter().map(|i| i.price).sum();
            writeln!(out, "  {name:<12} x{:<4} ${subtotal:.2}", items.len())?;
        }
        writeln!(
            out,
            "Total: {} item(s), ${:.2}",
            self.cart.count(),
            self.cart.total()
        )?;
        Ok(())
    }
}
