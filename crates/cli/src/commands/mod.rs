//! CLI command implementations.

pub mod account;
pub mod cart;
pub mod orders;
pub mod products;
pub mod slides;

use clap::Subcommand;
use duodude_core::{AddressKind, CartSnapshot, CheckoutSummary, SavedAddress, format_price};
use duodude_storefront::StorefrontError;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Not signed in. Run `duodude login --token <TOKEN>` first.")]
    NotSignedIn,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List products
    List {
        /// Sort field (e.g., createdAt)
        #[arg(long)]
        sort: Option<String>,
        /// Maximum number of products
        #[arg(long)]
        limit: Option<u32>,
        /// Only products in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// List featured products
    Featured,
    /// Show one product
    Show {
        /// Product id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart and its totals
    Show,
    /// Add a product to the cart
    Add {
        /// Product id
        product: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Remove a line from the cart
    Remove {
        /// Product id
        product: String,
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Set a line's quantity (values below 1 become 1)
    Set {
        /// Product id
        product: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List your orders (every order for admins)
    List,
    /// Place a cash-on-delivery order for the cart
    Place {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        street: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        zip: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
    /// Cancel an order
    Cancel {
        /// Order id
        id: String,
    },
    /// Ask to return every item of a delivered order
    Return {
        /// Order id
        id: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// Change name, email, or password
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// New password
        #[arg(long, env = "DUODUDE_NEW_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// List saved addresses
    Addresses,
    /// Save a new address
    AddAddress {
        /// home, work, or other
        #[arg(long, default_value_t = AddressKind::Home)]
        kind: AddressKind,
        #[arg(long)]
        street: String,
        #[arg(long)]
        city: String,
        #[arg(long, default_value = "")]
        state: String,
        #[arg(long)]
        zip: String,
        #[arg(long)]
        country: String,
        /// Use for checkout by default
        #[arg(long)]
        default: bool,
    },
    /// Delete a saved address
    RemoveAddress {
        /// Address id
        id: String,
    },
    /// List every account (admin only)
    Users,
}

#[derive(Subcommand)]
pub enum SlidesAction {
    /// List every hero slide
    List,
    /// Create a slide
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        subtitle: String,
        /// Image URL
        #[arg(long)]
        image: String,
        #[arg(long, default_value_t = 0)]
        order: u32,
    },
    /// Move a slide to another position
    Move {
        /// Slide id
        id: String,
        order: u32,
    },
    /// Show or hide a slide
    Toggle {
        /// Slide id
        id: String,
    },
    /// Delete a slide
    Remove {
        /// Slide id
        id: String,
    },
}

/// Print a value as pretty JSON.
#[allow(clippy::print_stdout)]
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print saved addresses, one per line.
#[allow(clippy::print_stdout)]
pub fn print_addresses(addresses: &[SavedAddress]) {
    if addresses.is_empty() {
        println!("No saved addresses.");
    }
    for address in addresses {
        let id = address.id.as_ref().map_or("-", |id| id.as_str());
        let default = if address.is_default { " (default)" } else { "" };
        println!(
            "{id:<24} {:<6} {}, {}, {} {}, {}{default}",
            address.kind.to_string(),
            address.street,
            address.city,
            address.state,
            address.zip_code,
            address.country,
        );
    }
}

/// Print cart lines followed by checkout totals.
#[allow(clippy::print_stdout)]
pub fn print_cart(cart: &CartSnapshot) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in cart {
        let size = line.size.as_deref().map_or(String::new(), |s| format!(" [{s}]"));
        println!(
            "{:<24} {:<30}{size} x{:<3} {:>12}",
            line.product.id.as_str(),
            line.product.name,
            line.quantity.get(),
            format_price(line.line_total()),
        );
    }

    let summary = CheckoutSummary::from_snapshot(cart);
    println!();
    println!("Subtotal  {:>12}", format_price(summary.subtotal));
    if summary.shipping.is_zero() {
        println!("Shipping  {:>12}", "Free");
    } else {
        println!("Shipping  {:>12}", format_price(summary.shipping));
    }
    println!("Tax       {:>12}", format_price(summary.tax));
    println!("Total     {:>12}", format_price(summary.total));
}
