//! Core types for Duodude.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod checkout;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod slide;
pub mod status;
pub mod user;

pub use cart::{CartLine, CartSnapshot, LineKey, Quantity, QuantityError};
pub use checkout::{CheckoutSummary, ShippingAddress};
pub use id::*;
pub use order::{Order, OrderItem, ReturnItem, ReturnRequest};
pub use price::{CurrencyCode, Price, USD_TO_INR_RATE, format_price};
pub use product::{Product, ProductRef};
pub use slide::{HeroSlide, SlideDraft};
pub use status::*;
pub use user::{SavedAddress, User};
