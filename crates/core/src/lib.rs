//! Duodude Core - Shared types library.
//!
//! This crate provides the domain types used across all Duodude components:
//! - `storefront` - API clients, guest storage and the cart reconciler
//! - `cli` - Command-line front end over the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, products, cart lines and snapshots,
//!   checkout totals, orders and users

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
