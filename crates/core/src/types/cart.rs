//! Cart lines and snapshots.
//!
//! A [`CartSnapshot`] holds at most one [`CartLine`] per [`LineKey`]
//! (product plus optional size), and every line has a quantity of at least
//! one. Constructors that accept untrusted lines (storage, server payloads)
//! merge duplicates so the invariant holds for every snapshot in memory.

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Cart quantities start at one.
    #[error("quantity must be at least 1")]
    Zero,
}

/// A strictly positive line quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A quantity of one.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Clamp an arbitrary requested amount into a valid quantity.
    ///
    /// Anything below one becomes one; requesting zero never removes a line.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let value = u32::try_from(value.max(1)).unwrap_or(u32::MAX);
        Self::new(value).unwrap_or(Self::ONE)
    }

    /// The quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0.get()))
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(QuantityError::Zero)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a cart line: the product and the chosen size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product: ProductId,
    pub size: Option<String>,
}

impl LineKey {
    /// Create a key for a product in an optional size.
    #[must_use]
    pub fn new(product: ProductId, size: Option<String>) -> Self {
        Self { product, size }
    }
}

impl std::fmt::Display for LineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.size {
            Some(size) => write!(f, "{} ({size})", self.product),
            None => write!(f, "{}", self.product),
        }
    }
}

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl CartLine {
    /// Create a new line.
    #[must_use]
    pub const fn new(product: Product, quantity: Quantity, size: Option<String>) -> Self {
        Self {
            product,
            quantity,
            size,
        }
    }

    /// The line's identity key.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product.id.clone(), self.size.clone())
    }

    /// Whether this line has the given identity.
    #[must_use]
    pub fn matches(&self, key: &LineKey) -> bool {
        self.product.id == key.product && self.size == key.size
    }

    /// Unit price times quantity, in US dollars.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity.get())
    }
}

/// An ordered set of cart lines, unique by [`LineKey`].
///
/// Serializes as a bare JSON array of lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a snapshot from arbitrary lines, merging duplicate keys.
    ///
    /// The first occurrence of a key keeps its position; later duplicates
    /// add their quantity to it.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut snapshot = Self::empty();
        for line in lines {
            snapshot.add(line.product, line.quantity, line.size);
        }
        snapshot
    }

    /// Lines in display order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Sum of all line totals, in US dollars.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Find the line with the given key.
    #[must_use]
    pub fn find(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.matches(key))
    }

    /// All lines for a product, across sizes.
    pub fn lines_for<'a>(&'a self, product: &'a ProductId) -> impl Iterator<Item = &'a CartLine> {
        self.lines
            .iter()
            .filter(move |line| &line.product.id == product)
    }

    /// Add a quantity of a product, merging with an existing line of the same key.
    pub fn add(&mut self, product: Product, quantity: Quantity, size: Option<String>) {
        let key = LineKey::new(product.id.clone(), size);
        if let Some(line) = self.lines.iter_mut().find(|line| line.matches(&key)) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            self.lines.push(CartLine::new(product, quantity, key.size));
        }
    }

    /// Remove the line with the given key. Returns whether a line was removed.
    pub fn remove(&mut self, key: &LineKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| !line.matches(key));
        self.lines.len() != before
    }

    /// Replace the quantity of an existing line. Returns whether the line exists.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: Quantity) -> bool {
        match self.lines.iter_mut().find(|line| line.matches(key)) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl From<Vec<CartLine>> for CartSnapshot {
    fn from(lines: Vec<CartLine>) -> Self {
        Self::from_lines(lines)
    }
}

impl From<CartSnapshot> for Vec<CartLine> {
    fn from(snapshot: CartSnapshot) -> Self {
        snapshot.lines
    }
}

impl<'a> IntoIterator for &'a CartSnapshot {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64) -> Product {
        let mut product = Product::reference(ProductId::new(id));
        product.price = Decimal::new(price, 0);
        product
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_quantity_clamps_below_one() {
        assert_eq!(Quantity::clamped(0), Quantity::ONE);
        assert_eq!(Quantity::clamped(-5), Quantity::ONE);
        assert_eq!(Quantity::clamped(7).get(), 7);
        assert_eq!(Quantity::clamped(i64::MAX).get(), u32::MAX);
    }

    #[test]
    fn test_quantity_rejects_zero_on_deserialize() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("3").unwrap().get(), 3);
    }

    #[test]
    fn test_add_same_key_sums_quantities() {
        let mut cart = CartSnapshot::empty();
        for n in [1, 2, 4] {
            cart.add(product("a", 10), qty(n), Some("M".to_string()));
        }

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity.get(), 7);
    }

    #[test]
    fn test_add_different_size_creates_new_line() {
        let mut cart = CartSnapshot::empty();
        cart.add(product("a", 10), qty(1), Some("M".to_string()));
        cart.add(product("a", 10), qty(1), Some("L".to_string()));
        cart.add(product("a", 10), qty(1), None);

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.lines_for(&ProductId::new("a")).count(), 3);
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let mut cart = CartSnapshot::empty();
        cart.add(product("a", 10), qty(1), None);

        assert!(!cart.remove(&LineKey::new(ProductId::new("b"), None)));
        assert!(!cart.remove(&LineKey::new(ProductId::new("a"), Some("M".to_string()))));
        assert_eq!(cart.len(), 1);

        assert!(cart.remove(&LineKey::new(ProductId::new("a"), None)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_on_existing_line() {
        let mut cart = CartSnapshot::empty();
        cart.add(product("a", 10), qty(3), None);
        let key = LineKey::new(ProductId::new("a"), None);

        assert!(cart.set_quantity(&key, Quantity::clamped(0)));
        assert_eq!(cart.find(&key).unwrap().quantity, Quantity::ONE);
        assert!(!cart.set_quantity(&LineKey::new(ProductId::new("z"), None), qty(2)));
    }

    #[test]
    fn test_totals() {
        let mut cart = CartSnapshot::empty();
        cart.add(product("a", 10), qty(2), None);
        cart.add(product("b", 5), qty(3), None);

        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.subtotal(), Decimal::new(35, 0));
    }

    #[test]
    fn test_deserialize_merges_duplicate_lines() {
        let json = r#"[
            {"product": {"_id": "a"}, "quantity": 1, "size": "M"},
            {"product": {"_id": "b"}, "quantity": 2},
            {"product": {"_id": "a"}, "quantity": 2, "size": "M"}
        ]"#;

        let cart: CartSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.lines()[0].quantity.get(), 3);
        assert_eq!(cart.lines()[1].product.id.as_str(), "b");
    }

    #[test]
    fn test_serializes_as_array_without_empty_size() {
        let mut cart = CartSnapshot::empty();
        cart.add(product("a", 1), qty(1), None);

        let value = serde_json::to_value(&cart).unwrap();
        let line = &value.as_array().unwrap()[0];
        assert!(line.get("size").is_none());
        assert_eq!(line["quantity"], 1);
    }
}
