//! Product types
//!
//! A product is keyed by its name, folded to uppercase, and carries three
//! numeric fields that are always stored as non-negative magnitudes:
//! - `cost_price`: what the stock was bought for
//! - `sell_price`: what it is sold for
//! - `in_stock`: units on hand

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Uppercased, trimmed product name (primary key)
    pub name: String,
    pub cost_price: f64,
    pub sell_price: f64,
    pub in_stock: i64,
}

impl Product {
    /// Create a product with a normalized name and non-negative numbers.
    ///
    /// Negative inputs are taken by absolute value. Non-finite prices and
    /// blank names are rejected.
    pub fn new(name: &str, cost_price: f64, sell_price: f64, in_stock: i64) -> Result<Self> {
        Ok(Self {
            name: normalize_name(name)?,
            cost_price: magnitude(cost_price, "cost_price")?,
            sell_price: magnitude(sell_price, "sell_price")?,
            in_stock: in_stock.saturating_abs(),
        })
    }

    /// Profit per unit sold
    pub fn margin(&self) -> f64 {
        self.sell_price - self.cost_price
    }
}

/// A partial change to an existing product.
///
/// `None` means "leave as is". `Some(0)` is a real update to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub cost_price: Option<f64>,
    pub sell_price: Option<f64>,
    pub in_stock: Option<i64>,
}

impl ProductUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cost_price(mut self, cost_price: f64) -> Self {
        self.cost_price = Some(cost_price);
        self
    }

    pub fn with_sell_price(mut self, sell_price: f64) -> Self {
        self.sell_price = Some(sell_price);
        self
    }

    pub fn with_in_stock(mut self, in_stock: i64) -> Self {
        self.in_stock = Some(in_stock);
        self
    }

    /// True when no field was requested for change
    pub fn is_empty(&self) -> bool {
        self.cost_price.is_none() && self.sell_price.is_none() && self.in_stock.is_none()
    }

    /// Apply the same magnitude coercion as [`Product::new`] to every present field.
    pub fn normalized(self) -> Result<Self> {
        Ok(Self {
            cost_price: self
                .cost_price
                .map(|v| magnitude(v, "cost_price"))
                .transpose()?,
            sell_price: self
                .sell_price
                .map(|v| magnitude(v, "sell_price"))
                .transpose()?,
            in_stock: self.in_stock.map(i64::saturating_abs),
        })
    }
}

/// Aggregate figures over the whole catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryStats {
    pub products: usize,
    pub units_in_stock: i64,
    /// Sum of `cost_price * in_stock`
    pub stock_value: f64,
    /// Sum of `sell_price * in_stock`
    pub potential_revenue: f64,
}

impl std::fmt::Display for InventoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Inventory Statistics:")?;
        writeln!(f, "  Products: {}", self.products)?;
        writeln!(f, "  Units in stock: {}", self.units_in_stock)?;
        writeln!(f, "  Stock value: ${:.2}", self.stock_value)?;
        write!(f, "  Potential revenue: ${:.2}", self.potential_revenue)
    }
}

/// Fold a product name to its stored form.
pub fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("product name must not be empty".to_string()));
    }
    Ok(trimmed.to_uppercase())
}

fn magnitude(value: f64, field: &str) -> Result<f64> {
    if !value.is_finite() {
        return Err(Error::InvalidInput(format!("{} must be a finite number", field)));
    }
    Ok(value.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_normalization() {
        let product = Product::new("  Gadget ", -5.0, -3.0, -2).unwrap();
        assert_eq!(product.name, "GADGET");
        assert_eq!(product.cost_price, 5.0);
        assert_eq!(product.sell_price, 3.0);
        assert_eq!(product.in_stock, 2);
    }

    #[test]
    fn test_rejects_blank_name_and_nan() {
        assert!(matches!(Product::new("   ", 1.0, 1.0, 1), Err(Error::InvalidInput(_))));
        assert!(matches!(Product::new("x", f64::NAN, 1.0, 1), Err(Error::InvalidInput(_))));
        assert!(matches!(
            ProductUpdate::new().with_sell_price(f64::INFINITY).normalized(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_stock_magnitude_saturates() {
        let product = Product::new("edge", 0.0, 0.0, i64::MIN).unwrap();
        assert_eq!(product.in_stock, i64::MAX);
    }

    #[test]
    fn test_update_zero_is_not_empty() {
        assert!(ProductUpdate::new().is_empty());

        let update = ProductUpdate::new().with_in_stock(0);
        assert!(!update.is_empty());

        let normalized = ProductUpdate::new()
            .with_cost_price(-1.5)
            .with_in_stock(-4)
            .normalized()
            .unwrap();
        assert_eq!(normalized.cost_price, Some(1.5));
        assert_eq!(normalized.sell_price, None);
        assert_eq!(normalized.in_stock, Some(4));
    }

    #[test]
    fn test_margin() {
        let product = Product::new("widget", 1.25, 2.0, 10).unwrap();
        assert!((product.margin() - 0.75).abs() < f64::EPSILON);
    }
}
