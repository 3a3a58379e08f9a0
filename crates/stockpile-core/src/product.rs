use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ProductError;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;

/// A product in the inventory. `name` is the unique business key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

/// Input for creating a product (or the replacement fields of an update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

impl NewProduct {
    /// Check the domain rules. Runs before any write; a violation means no
    /// side effects have happened yet.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() {
            return Err(ProductError::validation("product name is required"));
        }
        let chars = self.name.chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&chars) {
            return Err(ProductError::validation(format!(
                "product name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"
            )));
        }
        if self.price <= Decimal::ZERO {
            return Err(ProductError::validation("price must be greater than 0"));
        }
        if self.quantity < 0 {
            return Err(ProductError::validation("quantity cannot be negative"));
        }
        Ok(())
    }
}

impl Product {
    /// Restock by `amount`. Negative deltas are rejected.
    pub fn add_quantity(&mut self, amount: i32) -> Result<(), ProductError> {
        if amount < 0 {
            return Err(ProductError::validation("cannot add negative quantity"));
        }
        self.quantity += amount;
        Ok(())
    }

    /// Take `amount` out of stock. Rejects negative deltas and reductions
    /// past zero.
    pub fn reduce_quantity(&mut self, amount: i32) -> Result<(), ProductError> {
        if amount < 0 {
            return Err(ProductError::validation("cannot reduce by negative quantity"));
        }
        if self.quantity < amount {
            return Err(ProductError::validation("insufficient quantity"));
        }
        self.quantity -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, price: Decimal, quantity: i32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price,
            quantity,
        }
    }

    #[test]
    fn validate_accepts_well_formed_product() {
        assert!(input("Widget", Decimal::from(10), 5).validate().is_ok());
        // Boundary lengths.
        assert!(input("ab", Decimal::from(1), 0).validate().is_ok());
        assert!(input(&"a".repeat(100), Decimal::from(1), 0).validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_names() {
        assert!(input("", Decimal::from(1), 0).validate().is_err());
        assert!(input("   ", Decimal::from(1), 0).validate().is_err());
        assert!(input("a", Decimal::from(1), 0).validate().is_err());
        assert!(input(&"a".repeat(101), Decimal::from(1), 0).validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_price() {
        assert!(input("Widget", Decimal::ZERO, 0).validate().is_err());
        assert!(input("Widget", Decimal::from(-3), 0).validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_quantity() {
        assert!(input("Widget", Decimal::from(1), -1).validate().is_err());
    }

    #[test]
    fn add_quantity_accumulates_and_rejects_negative() {
        let mut p = Product {
            id: 1,
            name: "Widget".into(),
            description: None,
            price: Decimal::from(10),
            quantity: 5,
        };
        p.add_quantity(3).unwrap();
        assert_eq!(p.quantity, 8);
        assert!(p.add_quantity(-1).is_err());
        assert_eq!(p.quantity, 8);
    }

    #[test]
    fn reduce_quantity_guards_stock() {
        let mut p = Product {
            id: 1,
            name: "Widget".into(),
            description: None,
            price: Decimal::from(10),
            quantity: 5,
        };
        p.reduce_quantity(5).unwrap();
        assert_eq!(p.quantity, 0);
        assert!(p.reduce_quantity(1).is_err());
        assert!(p.reduce_quantity(-2).is_err());
    }
}
