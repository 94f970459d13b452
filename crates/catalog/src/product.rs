use serde::{Deserialize, Serialize};

use stockfront_core::{DomainError, DomainResult, ProductId};

/// A catalog product.
///
/// `remaining` is the stock counter the inventory ledger decrements on
/// reservation and restores on release. Invariant: `remaining >= 0` at every
/// observable point, including after failed or partially-attempted orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub remaining: i64,
    pub description: String,
}

impl Product {
    /// Build a validated product record.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        unit_price: u64,
        remaining: i64,
        description: impl Into<String>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name"));
        }
        if remaining < 0 {
            return Err(DomainError::invariant("stock cannot be negative"));
        }
        Ok(Self {
            id,
            name,
            unit_price,
            remaining,
            description: description.into(),
        })
    }
}

/// Whitelisted catalog update. `remaining` edits here are catalog management
/// (restock, correction) and bypass the ledger on purpose; order placement
/// never goes through this path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub unit_price: Option<u64>,
    pub remaining: Option<i64>,
    pub description: Option<String>,
}

impl ProductPatch {
    /// Apply the patch to an existing record, re-checking invariants.
    pub fn apply(self, product: &mut Product) -> DomainResult<()> {
        if let Some(name) = self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name"));
            }
            product.name = name;
        }
        if let Some(price) = self.unit_price {
            product.unit_price = price;
        }
        if let Some(remaining) = self.remaining {
            if remaining < 0 {
                return Err(DomainError::invariant("stock cannot be negative"));
            }
            product.remaining = remaining;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        Ok(())
    }
}
