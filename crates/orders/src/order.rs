use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockfront_core::{DomainError, DomainResult, OrderId, ProductId, UserId};

/// One (product, quantity) pair inside an order. Immutable once the order
/// commits; submission order is preserved and meaningful for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Customer contact details captured at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// An incoming, not-yet-committed order.
///
/// `declared_total` is the client's claimed total. It is informational only;
/// the authoritative total is recomputed server-side from unit prices at
/// commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub lines: Vec<LineItem>,
    pub customer: CustomerInfo,
    pub user_id: Option<UserId>,
    pub declared_total: Option<u64>,
}

impl OrderDraft {
    /// Check everything that can be checked without touching storage.
    ///
    /// Runs before any reservation is attempted, so a failure here has no
    /// side effects. Returns the offending field name.
    pub fn validate(&self) -> DomainResult<()> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("lines"));
        }
        if self.lines.iter().any(|l| l.quantity < 1) {
            return Err(DomainError::validation("quantity"));
        }
        if self.customer.name.trim().is_empty() {
            return Err(DomainError::validation("customer_name"));
        }
        if self.customer.phone.trim().is_empty() {
            return Err(DomainError::validation("phone_number"));
        }
        if self.customer.address.trim().is_empty() {
            return Err(DomainError::validation("address"));
        }
        Ok(())
    }
}

/// A committed order. Created exactly once, atomically, by the placement
/// coordinator; never partially persisted. Lines and total are immutable
/// after commit (see [`OrderPatch`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<LineItem>,
    pub customer: CustomerInfo,
    /// Total in smallest currency unit, recomputed server-side.
    pub total_amount: u64,
    pub user_id: Option<UserId>,
}

/// Whitelisted post-commit update: customer contact fields only.
///
/// Lines, total, and timestamps are deliberately not patchable; inventory
/// was already decremented for the committed lines and an in-place edit
/// would desynchronize the two.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none() && self.phone_number.is_none() && self.address.is_none()
    }

    pub fn apply(self, order: &mut Order) -> DomainResult<()> {
        if let Some(name) = self.customer_name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("customer_name"));
            }
            order.customer.name = name;
        }
        if let Some(phone) = self.phone_number {
            if phone.trim().is_empty() {
                return Err(DomainError::validation("phone_number"));
            }
            order.customer.phone = phone;
        }
        if let Some(address) = self.address {
            if address.trim().is_empty() {
                return Err(DomainError::validation("address"));
            }
            order.customer.address = address;
        }
        Ok(())
    }
}

/// Compute the authoritative order total: Σ quantity × unit price.
///
/// `unit_price_of` resolves a product id to its current unit price; every
/// line's product must resolve (the coordinator prices lines it has already
/// reserved, so a miss is an invariant breach, not a user error). Arithmetic
/// is checked; an overflowing total is rejected.
pub fn total_amount(
    lines: &[LineItem],
    mut unit_price_of: impl FnMut(ProductId) -> Option<u64>,
) -> DomainResult<u64> {
    let mut total: u64 = 0;
    for line in lines {
        let price = unit_price_of(line.product_id)
            .ok_or_else(|| DomainError::invariant("pricing a line for an unknown product"))?;
        let quantity = u64::try_from(line.quantity)
            .map_err(|_| DomainError::validation("quantity"))?;
        let line_total = price
            .checked_mul(quantity)
            .ok_or_else(|| DomainError::invariant("order total overflow"))?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| DomainError::invariant("order total overflow"))?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(lines: Vec<LineItem>) -> OrderDraft {
        OrderDraft {
            lines,
            customer: CustomerInfo {
                name: "Ada".to_string(),
                phone: "555-0101".to_string(),
                address: "1 Loop Rd".to_string(),
            },
            user_id: None,
            declared_total: None,
        }
    }

    fn line(quantity: i64) -> LineItem {
        LineItem {
            product_id: ProductId::new(),
            quantity,
        }
    }

    #[test]
    fn draft_requires_at_least_one_line() {
        let err = draft(vec![]).validate().unwrap_err();
        assert_eq!(err, DomainError::validation("lines"));
    }

    #[test]
    fn draft_rejects_zero_quantity() {
        let err = draft(vec![line(2), line(0)]).validate().unwrap_err();
        assert_eq!(err, DomainError::validation("quantity"));
    }

    #[test]
    fn draft_rejects_blank_customer_fields() {
        let mut d = draft(vec![line(1)]);
        d.customer.phone = "   ".to_string();
        let err = d.validate().unwrap_err();
        assert_eq!(err, DomainError::validation("phone_number"));
    }

    #[test]
    fn total_is_sum_of_quantity_times_price() {
        let a = line(3);
        let b = line(2);
        let total = total_amount(&[a, b], |id| {
            if id == a.product_id {
                Some(100)
            } else {
                Some(250)
            }
        })
        .unwrap();
        assert_eq!(total, 3 * 100 + 2 * 250);
    }

    #[test]
    fn total_rejects_overflow() {
        let a = line(2);
        let err = total_amount(&[a], |_| Some(u64::MAX)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn total_rejects_unknown_product() {
        let err = total_amount(&[line(1)], |_| None).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn patch_touches_only_contact_fields() {
        let mut order = Order {
            id: OrderId::new(),
            placed_at: Utc::now(),
            lines: vec![line(2)],
            customer: CustomerInfo {
                name: "Ada".to_string(),
                phone: "555-0101".to_string(),
                address: "1 Loop Rd".to_string(),
            },
            total_amount: 200,
            user_id: None,
        };
        let before_lines = order.lines.clone();

        let patch = OrderPatch {
            address: Some("2 Loop Rd".to_string()),
            ..Default::default()
        };
        patch.apply(&mut order).unwrap();

        assert_eq!(order.customer.address, "2 Loop Rd");
        assert_eq!(order.lines, before_lines);
        assert_eq!(order.total_amount, 200);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            #[test]
            fn total_never_panics(quantities in proptest::collection::vec(1i64..10_000, 1..8),
                                  price in 0u64..1_000_000) {
                let lines: Vec<LineItem> = quantities
                    .into_iter()
                    .map(|q| LineItem { product_id: ProductId::new(), quantity: q })
                    .collect();
                // Either a well-defined sum or a clean overflow error.
                let _ = total_amount(&lines, |_| Some(price));
            }

            #[test]
            fn total_matches_naive_sum_when_small(quantities in proptest::collection::vec(1i64..100, 1..6),
                                                  price in 0u64..10_000) {
                let lines: Vec<LineItem> = quantities
                    .iter()
                    .map(|&q| LineItem { product_id: ProductId::new(), quantity: q })
                    .collect();
                let expected: u64 = quantities.iter().map(|&q| q as u64 * price).sum();
                prop_assert_eq!(total_amount(&lines, |_| Some(price)).unwrap(), expected);
            }
        }
    }
}
