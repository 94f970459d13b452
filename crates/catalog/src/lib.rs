//! `stockfront-catalog` — the product record and its invariants.
//!
//! Stock mutation is owned by the inventory ledger operations on the product
//! store (`stockfront-infra`); this crate only defines the record and the
//! rules a well-formed product satisfies.

pub mod product;

pub use product::{Product, ProductPatch};
