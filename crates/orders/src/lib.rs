//! `stockfront-orders` — the order record, its incoming draft, and the rules
//! for validating and pricing one.
//!
//! Placement itself (reserve stock, persist, compensate) lives in
//! `stockfront-infra::placement`; this crate is the pure domain side.

pub mod order;

pub use order::{total_amount, CustomerInfo, LineItem, Order, OrderDraft, OrderPatch};
