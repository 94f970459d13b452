//! Infrastructure layer: stores, the placement coordinator, the view composer.

pub mod placement;
pub mod store;
pub mod view;
