//! `stockfront-parties` — directory users.
//!
//! Users exist only so an order can carry an optional reference to the person
//! who placed it; the view composer joins the full record back in at read
//! time. There is no authentication here.

pub mod user;

pub use user::User;
