//! Core domain models shared across all gw2style crates.
//!
//! These are the types the database stores and the API serializes.

pub mod moderation;
pub mod post;
pub mod user;

/// Re-export all model types for convenience.
pub use moderation::*;
pub use post::*;
pub use user::*;
