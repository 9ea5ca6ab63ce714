//! Repository layer: query functions organized by domain.

pub mod likes;
pub mod moderation;
pub mod posts;
pub mod users;
