//! API route handlers organized by domain.

pub mod auth;
pub mod health;
pub mod likes;
pub mod moderation;
pub mod posts;
pub mod reports;
pub mod users;

use gw2style_common::pagination::Pagination;
use serde::Serialize;

/// `{ success, data }` envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

/// `{ success, data, pagination }` envelope for paged listings.
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// `{ success, message, post_id }` acknowledgement.
#[derive(Debug, Serialize)]
pub struct PostAck {
    pub success: bool,
    pub message: &'static str,
    pub post_id: i64,
}

impl PostAck {
    pub fn new(message: &'static str, post_id: i64) -> Self {
        Self {
            success: true,
            message,
            post_id,
        }
    }
}
