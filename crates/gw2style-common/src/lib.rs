//! # gw2style-common
//!
//! Shared types, configuration, error handling, and utilities used across all gw2style crates.
//! This is the foundation layer: no I/O beyond loading configuration.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod validation;
