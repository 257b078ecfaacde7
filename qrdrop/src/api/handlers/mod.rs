//! Axum route handlers.

pub mod downloads;
pub mod pages;
pub mod static_assets;
pub mod uploads;
