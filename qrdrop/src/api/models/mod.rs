//! Request models for the download endpoints.

pub mod downloads;
