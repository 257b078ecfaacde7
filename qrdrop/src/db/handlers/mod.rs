//! Repository implementations for record store access.
//!
//! - [`Batches`]: the batch registry (create, append, list)

pub mod batches;

pub use batches::Batches;
