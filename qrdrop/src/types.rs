//! Identifier types shared across the crate.

use uuid::Uuid;

/// Random v4 UUID naming a group of files uploaded together.
pub type BatchId = Uuid;
