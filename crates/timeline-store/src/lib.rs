//! `timeline-store`: the volatile, ordered collection of timeline entries.
//!
//! Entries keep insertion order. Upserting an existing `id` rewrites it in
//! place; only a brand-new `id` is appended. Deleting shifts later entries
//! down by one. Nothing is persisted.

pub mod error;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{Applied, MessageStore};
