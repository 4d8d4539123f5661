use thiserror::Error;

/// Errors that can occur while applying a mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A delete named an `id` that is not in the store. The store is unchanged.
    #[error("timeline entry not found: {id}")]
    NotFound { id: i64 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
