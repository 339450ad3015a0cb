//! Error types for the Breccia SDK.

use breccia_storage::StoreError;

/// Convenience alias used throughout the SDK.
pub type Result<T> = std::result::Result<T, BufferError>;

/// Errors surfaced by [`LogBuffer`](crate::LogBuffer) operations.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// The storage backend failed; for the journal backend this means a
    /// durability loss that must not be hidden as success.
    #[error("storage backend error")]
    Store(#[from] StoreError),

    /// A collaborator panicked while holding the buffer lock.
    #[error("buffer lock poisoned")]
    LockPoisoned,
}
