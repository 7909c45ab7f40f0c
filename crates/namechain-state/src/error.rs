//! Error types for the chain state.

/// Errors that can occur during state operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bincode serialization/deserialization error.
    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Block undo data not found.
    #[error("Undo data not found for height {0}")]
    UndoNotFound(u32),
}
