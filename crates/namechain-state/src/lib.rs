//! Chain state as seen by the name registry.
//!
//! ## Architecture
//!
//! - **Views**: [`CoinsView`] and [`CoinsViewMut`] are the only way the consensus
//!   code touches coins and name records.
//! - **Memory store**: [`MemoryCoinsView`] keeps the UTXO set, the name records and
//!   the index of names by last update height.
//! - **Overlay**: [`CoinsViewCache`] buffers the changes of a unit of work on top of
//!   another view, either flushed or dropped as a whole.
//! - **Undo data**: [`BlockUndo`] holds everything needed to revert a block.

mod cache;
mod error;
mod memory;
mod undo;
mod view;

pub use cache::CoinsViewCache;
pub use error::Error;
pub use memory::MemoryCoinsView;
pub use undo::{BlockUndo, NameTxUndo, UndoStore};
pub use view::{CoinsView, CoinsViewMut, NameDbSnapshot};

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, Error>;
