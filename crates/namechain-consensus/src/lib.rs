//! Consensus rules of the name registry.
//!
//! Blocks are processed in the following order:
//!
//! 1. Every transaction is checked with [`check_name_transaction`] against the
//!    state before it, then its coins are updated and its name outputs applied
//!    with [`apply_name_transaction`].
//! 2. Once all transactions are connected, [`expire_names`] retires the names
//!    that were not renewed in time.
//!
//! Disconnecting runs the same steps backwards using the recorded [`BlockUndo`].
//!
//! [`BlockUndo`]: namechain_state::BlockUndo

mod apply;
mod block_processor;
mod chain_params;
mod expiration;
mod name_db;
mod verification;

pub use apply::apply_name_transaction;
pub use block_processor::{ChainState, Error as BlockError, connect_block, disconnect_block};
pub use chain_params::{ChainParams, DOI_OVERWRITE_CUTOFF, NameRules};
pub use expiration::{ExpirationError, expire_names, unexpire_names};
#[cfg(feature = "cli")]
pub use name_db::NameDbCheckParams;
pub use name_db::{NameDbCheck, NameDbError, NameDbFault, check_name_db, validate_name_db};
pub use verification::{NameCheckFlags, NameTxError, RejectionKind, check_name_transaction};
