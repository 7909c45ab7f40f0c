//! Primitives shared by the name registry crates.

mod coin;

use bitcoin::hashes::{Hash, hash160};
use bitcoin::transaction::Version;
use bitcoin::{OutPoint, Script, ScriptBuf, Transaction};
use serde::{Deserialize, Serialize};

pub use coin::Coin;

/// Raw bytes pushed by a name script (name, value, rand or hash).
pub type Valtype = Vec<u8>;

/// Name in the registry, compared by exact bytes.
pub type Name = Valtype;

/// 1 coin in satoshis.
pub const COIN: u64 = 100_000_000;

/// Height of coins created by transactions that are not yet confirmed.
pub const MEMPOOL_HEIGHT: u32 = 0x7FFF_FFFF;

/// Maximum length of a name in bytes.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of a name's value in bytes.
pub const MAX_VALUE_LENGTH: usize = 520;

/// Maximum length of the rand value revealed by NAME_FIRSTUPDATE.
pub const MAX_RAND_LENGTH: usize = 20;

/// Size of the hash committed to by NAME_NEW.
pub const NAME_NEW_HASH_LENGTH: usize = 20;

/// Number of blocks a NAME_NEW must be buried before NAME_FIRSTUPDATE may spend it.
pub const MIN_FIRSTUPDATE_DEPTH: u32 = 12;

/// Transaction version marking a transaction as allowed to carry name operations.
pub const NAME_TX_VERSION: Version = Version(0x7100);

/// Returns `true` if the transaction is marked as a name transaction.
pub fn is_name_tx(tx: &Transaction) -> bool {
    tx.version == NAME_TX_VERSION
}

/// Computes the NAME_NEW commitment `hash160(rand ++ name)`.
pub fn name_new_hash(rand: &[u8], name: &[u8]) -> [u8; NAME_NEW_HASH_LENGTH] {
    let mut to_hash = Vec::with_capacity(rand.len() + name.len());
    to_hash.extend_from_slice(rand);
    to_hash.extend_from_slice(name);
    hash160::Hash::hash(&to_hash).to_byte_array()
}

/// Returns `true` if a name last updated at `prev_height` is expired at `height`.
///
/// Names updated by unconfirmed transactions never expire.
pub fn is_expired(prev_height: u32, height: u32, expiration_depth: u32) -> bool {
    if prev_height == MEMPOOL_HEIGHT {
        return false;
    }

    u64::from(prev_height) + u64::from(expiration_depth) <= u64::from(height)
}

/// Current registration of a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameData {
    /// Value currently associated with the name.
    pub value: Valtype,
    /// Height of the last update.
    pub height: u32,
    /// Output currently holding the name.
    pub update_outpoint: OutPoint,
    /// Owner of the name, i.e. the script following the name prefix.
    pub address: ScriptBuf,
}

impl NameData {
    /// Returns `true` if the registration is expired at `height` under the given depth.
    pub fn is_expired_with_depth(&self, height: u32, expiration_depth: u32) -> bool {
        is_expired(self.height, height, expiration_depth)
    }

    /// Returns the owning script.
    pub fn address(&self) -> &Script {
        &self.address
    }
}

/// Displays a name for log and error messages.
///
/// Printable ASCII names are quoted, anything else is shown as hex.
pub struct NameDisplay<'a>(pub &'a [u8]);

impl std::fmt::Display for NameDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.iter().all(|byte| (0x20..0x7f).contains(byte)) {
            // Only printable ASCII, safe to interpret as UTF-8.
            write!(f, "'{}'", String::from_utf8_lossy(self.0))
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}

impl std::fmt::Debug for NameDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
