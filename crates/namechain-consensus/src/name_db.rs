//! Consistency audit between the UTXO set and the name database.

use crate::chain_params::ChainParams;
use namechain_primitives::{Name, NameDisplay};
use namechain_script::NameScript;
use namechain_state::NameDbSnapshot;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// How often the name database is audited.
///
/// Parsed from an integer option: `-1` disables the audit,
/// `0` audits after every connected and disconnected block and `N` audits
/// after every connected block whose height is a multiple of `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameDbCheck {
    Disabled,
    Always,
    Every(NonZeroU32),
}

impl NameDbCheck {
    /// Returns `true` if the audit runs for the new tip at `height`.
    pub fn should_check(&self, height: u32, disconnect: bool) -> bool {
        match self {
            Self::Disabled => false,
            Self::Always => true,
            Self::Every(interval) => !disconnect && height % interval.get() == 0,
        }
    }
}

impl fmt::Display for NameDbCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "-1"),
            Self::Always => write!(f, "0"),
            Self::Every(interval) => write!(f, "{interval}"),
        }
    }
}

impl FromStr for NameDbCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let option: i64 = s
            .parse()
            .map_err(|err| format!("Invalid name database check option: {err}"))?;

        match option {
            -1 => Ok(Self::Disabled),
            0 => Ok(Self::Always),
            n => u32::try_from(n)
                .ok()
                .and_then(NonZeroU32::new)
                .map(Self::Every)
                .ok_or_else(|| format!("Name database check option out of range: {n}")),
        }
    }
}

/// Name database audit options.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Args)]
pub struct NameDbCheckParams {
    /// Audit the name database: -1 never, 0 after every block, N every N blocks.
    ///
    /// Defaults to the setting of the selected network.
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub check_name_db: Option<NameDbCheck>,
}

/// Mismatch found by [`validate_name_db`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameDbError {
    #[error("Name {} is held by more than one coin", NameDisplay(.0))]
    DuplicateNameCoin(Name),
    #[error("Height index entry {} at height {height} does not match the record", NameDisplay(.name))]
    HeightIndexMismatch { name: Name, height: u32 },
    #[error("Height index has {index} entries for {names} names")]
    HeightIndexSize { index: usize, names: usize },
    #[error("Unexpired name {} has no coin", NameDisplay(.0))]
    MissingNameCoin(Name),
    #[error("Name coin for {} has no unexpired record", NameDisplay(.0))]
    MissingNameRecord(Name),
}

/// Inconsistent name database outside of the tolerated legacy window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Name database is inconsistent at height {height}: {error}")]
pub struct NameDbFault {
    pub height: u32,
    pub error: NameDbError,
}

/// Cross-checks the UTXO set and the name database of the chain with tip at `height`.
///
/// Every unexpired name must be held by exactly one update coin and vice versa,
/// and the height index must match the records.
pub fn validate_name_db(
    view: &impl NameDbSnapshot,
    height: u32,
    params: &ChainParams,
) -> Result<(), NameDbError> {
    let mut names_in_utxo = BTreeSet::new();
    for (_outpoint, coin) in view.coins() {
        let Some(name_op) = NameScript::parse(coin.script()) else {
            continue;
        };
        let Some(name) = name_op.name() else {
            continue;
        };
        if !names_in_utxo.insert(name.to_vec()) {
            return Err(NameDbError::DuplicateNameCoin(name.to_vec()));
        }
    }

    let mut record_heights = BTreeMap::new();
    let mut names_in_db = BTreeSet::new();
    for (name, data) in view.names() {
        record_heights.insert(name, data.height);
        if !params.is_name_expired(data, height) {
            names_in_db.insert(name.clone());
        }
    }

    let mut index_size = 0;
    for (index_height, name) in view.name_height_index() {
        index_size += 1;
        if record_heights.get(name) != Some(&index_height) {
            return Err(NameDbError::HeightIndexMismatch {
                name: name.clone(),
                height: index_height,
            });
        }
    }
    if index_size != record_heights.len() {
        return Err(NameDbError::HeightIndexSize {
            index: index_size,
            names: record_heights.len(),
        });
    }

    if let Some(name) = names_in_db.difference(&names_in_utxo).next() {
        return Err(NameDbError::MissingNameCoin(name.clone()));
    }
    if let Some(name) = names_in_utxo.difference(&names_in_db).next() {
        return Err(NameDbError::MissingNameRecord(name.clone()));
    }

    Ok(())
}

/// Audits the name database after the tip moved to `height`, if due under `option`.
///
/// Failures within the legacy inconsistency window of the chain are only logged.
pub fn check_name_db(
    view: &impl NameDbSnapshot,
    height: u32,
    disconnect: bool,
    option: NameDbCheck,
    params: &ChainParams,
) -> Result<(), NameDbFault> {
    if !option.should_check(height, disconnect) {
        return Ok(());
    }

    match validate_name_db(view, height, params) {
        Ok(()) => {
            tracing::trace!(target: "names", "Name database is consistent at height {height}");
            Ok(())
        }
        Err(error) if params.is_in_legacy_window(height) => {
            tracing::warn!(
                target: "names",
                "Name database is inconsistent at height {height}: {error}. \
                This is expected due to 'name stealing'"
            );
            Ok(())
        }
        Err(error) => {
            tracing::error!(target: "names", "Name database is inconsistent at height {height}: {error}");
            Err(NameDbFault { height, error })
        }
    }
}
