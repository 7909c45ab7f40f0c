//! Block undo data for chain reorganizations.
//!
//! When a block is connected, we save the coins that were spent, the outpoints
//! that were created, the previous state of every updated name and the coins
//! spent by name expiration. This allows us to revert the block if needed
//! during a reorg.

use crate::view::{CoinsView, CoinsViewMut};
use crate::{Error, Result};
use bitcoin::OutPoint;
use namechain_primitives::{Coin, Name, NameData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Previous state of a name touched by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTxUndo {
    /// The name.
    pub name: Name,
    /// Record before the update, `None` if the name did not exist.
    pub old_data: Option<NameData>,
}

impl NameTxUndo {
    /// Captures the current state of `name` in `view`.
    pub fn from_old_state(name: &[u8], view: &impl CoinsView) -> Self {
        Self {
            name: name.to_vec(),
            old_data: view.name(name),
        }
    }

    /// Restores the captured state.
    pub fn apply(&self, view: &mut impl CoinsViewMut) {
        match &self.old_data {
            Some(data) => view.set_name(&self.name, data.clone()),
            None => view.delete_name(&self.name),
        }
    }
}

/// Undo data for a single block.
///
/// Contains all information needed to revert the block's coin and name changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUndo {
    /// Coins that were spent by transaction inputs in this block.
    /// These need to be restored when reverting.
    pub spent_coins: Vec<(OutPoint, Coin)>,

    /// Outpoints that were created in this block.
    /// These need to be removed when reverting.
    pub created_outpoints: Vec<OutPoint>,

    /// Name states before each update, in block order.
    pub name_undo: Vec<NameTxUndo>,

    /// Name coins spent by expiration, in expiration order.
    pub expired: Vec<Coin>,
}

impl BlockUndo {
    /// Create a new empty BlockUndo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a spent coin.
    pub fn record_spend(&mut self, outpoint: OutPoint, coin: Coin) {
        self.spent_coins.push((outpoint, coin));
    }

    /// Record a created coin.
    pub fn record_create(&mut self, outpoint: OutPoint) {
        self.created_outpoints.push(outpoint);
    }

    /// Record the previous state of an updated name.
    pub fn record_name_undo(&mut self, undo: NameTxUndo) {
        self.name_undo.push(undo);
    }

    /// Record a name coin spent by expiration.
    pub fn record_expired(&mut self, coin: Coin) {
        self.expired.push(coin);
    }

    /// Serialize to bytes for storage.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Returns true if no changes were recorded.
    pub fn is_empty(&self) -> bool {
        self.spent_coins.is_empty()
            && self.created_outpoints.is_empty()
            && self.name_undo.is_empty()
            && self.expired.is_empty()
    }
}

/// Encoded block undo data keyed by block height.
#[derive(Debug, Default)]
pub struct UndoStore {
    entries: BTreeMap<u32, Vec<u8>>,
}

impl UndoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the undo data of the block at `height`.
    pub fn put(&mut self, height: u32, undo: &BlockUndo) -> Result<()> {
        self.entries.insert(height, undo.encode()?);
        Ok(())
    }

    /// Removes and returns the undo data of the block at `height`.
    pub fn take(&mut self, height: u32) -> Result<BlockUndo> {
        let bytes = self
            .entries
            .remove(&height)
            .ok_or(Error::UndoNotFound(height))?;
        BlockUndo::decode(&bytes)
    }

    /// Returns `true` if undo data exists for `height`.
    pub fn contains(&self, height: u32) -> bool {
        self.entries.contains_key(&height)
    }
}
