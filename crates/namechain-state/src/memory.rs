//! In-memory coin and name storage.

use crate::view::{CoinsView, CoinsViewMut, NameDbSnapshot};
use bitcoin::OutPoint;
use namechain_primitives::{Coin, Name, NameData};
use std::collections::{BTreeMap, BTreeSet};

/// UTXO set and name database held in memory.
///
/// Ordered maps keep iteration deterministic, which the name database audit
/// and the tests rely on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCoinsView {
    coins: BTreeMap<OutPoint, Coin>,
    names: BTreeMap<Name, NameData>,
    /// Names keyed by the height of their last update.
    names_by_height: BTreeMap<u32, BTreeSet<Name>>,
}

impl MemoryCoinsView {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of unspent coins.
    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    /// Returns the number of name records.
    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    fn unindex(&mut self, name: &[u8], height: u32) {
        if let Some(names) = self.names_by_height.get_mut(&height) {
            names.remove(name);
            if names.is_empty() {
                self.names_by_height.remove(&height);
            }
        }
    }
}

impl CoinsView for MemoryCoinsView {
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.get(outpoint).cloned()
    }

    fn name(&self, name: &[u8]) -> Option<NameData> {
        self.names.get(name).cloned()
    }

    fn names_for_height(&self, height: u32) -> BTreeSet<Name> {
        self.names_by_height
            .get(&height)
            .cloned()
            .unwrap_or_default()
    }

    fn have_coin(&self, outpoint: &OutPoint) -> bool {
        self.coins.contains_key(outpoint)
    }
}

impl CoinsViewMut for MemoryCoinsView {
    fn add_coin(&mut self, outpoint: OutPoint, coin: Coin) {
        self.coins.insert(outpoint, coin);
    }

    fn spend_coin(&mut self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.remove(outpoint)
    }

    fn set_name(&mut self, name: &[u8], data: NameData) {
        let height = data.height;
        if let Some(old) = self.names.insert(name.to_vec(), data) {
            self.unindex(name, old.height);
        }
        self.names_by_height
            .entry(height)
            .or_default()
            .insert(name.to_vec());
    }

    fn delete_name(&mut self, name: &[u8]) {
        if let Some(old) = self.names.remove(name) {
            self.unindex(name, old.height);
        }
    }
}

impl NameDbSnapshot for MemoryCoinsView {
    fn coins(&self) -> impl Iterator<Item = (&OutPoint, &Coin)> {
        self.coins.iter()
    }

    fn names(&self) -> impl Iterator<Item = (&Name, &NameData)> {
        self.names.iter()
    }

    fn name_height_index(&self) -> impl Iterator<Item = (u32, &Name)> {
        self.names_by_height
            .iter()
            .flat_map(|(height, names)| names.iter().map(move |name| (*height, name)))
    }
}
