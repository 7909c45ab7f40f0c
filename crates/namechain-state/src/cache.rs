//! Transactional overlay on top of another view.
//!
//! Reads fall through to the base view unless the overlay has an entry for the key.
//! Writes only touch the overlay until [`CoinsViewCache::flush`] is called; dropping
//! the cache discards them.

use crate::view::{CoinsView, CoinsViewMut, NameDbSnapshot};
use bitcoin::OutPoint;
use namechain_primitives::{Coin, Name, NameData};
use std::collections::{BTreeSet, HashMap};

/// Overlay of coin and name changes on top of `base`.
pub struct CoinsViewCache<'a, V> {
    base: &'a mut V,
    /// `None` marks a coin spent in the overlay.
    coins: HashMap<OutPoint, Option<Coin>>,
    /// `None` marks a name deleted in the overlay.
    names: HashMap<Name, Option<NameData>>,
}

impl<'a, V: CoinsViewMut> CoinsViewCache<'a, V> {
    /// Creates an empty overlay over `base`.
    pub fn new(base: &'a mut V) -> Self {
        Self {
            base,
            coins: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Returns the number of pending coin and name entries.
    pub fn pending_changes(&self) -> usize {
        self.coins.len() + self.names.len()
    }

    /// Writes all pending changes to the base view.
    pub fn flush(self) {
        let Self { base, coins, names } = self;

        let (coin_count, name_count) = (coins.len(), names.len());

        for (outpoint, entry) in coins {
            match entry {
                Some(coin) => base.add_coin(outpoint, coin),
                None => {
                    base.spend_coin(&outpoint);
                }
            }
        }

        for (name, entry) in names {
            match entry {
                Some(data) => base.set_name(&name, data),
                None => base.delete_name(&name),
            }
        }

        tracing::trace!("Flushed {coin_count} coin and {name_count} name changes");
    }
}

impl<V: CoinsView> CoinsView for CoinsViewCache<'_, V> {
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        match self.coins.get(outpoint) {
            Some(entry) => entry.clone(),
            None => self.base.coin(outpoint),
        }
    }

    fn name(&self, name: &[u8]) -> Option<NameData> {
        match self.names.get(name) {
            Some(entry) => entry.clone(),
            None => self.base.name(name),
        }
    }

    fn names_for_height(&self, height: u32) -> BTreeSet<Name> {
        let mut names = self.base.names_for_height(height);

        // Overlay entries supersede whatever the base has indexed for them.
        names.retain(|name| !self.names.contains_key(name));

        names.extend(self.names.iter().filter_map(|(name, entry)| {
            entry
                .as_ref()
                .filter(|data| data.height == height)
                .map(|_| name.clone())
        }));

        names
    }
}

impl<V: CoinsView> CoinsViewMut for CoinsViewCache<'_, V> {
    fn add_coin(&mut self, outpoint: OutPoint, coin: Coin) {
        self.coins.insert(outpoint, Some(coin));
    }

    fn spend_coin(&mut self, outpoint: &OutPoint) -> Option<Coin> {
        let coin = self.coin(outpoint)?;
        self.coins.insert(*outpoint, None);
        Some(coin)
    }

    fn set_name(&mut self, name: &[u8], data: NameData) {
        self.names.insert(name.to_vec(), Some(data));
    }

    fn delete_name(&mut self, name: &[u8]) {
        self.names.insert(name.to_vec(), None);
    }
}

impl<V: NameDbSnapshot> NameDbSnapshot for CoinsViewCache<'_, V> {
    fn coins(&self) -> impl Iterator<Item = (&OutPoint, &Coin)> {
        self.base
            .coins()
            .filter(|(outpoint, _)| !self.coins.contains_key(*outpoint))
            .chain(
                self.coins
                    .iter()
                    .filter_map(|(outpoint, entry)| entry.as_ref().map(|coin| (outpoint, coin))),
            )
    }

    fn names(&self) -> impl Iterator<Item = (&Name, &NameData)> {
        self.base
            .names()
            .filter(|(name, _)| !self.names.contains_key(*name))
            .chain(
                self.names
                    .iter()
                    .filter_map(|(name, entry)| entry.as_ref().map(|data| (name, data))),
            )
    }

    fn name_height_index(&self) -> impl Iterator<Item = (u32, &Name)> {
        self.base
            .name_height_index()
            .filter(|(_, name)| !self.names.contains_key(*name))
            .chain(
                self.names
                    .iter()
                    .filter_map(|(name, entry)| entry.as_ref().map(|data| (data.height, name))),
            )
    }
}
