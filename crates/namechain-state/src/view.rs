use bitcoin::OutPoint;
use namechain_primitives::{Coin, Name, NameData};
use std::collections::BTreeSet;

/// Read access to coins and name records.
pub trait CoinsView {
    /// Returns the unspent coin at `outpoint`.
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin>;

    /// Returns the current record of `name`.
    fn name(&self, name: &[u8]) -> Option<NameData>;

    /// Returns all names whose record was last updated at `height`.
    fn names_for_height(&self, height: u32) -> BTreeSet<Name>;

    /// Returns `true` if the coin at `outpoint` is unspent.
    fn have_coin(&self, outpoint: &OutPoint) -> bool {
        self.coin(outpoint).is_some()
    }
}

/// Write access to coins and name records.
pub trait CoinsViewMut: CoinsView {
    /// Adds a coin, replacing any coin at the same outpoint.
    fn add_coin(&mut self, outpoint: OutPoint, coin: Coin);

    /// Spends the coin at `outpoint`, returning it.
    ///
    /// Returns `None` if there was no such coin.
    fn spend_coin(&mut self, outpoint: &OutPoint) -> Option<Coin>;

    /// Sets the record of `name`, replacing the previous one.
    fn set_name(&mut self, name: &[u8], data: NameData);

    /// Deletes the record of `name`.
    fn delete_name(&mut self, name: &[u8]);
}

/// Full iteration over a committed state, used to audit the name database.
pub trait NameDbSnapshot {
    /// Iterates over every unspent coin.
    fn coins(&self) -> impl Iterator<Item = (&OutPoint, &Coin)>;

    /// Iterates over every name record.
    fn names(&self) -> impl Iterator<Item = (&Name, &NameData)>;

    /// Iterates over the entries of the last-update height index.
    fn name_height_index(&self) -> impl Iterator<Item = (u32, &Name)>;
}
