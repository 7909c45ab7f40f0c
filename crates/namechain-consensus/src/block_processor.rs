//! Reference block driver connecting and disconnecting blocks against a coin view.
//!
//! Only the parts relevant to the name registry are enforced: name operation
//! validity, coin bookkeeping with undo data, and name expiration. Script and
//! amount verification are out of scope.

use crate::apply::apply_name_transaction;
use crate::chain_params::ChainParams;
use crate::expiration::{ExpirationError, expire_names, unexpire_names};
use crate::name_db::{NameDbCheck, NameDbFault, check_name_db};
use crate::verification::{NameCheckFlags, NameTxError, check_name_transaction};
use bitcoin::{Block, OutPoint, Transaction, TxOut, Txid};
use namechain_primitives::{Coin, NameData};
use namechain_script::NameScript;
use namechain_state::{
    BlockUndo, CoinsView, CoinsViewCache, CoinsViewMut, NameDbSnapshot, UndoStore,
};

/// Block processing error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transaction {txid} rejected: {source} ({})", .source.code())]
    InvalidTransaction {
        txid: Txid,
        #[source]
        source: NameTxError,
    },
    #[error("Coinbase transaction {0} has a name output")]
    CoinbaseNameOutput(Txid),
    #[error("Coin {outpoint} spent in {txid} not found")]
    MissingInput { txid: Txid, outpoint: OutPoint },
    #[error("Coin {0} created by the block is not in the view")]
    MissingCreatedCoin(OutPoint),
    #[error("Undo data does not match the block")]
    UndoMismatch,
    #[error("Cannot disconnect from an empty chain")]
    EmptyChain,
    #[error(transparent)]
    Expiration(#[from] ExpirationError),
    #[error(transparent)]
    NameDb(#[from] NameDbFault),
    #[error(transparent)]
    State(#[from] namechain_state::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Provably unspendable outputs never enter the UTXO set.
fn is_unspendable(txout: &TxOut) -> bool {
    txout.script_pubkey.is_op_return()
}

/// Connects `block` at `height`, returning the undo data needed to disconnect it.
///
/// On error the view may be partially updated, callers connect on top of a
/// [`CoinsViewCache`] and drop it.
pub fn connect_block(
    block: &Block,
    height: u32,
    view: &mut impl CoinsViewMut,
    params: &ChainParams,
) -> Result<BlockUndo> {
    let mut undo = BlockUndo::new();

    for tx in &block.txdata {
        let txid = tx.compute_txid();
        let is_coinbase = tx.is_coinbase();

        if is_coinbase {
            if tx
                .output
                .iter()
                .any(|txout| NameScript::parse(&txout.script_pubkey).is_some())
            {
                return Err(Error::CoinbaseNameOutput(txid));
            }
        } else {
            check_name_transaction(tx, height, &*view, params, NameCheckFlags::NONE)
                .map_err(|source| Error::InvalidTransaction { txid, source })?;

            for txin in &tx.input {
                let outpoint = txin.previous_output;
                let coin = view
                    .spend_coin(&outpoint)
                    .ok_or(Error::MissingInput { txid, outpoint })?;
                undo.record_spend(outpoint, coin);
            }
        }

        for (vout, txout) in tx.output.iter().enumerate() {
            if is_unspendable(txout) {
                continue;
            }
            let outpoint = OutPoint::new(txid, vout as u32);
            view.add_coin(outpoint, Coin::from_txout(txout, height, is_coinbase));
            undo.record_create(outpoint);
        }

        apply_name_transaction(tx, height, view, &mut undo);
    }

    let expired = expire_names(height, view, &mut undo, params)?;
    if !expired.is_empty() {
        tracing::debug!(target: "names", "{} names expired at height {height}", expired.len());
    }

    Ok(undo)
}

/// Disconnects `block` at `height` using the undo data recorded when it was connected.
///
/// Expirations are reverted first, then the coin changes of every transaction
/// in reverse order, then the name updates.
pub fn disconnect_block(
    block: &Block,
    height: u32,
    mut undo: BlockUndo,
    view: &mut impl CoinsViewMut,
    params: &ChainParams,
) -> Result<()> {
    unexpire_names(height, view, &undo, params)?;

    for tx in block.txdata.iter().rev() {
        let txid = tx.compute_txid();

        for (vout, txout) in tx.output.iter().enumerate().rev() {
            if is_unspendable(txout) {
                continue;
            }
            let outpoint = OutPoint::new(txid, vout as u32);
            if undo.created_outpoints.pop() != Some(outpoint) {
                return Err(Error::UndoMismatch);
            }
            view.spend_coin(&outpoint)
                .ok_or(Error::MissingCreatedCoin(outpoint))?;
        }

        if tx.is_coinbase() {
            continue;
        }

        for txin in tx.input.iter().rev() {
            match undo.spent_coins.pop() {
                Some((outpoint, coin)) if outpoint == txin.previous_output => {
                    view.add_coin(outpoint, coin);
                }
                _ => return Err(Error::UndoMismatch),
            }
        }
    }

    if !undo.created_outpoints.is_empty() || !undo.spent_coins.is_empty() {
        return Err(Error::UndoMismatch);
    }

    for name_undo in undo.name_undo.iter().rev() {
        name_undo.apply(view);
    }

    Ok(())
}

/// Chain state driving blocks through a coin view, one block at a time.
pub struct ChainState<V> {
    view: V,
    params: ChainParams,
    check_name_db: NameDbCheck,
    undo_store: UndoStore,
    tip: Option<u32>,
}

impl<V> ChainState<V>
where
    V: CoinsViewMut + NameDbSnapshot,
{
    /// Constructs a new instance of [`ChainState`] on top of an empty chain.
    ///
    /// The audit cadence defaults to the one of the chain parameters.
    pub fn new(view: V, params: ChainParams, check_name_db: Option<NameDbCheck>) -> Self {
        let check_name_db = check_name_db.unwrap_or(params.default_check_name_db);
        Self {
            view,
            params,
            check_name_db,
            undo_store: UndoStore::new(),
            tip: None,
        }
    }

    /// Returns the height of the best block, `None` before the genesis block.
    pub fn tip_height(&self) -> Option<u32> {
        self.tip
    }

    /// Returns the committed coin view.
    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    fn next_height(&self) -> u32 {
        self.tip.map_or(0, |tip| tip + 1)
    }

    /// Checks a transaction for inclusion in the next block without enforcing
    /// NAME_NEW maturity.
    pub fn check_mempool_transaction(
        &self,
        tx: &Transaction,
    ) -> std::result::Result<(), NameTxError> {
        check_name_transaction(
            tx,
            self.next_height(),
            &self.view,
            &self.params,
            NameCheckFlags::MEMPOOL,
        )
    }

    /// Connects `block` on top of the current tip.
    ///
    /// The name database is audited on the uncommitted state, nothing is
    /// committed if the block is rejected or the audit fails.
    pub fn connect_block(&mut self, block: &Block) -> Result<u32> {
        let height = self.next_height();

        let mut cache = CoinsViewCache::new(&mut self.view);
        let undo = connect_block(block, height, &mut cache, &self.params)?;
        check_name_db(&cache, height, false, self.check_name_db, &self.params)?;

        self.undo_store.put(height, &undo)?;
        cache.flush();
        self.tip = Some(height);

        tracing::info!(
            target: "names",
            "Connected block #{height} ({} txs, {} name updates, {} expired)",
            block.txdata.len(),
            undo.name_undo.len(),
            undo.expired.len(),
        );

        Ok(height)
    }

    /// Disconnects the tip, which must be `block`.
    ///
    /// Nothing is committed if the undo data does not match or the audit of the
    /// new tip fails.
    pub fn disconnect_tip(&mut self, block: &Block) -> Result<()> {
        let height = self.tip.ok_or(Error::EmptyChain)?;
        let undo = self.undo_store.take(height)?;
        let new_tip = height.checked_sub(1);

        let mut cache = CoinsViewCache::new(&mut self.view);
        let disconnected = disconnect_block(block, height, undo.clone(), &mut cache, &self.params)
            .and_then(|()| match new_tip {
                Some(tip) => Ok(check_name_db(&cache, tip, true, self.check_name_db, &self.params)?),
                None => Ok(()),
            });
        if let Err(err) = disconnected {
            // Keep the undo data so that the tip can still be disconnected.
            self.undo_store.put(height, &undo)?;
            return Err(err);
        }
        cache.flush();

        self.tip = new_tip;

        tracing::info!(target: "names", "Disconnected block #{height}");

        Ok(())
    }
}

impl<V: CoinsView> ChainState<V> {
    /// Returns the current record of `name`.
    pub fn name(&self, name: &[u8]) -> Option<NameData> {
        self.view.name(name)
    }
}
