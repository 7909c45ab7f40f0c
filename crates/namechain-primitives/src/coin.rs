use bitcoin::{Amount, Script, TxOut};
use serde::{Deserialize, Serialize};

/// Unspent transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Whether the coin is from a coinbase transaction.
    pub is_coinbase: bool,
    /// Transfer value in satoshis.
    pub amount: u64,
    // Block height at which this containing transaction was included.
    pub height: u32,
    /// Spending condition of the output.
    pub script_pubkey: Vec<u8>,
}

impl Coin {
    /// Constructs a new instance of [`Coin`].
    pub fn new(is_coinbase: bool, amount: u64, height: u32, script_pubkey: Vec<u8>) -> Self {
        Self {
            is_coinbase,
            amount,
            height,
            script_pubkey,
        }
    }

    /// Creates a coin from the transaction output confirmed at `height`.
    pub fn from_txout(txout: &TxOut, height: u32, is_coinbase: bool) -> Self {
        Self {
            is_coinbase,
            amount: txout.value.to_sat(),
            height,
            script_pubkey: txout.script_pubkey.to_bytes(),
        }
    }

    /// Returns the spending condition as [`Script`].
    pub fn script(&self) -> &Script {
        Script::from_bytes(&self.script_pubkey)
    }

    /// Returns the value of the coin.
    pub fn value(&self) -> Amount {
        Amount::from_sat(self.amount)
    }
}
