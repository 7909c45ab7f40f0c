//! Name expiration at block connect and its reversal at disconnect.
//!
//! A name expires once it was not updated for `expiration_depth(height)` blocks.
//! Expiring a name spends the coin currently holding it, while the record itself
//! stays in the database so that the expiration can be undone and the name
//! registered again.

use crate::chain_params::ChainParams;
use namechain_primitives::{Name, NameDisplay};
use namechain_script::NameScript;
use namechain_state::{BlockUndo, CoinsViewMut};
use std::collections::BTreeSet;

/// Name expiration fault.
///
/// These indicate a corrupted chain state rather than an invalid block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpirationError {
    #[error(
        "Expiration range at height {height} is inconsistent \
        (previous depth: {prev_depth}, depth: {depth})"
    )]
    InvalidRange {
        height: u32,
        prev_depth: u32,
        depth: u32,
    },
    #[error("Name {} not found in the database", NameDisplay(.0))]
    NameNotFound(Name),
    #[error("Name {} is not actually expired", NameDisplay(.0))]
    NotExpired(Name),
    #[error("Name coin for {} is not available", NameDisplay(.0))]
    CoinNotFound(Name),
    #[error("Name coin to be expired for {} has the wrong script", NameDisplay(.0))]
    WrongScript(Name),
    #[error("Wrong script to be unexpired")]
    WrongUnexpireScript,
    #[error("Name {} unexpired twice", NameDisplay(.0))]
    UnexpiredTwice(Name),
    #[error(
        "Name {} to be unexpired is not expired in the database \
        or it was already expired before height {1}",
        NameDisplay(.0)
    )]
    NotExpiredAtHeight(Name, u32),
}

/// Expires all names whose expiration is reached at `height`.
///
/// The spent name coins are pushed onto `undo.expired`. Returns the names that
/// expired in this block.
pub fn expire_names(
    height: u32,
    view: &mut impl CoinsViewMut,
    undo: &mut BlockUndo,
    params: &ChainParams,
) -> Result<BTreeSet<Name>, ExpirationError> {
    let mut names = BTreeSet::new();

    // No names expire in the genesis block.
    if height == 0 {
        return Ok(names);
    }

    let prev_depth = params.expiration_depth(height - 1);
    let depth = params.expiration_depth(height);

    if depth > height {
        return Ok(names);
    }

    let invalid_range = || ExpirationError::InvalidRange {
        height,
        prev_depth,
        depth,
    };

    // Both inclusive. `expire_from == expire_to + 1` happens while the depth
    // grows together with the height, in which case nothing expires.
    let expire_from = height.checked_sub(prev_depth).ok_or_else(invalid_range)?;
    let expire_to = height - depth;

    if u64::from(expire_from) > u64::from(expire_to) + 1 {
        return Err(invalid_range());
    }

    for update_height in expire_from..=expire_to {
        names.extend(view.names_for_height(update_height));
    }

    for name in &names {
        let data = view
            .name(name)
            .ok_or_else(|| ExpirationError::NameNotFound(name.clone()))?;

        if !params.is_name_expired(&data, height) {
            return Err(ExpirationError::NotExpired(name.clone()));
        }

        if params.is_legacy_expiry_skip(name, height) {
            tracing::debug!(
                target: "names",
                "Name coin of {} is already spent, skipping expiration",
                NameDisplay(name)
            );
            continue;
        }

        let outpoint = data.update_outpoint;
        let coin = view
            .coin(&outpoint)
            .ok_or_else(|| ExpirationError::CoinNotFound(name.clone()))?;

        let holds_name = NameScript::parse(coin.script())
            .is_some_and(|op| op.is_any_update() && op.name() == Some(name.as_slice()));
        if !holds_name {
            return Err(ExpirationError::WrongScript(name.clone()));
        }

        let coin = view
            .spend_coin(&outpoint)
            .ok_or_else(|| ExpirationError::CoinNotFound(name.clone()))?;

        tracing::debug!(
            target: "names",
            "Expiring name at height {height}: {}",
            NameDisplay(name)
        );

        undo.record_expired(coin);
    }

    Ok(names)
}

/// Restores the name coins spent by [`expire_names`] at `height`.
///
/// Must run before the transactions of the block are undone, while the name
/// records still reflect the state after the block. Returns the unexpired names.
pub fn unexpire_names(
    height: u32,
    view: &mut impl CoinsViewMut,
    undo: &BlockUndo,
    params: &ChainParams,
) -> Result<BTreeSet<Name>, ExpirationError> {
    let mut names = BTreeSet::new();

    if height == 0 {
        return Ok(names);
    }

    for coin in undo.expired.iter().rev() {
        let name = NameScript::parse(coin.script())
            .filter(NameScript::is_any_update)
            .and_then(|op| op.name().map(<[u8]>::to_vec))
            .ok_or(ExpirationError::WrongUnexpireScript)?;

        if !names.insert(name.clone()) {
            return Err(ExpirationError::UnexpiredTwice(name));
        }

        let data = view
            .name(&name)
            .ok_or_else(|| ExpirationError::NameNotFound(name.clone()))?;

        if !params.is_name_expired(&data, height) || params.is_name_expired(&data, height - 1) {
            return Err(ExpirationError::NotExpiredAtHeight(name, height));
        }

        tracing::debug!(
            target: "names",
            "Unexpiring name at height {height}: {}",
            NameDisplay(&name)
        );

        view.add_coin(data.update_outpoint, coin.clone());
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_params::NameRules;
    use bitcoin::hashes::Hash;
    use bitcoin::{OutPoint, PubkeyHash, ScriptBuf, Txid};
    use namechain_primitives::{Coin, NameData};
    use namechain_script::{build_name_new, build_name_update};
    use namechain_state::{CoinsView, MemoryCoinsView};

    fn params(depth: u32) -> ChainParams {
        ChainParams::custom(NameRules::Custom {
            expiration_depth: depth,
            min_name_coin_amount: 0,
        })
    }

    fn address() -> ScriptBuf {
        ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([3u8; 20]))
    }

    fn register(view: &mut MemoryCoinsView, name: &[u8], height: u32, n: u8) -> OutPoint {
        let outpoint = OutPoint::new(Txid::from_byte_array([n; 32]), 0);
        let script = build_name_update(&address(), name, b"v").unwrap();
        view.add_coin(outpoint, Coin::new(false, 1_000_000, height, script.to_bytes()));
        view.set_name(
            name,
            NameData {
                value: b"v".to_vec(),
                height,
                update_outpoint: outpoint,
                address: address(),
            },
        );
        outpoint
    }

    #[test]
    fn test_expire_at_exact_depth() {
        let params = params(12);
        let mut view = MemoryCoinsView::new();
        let outpoint = register(&mut view, b"d/a", 90, 1);

        let mut undo = BlockUndo::new();
        assert!(expire_names(101, &mut view, &mut undo, &params).unwrap().is_empty());
        assert!(view.have_coin(&outpoint));

        let expired = expire_names(102, &mut view, &mut undo, &params).unwrap();
        assert_eq!(expired, BTreeSet::from([b"d/a".to_vec()]));
        assert!(!view.have_coin(&outpoint));
        assert!(view.name(b"d/a").is_some());
        assert_eq!(undo.expired.len(), 1);
    }

    #[test]
    fn test_expire_unexpire_round_trip() {
        let params = params(10);
        let mut view = MemoryCoinsView::new();
        register(&mut view, b"d/a", 40, 1);
        register(&mut view, b"d/b", 40, 2);
        register(&mut view, b"d/c", 41, 3);
        let before = view.clone();

        let mut undo = BlockUndo::new();
        let expired = expire_names(50, &mut view, &mut undo, &params).unwrap();
        assert_eq!(expired.len(), 2);
        assert_eq!(view.coin_count(), 1);

        let unexpired = unexpire_names(50, &mut view, &undo, &params).unwrap();
        assert_eq!(unexpired, expired);
        assert_eq!(view, before);
    }

    #[test]
    fn test_genesis_and_shallow_chain() {
        let params = params(10);
        let mut view = MemoryCoinsView::new();
        register(&mut view, b"d/a", 0, 1);

        let mut undo = BlockUndo::new();
        assert!(expire_names(0, &mut view, &mut undo, &params).unwrap().is_empty());
        assert!(expire_names(9, &mut view, &mut undo, &params).unwrap().is_empty());
        assert_eq!(expire_names(10, &mut view, &mut undo, &params).unwrap().len(), 1);
    }

    #[test]
    fn test_growing_depth_expires_nothing() {
        // Mainnet depth grows with the height between 24000 and 48000.
        let params = ChainParams::custom(NameRules::Main);
        let mut view = MemoryCoinsView::new();
        register(&mut view, b"d/a", 12_000, 1);
        register(&mut view, b"d/b", 12_001, 2);

        let mut undo = BlockUndo::new();
        assert_eq!(
            expire_names(24_000, &mut view, &mut undo, &params).unwrap(),
            BTreeSet::from([b"d/a".to_vec()])
        );
        for height in [24_001, 30_000, 47_999, 48_000] {
            assert!(expire_names(height, &mut view, &mut undo, &params)
                .unwrap()
                .is_empty());
        }
        assert_eq!(
            expire_names(48_001, &mut view, &mut undo, &params).unwrap(),
            BTreeSet::from([b"d/b".to_vec()])
        );
    }

    #[test]
    fn test_expire_wrong_script() {
        let params = params(10);
        let mut view = MemoryCoinsView::new();
        let outpoint = register(&mut view, b"d/a", 40, 1);
        let script = build_name_new(&address(), &[0u8; 20]);
        view.add_coin(outpoint, Coin::new(false, 1, 40, script.to_bytes()));

        let mut undo = BlockUndo::new();
        assert_eq!(
            expire_names(50, &mut view, &mut undo, &params),
            Err(ExpirationError::WrongScript(b"d/a".to_vec()))
        );
    }

    #[test]
    fn test_expire_missing_coin() {
        let params = params(10);
        let mut view = MemoryCoinsView::new();
        let outpoint = register(&mut view, b"d/a", 40, 1);
        view.spend_coin(&outpoint);

        let mut undo = BlockUndo::new();
        assert_eq!(
            expire_names(50, &mut view, &mut undo, &params),
            Err(ExpirationError::CoinNotFound(b"d/a".to_vec()))
        );
    }

    #[test]
    fn test_legacy_expiry_skip() {
        let mut params = params(10);
        params.legacy_expiry_skip = Some((b"d/postmortem".to_vec(), 50));

        let mut view = MemoryCoinsView::new();
        let outpoint = register(&mut view, b"d/postmortem", 40, 1);
        view.spend_coin(&outpoint);

        let mut undo = BlockUndo::new();
        let expired = expire_names(50, &mut view, &mut undo, &params).unwrap();
        assert_eq!(expired.len(), 1);
        assert!(undo.expired.is_empty());
    }

    #[test]
    fn test_unexpire_rejects_inconsistent_undo() {
        let params = params(10);
        let mut view = MemoryCoinsView::new();
        register(&mut view, b"d/a", 40, 1);

        let mut undo = BlockUndo::new();
        expire_names(50, &mut view, &mut undo, &params).unwrap();

        // Unexpiring at another height than the expiration.
        assert_eq!(
            unexpire_names(51, &mut view.clone(), &undo, &params),
            Err(ExpirationError::NotExpiredAtHeight(b"d/a".to_vec(), 51))
        );

        // The same name twice.
        let coin = undo.expired[0].clone();
        undo.record_expired(coin);
        assert_eq!(
            unexpire_names(50, &mut view, &undo, &params),
            Err(ExpirationError::UnexpiredTwice(b"d/a".to_vec()))
        );
    }
}
