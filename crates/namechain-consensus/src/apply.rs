use bitcoin::{OutPoint, Transaction};
use namechain_primitives::{MEMPOOL_HEIGHT, NameData, NameDisplay};
use namechain_script::NameScript;
use namechain_state::{BlockUndo, CoinsViewMut, NameTxUndo};

/// Writes the name records of an already validated transaction confirmed at `height`.
///
/// The previous state of every touched name is appended to `undo.name_undo`.
pub fn apply_name_transaction(
    tx: &Transaction,
    height: u32,
    view: &mut impl CoinsViewMut,
    undo: &mut BlockUndo,
) {
    debug_assert_ne!(height, MEMPOOL_HEIGHT);

    let txid = tx.compute_txid();

    for (index, txout) in tx.output.iter().enumerate() {
        let Some(name_op) = NameScript::parse(&txout.script_pubkey) else {
            continue;
        };

        let (Some(name), Some(value)) = (name_op.name(), name_op.value()) else {
            continue;
        };

        tracing::debug!(
            target: "names",
            "Updating name at height {height}: {}",
            NameDisplay(name)
        );

        undo.record_name_undo(NameTxUndo::from_old_state(name, &*view));

        view.set_name(
            name,
            NameData {
                value: value.to_vec(),
                height,
                update_outpoint: OutPoint::new(txid, index as u32),
                address: name_op.address().to_owned(),
            },
        );
    }
}
