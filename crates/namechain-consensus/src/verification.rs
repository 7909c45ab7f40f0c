use crate::chain_params::ChainParams;
use bitcoin::{OutPoint, Transaction};
use bitflags::bitflags;
use namechain_primitives::{
    Coin, MAX_NAME_LENGTH, MAX_RAND_LENGTH, MAX_VALUE_LENGTH, MEMPOOL_HEIGHT,
    MIN_FIRSTUPDATE_DEPTH, NAME_NEW_HASH_LENGTH, Name, NameDisplay, is_name_tx, name_new_hash,
};
use namechain_script::{NameOpKind, NameScript};
use namechain_state::CoinsView;

bitflags! {
    /// Name transaction verification flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NameCheckFlags: u32 {
        const NONE = 0;
        /// The transaction is checked for the mempool, NAME_NEW maturity is not enforced.
        const MEMPOOL = 1 << 0;
    }
}

/// Category of a rejected name transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The transaction is invalid at any height.
    Consensus,
    /// The transaction may become valid at a later height.
    Premature,
    /// Some input coin is missing or already spent.
    MissingInputs,
}

/// Name transaction rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameTxError {
    #[error("Failed to fetch input coin {0}")]
    MissingInput(OutPoint),
    #[error("Multiple name inputs")]
    MultipleNameInputs,
    #[error("Multiple name outputs")]
    MultipleNameOutputs,
    #[error("Non-name transaction has name input")]
    NonNameWithNameInput,
    #[error("Non-name transaction has name output")]
    NonNameWithNameOutput,
    #[error("Name transaction has no name output")]
    NameWithoutNameOutput,
    #[error("Greedy name operation: output value {value} is below {min}")]
    Greedy { value: u64, min: u64 },
    #[error("NAME_NEW with previous name input")]
    NameNewWithNameInput,
    #[error("NAME_NEW's hash has the wrong size: {0}")]
    NameNewWrongSize(usize),
    #[error("Invalid name: {0} bytes")]
    InvalidName(usize),
    #[error("Invalid value: {0} bytes")]
    InvalidValue(usize),
    #[error("Name input for NAME_UPDATE is not an update")]
    UpdateInvalidPrev,
    #[error("NAME_UPDATE name mismatch to name input")]
    UpdateNameMismatch,
    #[error("{} name {} does not exist", .op.as_str(), NameDisplay(.name))]
    Nonexistent { op: NameOpKind, name: Name },
    #[error("NAME_UPDATE on an expired name {}", NameDisplay(.0))]
    UpdateExpired(Name),
    #[error("NAME_UPDATE input does not match the current record of {}", NameDisplay(.0))]
    UpdateOutpointMismatch(Name),
    #[error("NAME_DOI input is not a NAME_DOI")]
    DoiNotDoiInput,
    #[error("NAME_DOI name {} is already used", NameDisplay(.0))]
    DoiNameUsed(Name),
    #[error("NAME_FIRSTUPDATE input is not a NAME_NEW")]
    FirstUpdateNonNewInput,
    #[error("NAME_FIRSTUPDATE on immature NAME_NEW from height {new_height} at height {height}")]
    FirstUpdateImmature { new_height: u32, height: u32 },
    #[error("NAME_FIRSTUPDATE rand value is too large: {0} bytes")]
    FirstUpdateInvalidRand(usize),
    #[error("NAME_FIRSTUPDATE mismatch in hash / rand value")]
    FirstUpdateHashMismatch,
    #[error("NAME_FIRSTUPDATE on existing name {}", NameDisplay(.0))]
    FirstUpdateExistingName(Name),
}

impl NameTxError {
    /// Returns the stable rejection code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "bad-txns-inputs-missingorspent",
            Self::MultipleNameInputs => "tx-multiple-name-inputs",
            Self::MultipleNameOutputs => "tx-multiple-name-outputs",
            Self::NonNameWithNameInput => "tx-nonname-with-name-input",
            Self::NonNameWithNameOutput => "tx-nonname-with-name-output",
            Self::NameWithoutNameOutput => "tx-name-without-name-output",
            Self::Greedy { .. } => "tx-name-greedy",
            Self::NameNewWithNameInput => "tx-namenew-with-name-input",
            Self::NameNewWrongSize(_) => "tx-namenew-wrong-size",
            Self::InvalidName(_) => "tx-name-invalid",
            Self::InvalidValue(_) => "tx-value-invalid",
            Self::UpdateInvalidPrev => "tx-nameupdate-invalid-prev",
            Self::UpdateNameMismatch => "tx-nameupdate-name-mismatch",
            Self::Nonexistent { .. } => "tx-nameupdate-nonexistant",
            Self::UpdateExpired(_) => "tx-nameupdate-expired",
            Self::UpdateOutpointMismatch(_) => "tx-nameupdate-outpoint-mismatch",
            Self::DoiNotDoiInput => "tx-name-doi-not-name-doi-input",
            Self::DoiNameUsed(_) => "tx-name-doi-name-used",
            Self::FirstUpdateNonNewInput => "tx-firstupdate-nonnew-input",
            Self::FirstUpdateImmature { .. } => "tx-firstupdate-immature",
            Self::FirstUpdateInvalidRand(_) => "tx-firstupdate-invalid-rand",
            Self::FirstUpdateHashMismatch => "tx-firstupdate-hash-mismatch",
            Self::FirstUpdateExistingName(_) => "tx-firstupdate-existing-name",
        }
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::MissingInput(_) => RejectionKind::MissingInputs,
            Self::FirstUpdateImmature { .. } => RejectionKind::Premature,
            _ => RejectionKind::Consensus,
        }
    }
}

/// Name input of a transaction.
struct NameInput {
    outpoint: OutPoint,
    coin: Coin,
    script: NameScript,
}

/// Checks the name operations of `tx` for inclusion at `height`.
///
/// Transactions without name inputs and outputs are accepted as plain transfers,
/// the rest of the transaction (signatures, amounts) is not verified here.
pub fn check_name_transaction(
    tx: &Transaction,
    height: u32,
    view: &impl CoinsView,
    params: &ChainParams,
    flags: NameCheckFlags,
) -> Result<(), NameTxError> {
    let mut name_in: Option<NameInput> = None;
    for txin in &tx.input {
        let outpoint = txin.previous_output;
        let coin = view
            .coin(&outpoint)
            .ok_or(NameTxError::MissingInput(outpoint))?;

        if let Some(script) = NameScript::parse(coin.script()) {
            if name_in.is_some() {
                return Err(NameTxError::MultipleNameInputs);
            }
            name_in = Some(NameInput {
                outpoint,
                coin,
                script,
            });
        }
    }

    let mut name_out: Option<(usize, NameScript)> = None;
    for (index, txout) in tx.output.iter().enumerate() {
        if let Some(script) = NameScript::parse(&txout.script_pubkey) {
            if name_out.is_some() {
                return Err(NameTxError::MultipleNameOutputs);
            }
            name_out = Some((index, script));
        }
    }

    if !is_name_tx(tx) {
        if name_in.is_some() {
            return Err(NameTxError::NonNameWithNameInput);
        }
        if name_out.is_some() {
            return Err(NameTxError::NonNameWithNameOutput);
        }
        return Ok(());
    }

    let Some((out_index, name_op)) = name_out else {
        return Err(NameTxError::NameWithoutNameOutput);
    };

    let value = tx.output[out_index].value.to_sat();
    let min = params.min_name_coin_amount(height);
    if value < min {
        return Err(NameTxError::Greedy { value, min });
    }

    if let Some(hash) = name_op.hash() {
        if name_in.is_some() {
            return Err(NameTxError::NameNewWithNameInput);
        }
        if hash.len() != NAME_NEW_HASH_LENGTH {
            return Err(NameTxError::NameNewWrongSize(hash.len()));
        }
        return Ok(());
    }

    // Everything except NAME_NEW carries a name and a value.
    let (Some(name), Some(value)) = (name_op.name(), name_op.value()) else {
        return Err(NameTxError::NameWithoutNameOutput);
    };

    if name.len() > MAX_NAME_LENGTH {
        return Err(NameTxError::InvalidName(name.len()));
    }
    if value.len() > MAX_VALUE_LENGTH {
        return Err(NameTxError::InvalidValue(value.len()));
    }

    match name_op.kind() {
        NameOpKind::Update => check_name_update(name, name_in, height, view, params),
        NameOpKind::DoiRegistration => check_name_doi(name, name_in, view, params),
        NameOpKind::FirstUpdate => {
            check_name_firstupdate(name, &name_op, name_in, height, view, params, flags)
        }
        NameOpKind::New => Ok(()),
    }
}

fn check_name_update(
    name: &[u8],
    name_in: Option<NameInput>,
    height: u32,
    view: &impl CoinsView,
    params: &ChainParams,
) -> Result<(), NameTxError> {
    let Some(name_in) = name_in.filter(|input| input.script.is_any_update()) else {
        return Err(NameTxError::UpdateInvalidPrev);
    };

    if name_in.script.name() != Some(name) {
        return Err(NameTxError::UpdateNameMismatch);
    }

    // The input is still unconfirmed, the name database can't know about it yet.
    if name_in.coin.height == MEMPOOL_HEIGHT {
        return Ok(());
    }

    let old = view.name(name).ok_or_else(|| NameTxError::Nonexistent {
        op: NameOpKind::Update,
        name: name.to_vec(),
    })?;

    if params.is_name_expired(&old, height) {
        return Err(NameTxError::UpdateExpired(name.to_vec()));
    }

    if old.height != name_in.coin.height || old.update_outpoint != name_in.outpoint {
        return Err(NameTxError::UpdateOutpointMismatch(name.to_vec()));
    }

    Ok(())
}

fn check_name_doi(
    name: &[u8],
    name_in: Option<NameInput>,
    view: &impl CoinsView,
    params: &ChainParams,
) -> Result<(), NameTxError> {
    let old = view.name(name);

    match name_in {
        Some(name_in) => {
            if old.is_none() {
                return Err(NameTxError::Nonexistent {
                    op: NameOpKind::DoiRegistration,
                    name: name.to_vec(),
                });
            }
            if name_in.script.kind() != NameOpKind::DoiRegistration {
                return Err(NameTxError::DoiNotDoiInput);
            }
        }
        None => {
            // Fresh registrations may take over names last written at or below the cutoff.
            if old.is_some_and(|old| old.height > params.doi_overwrite_cutoff) {
                return Err(NameTxError::DoiNameUsed(name.to_vec()));
            }
        }
    }

    Ok(())
}

fn check_name_firstupdate(
    name: &[u8],
    name_op: &NameScript,
    name_in: Option<NameInput>,
    height: u32,
    view: &impl CoinsView,
    params: &ChainParams,
    flags: NameCheckFlags,
) -> Result<(), NameTxError> {
    let Some(name_in) = name_in.filter(|input| input.script.kind() == NameOpKind::New) else {
        return Err(NameTxError::FirstUpdateNonNewInput);
    };

    if !flags.contains(NameCheckFlags::MEMPOOL)
        && u64::from(name_in.coin.height) + u64::from(MIN_FIRSTUPDATE_DEPTH) > u64::from(height)
    {
        return Err(NameTxError::FirstUpdateImmature {
            new_height: name_in.coin.height,
            height,
        });
    }

    let rand = name_op.rand().unwrap_or_default();
    if rand.len() > MAX_RAND_LENGTH {
        return Err(NameTxError::FirstUpdateInvalidRand(rand.len()));
    }

    if name_in.script.hash() != Some(name_new_hash(rand, name).as_slice()) {
        return Err(NameTxError::FirstUpdateHashMismatch);
    }

    if view
        .name(name)
        .is_some_and(|old| !params.is_name_expired(&old, height))
    {
        return Err(NameTxError::FirstUpdateExistingName(name.to_vec()));
    }

    Ok(())
}
