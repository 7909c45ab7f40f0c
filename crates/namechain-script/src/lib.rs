//! Name operations embedded in output scripts.
//!
//! A name script prefixes an ordinary output script with the name operation:
//!
//! ```text
//! OP_NAME_NEW <hash> OP_2DROP <address>
//! OP_NAME_FIRSTUPDATE <name> <rand> <value> OP_2DROP OP_2DROP <address>
//! OP_NAME_UPDATE <name> <value> OP_2DROP OP_DROP <address>
//! OP_NAME_DOI <name> <value> OP_2DROP OP_DROP <address>
//! ```
//!
//! The prefix leaves the stack untouched, so the output is spent by satisfying
//! `<address>` alone.

use bitcoin::opcodes::Opcode;
use bitcoin::opcodes::all::{
    OP_2DROP, OP_DROP, OP_NOP, OP_PUSHNUM_1, OP_PUSHNUM_2, OP_PUSHNUM_3, OP_PUSHNUM_4,
};
use bitcoin::script::{Builder, Instruction, PushBytes, PushBytesError};
use bitcoin::{Script, ScriptBuf};
use namechain_primitives::{NAME_NEW_HASH_LENGTH, Valtype};

pub const OP_NAME_NEW: Opcode = OP_PUSHNUM_1;
pub const OP_NAME_FIRSTUPDATE: Opcode = OP_PUSHNUM_2;
pub const OP_NAME_UPDATE: Opcode = OP_PUSHNUM_3;
pub const OP_NAME_DOI: Opcode = OP_PUSHNUM_4;

/// Name script construction error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Name script argument is too large: {0}")]
    PushBytes(#[from] PushBytesError),
}

/// Kind of a name operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameOpKind {
    /// Commitment to a name without revealing it.
    New,
    /// Reveal of a prior commitment, registering the name.
    FirstUpdate,
    /// Renewal or modification of a registered name.
    Update,
    /// Registration which may also overwrite an existing name.
    DoiRegistration,
}

impl NameOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "name_new",
            Self::FirstUpdate => "name_firstupdate",
            Self::Update => "name_update",
            Self::DoiRegistration => "name_doi",
        }
    }
}

/// Name operation together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOp {
    New {
        hash: Valtype,
    },
    FirstUpdate {
        name: Valtype,
        rand: Valtype,
        value: Valtype,
    },
    Update {
        name: Valtype,
        value: Valtype,
    },
    DoiRegistration {
        name: Valtype,
        value: Valtype,
    },
}

/// Parsed name script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameScript {
    op: NameOp,
    address: ScriptBuf,
}

impl NameScript {
    /// Extracts the name operation from an output script.
    ///
    /// Returns `None` if the script does not carry a name operation.
    pub fn parse(script: &Script) -> Option<Self> {
        let mut instructions = script.instruction_indices();

        let name_op = match instructions.next()? {
            Ok((_, Instruction::Op(op))) => op,
            _ => return None,
        };

        let mut args = Vec::new();
        let mut address_start = None;

        // Pushes up to the first drop, then any number of drops.
        loop {
            match instructions.next() {
                Some(Ok((_, Instruction::PushBytes(bytes)))) if address_start.is_none() => {
                    args.push(bytes.as_bytes().to_vec());
                }
                Some(Ok((pos, Instruction::Op(op)))) if is_drop(op) => {
                    address_start = Some(pos + 1);
                }
                _ => break,
            }
        }

        let address = ScriptBuf::from_bytes(script.as_bytes()[address_start?..].to_vec());

        let mut args = args.into_iter();
        let op = match (name_op, args.len()) {
            (OP_NAME_NEW, 1) => NameOp::New {
                hash: args.next()?,
            },
            (OP_NAME_FIRSTUPDATE, 3) => NameOp::FirstUpdate {
                name: args.next()?,
                rand: args.next()?,
                value: args.next()?,
            },
            (OP_NAME_UPDATE, 2) => NameOp::Update {
                name: args.next()?,
                value: args.next()?,
            },
            (OP_NAME_DOI, 2) => NameOp::DoiRegistration {
                name: args.next()?,
                value: args.next()?,
            },
            _ => return None,
        };

        Some(Self { op, address })
    }

    pub fn op(&self) -> &NameOp {
        &self.op
    }

    pub fn kind(&self) -> NameOpKind {
        match self.op {
            NameOp::New { .. } => NameOpKind::New,
            NameOp::FirstUpdate { .. } => NameOpKind::FirstUpdate,
            NameOp::Update { .. } => NameOpKind::Update,
            NameOp::DoiRegistration { .. } => NameOpKind::DoiRegistration,
        }
    }

    /// Returns `true` for operations that register or update a name,
    /// i.e. everything except NAME_NEW.
    pub fn is_any_update(&self) -> bool {
        !matches!(self.op, NameOp::New { .. })
    }

    /// Returns the revealed name, `None` for NAME_NEW.
    pub fn name(&self) -> Option<&[u8]> {
        match &self.op {
            NameOp::New { .. } => None,
            NameOp::FirstUpdate { name, .. }
            | NameOp::Update { name, .. }
            | NameOp::DoiRegistration { name, .. } => Some(name),
        }
    }

    /// Returns the value, `None` for NAME_NEW.
    pub fn value(&self) -> Option<&[u8]> {
        match &self.op {
            NameOp::New { .. } => None,
            NameOp::FirstUpdate { value, .. }
            | NameOp::Update { value, .. }
            | NameOp::DoiRegistration { value, .. } => Some(value),
        }
    }

    /// Returns the commitment of NAME_NEW.
    pub fn hash(&self) -> Option<&[u8]> {
        match &self.op {
            NameOp::New { hash } => Some(hash),
            _ => None,
        }
    }

    /// Returns the rand value revealed by NAME_FIRSTUPDATE.
    pub fn rand(&self) -> Option<&[u8]> {
        match &self.op {
            NameOp::FirstUpdate { rand, .. } => Some(rand),
            _ => None,
        }
    }

    /// Returns the script following the name prefix.
    pub fn address(&self) -> &Script {
        &self.address
    }
}

fn is_drop(op: Opcode) -> bool {
    op == OP_DROP || op == OP_2DROP || op == OP_NOP
}

fn push_bytes(data: &[u8]) -> Result<&PushBytes, Error> {
    Ok(<&PushBytes>::try_from(data)?)
}

fn with_address(prefix: Builder, address: &Script) -> ScriptBuf {
    let mut bytes = prefix.into_script().into_bytes();
    bytes.extend_from_slice(address.as_bytes());
    ScriptBuf::from_bytes(bytes)
}

/// Builds a NAME_NEW script committing to `hash`.
pub fn build_name_new(address: &Script, hash: &[u8; NAME_NEW_HASH_LENGTH]) -> ScriptBuf {
    let prefix = Builder::new()
        .push_opcode(OP_NAME_NEW)
        .push_slice(hash)
        .push_opcode(OP_2DROP);
    with_address(prefix, address)
}

/// Builds a NAME_FIRSTUPDATE script.
pub fn build_name_firstupdate(
    address: &Script,
    name: &[u8],
    rand: &[u8],
    value: &[u8],
) -> Result<ScriptBuf, Error> {
    let prefix = Builder::new()
        .push_opcode(OP_NAME_FIRSTUPDATE)
        .push_slice(push_bytes(name)?)
        .push_slice(push_bytes(rand)?)
        .push_slice(push_bytes(value)?)
        .push_opcode(OP_2DROP)
        .push_opcode(OP_2DROP);
    Ok(with_address(prefix, address))
}

/// Builds a NAME_UPDATE script.
pub fn build_name_update(address: &Script, name: &[u8], value: &[u8]) -> Result<ScriptBuf, Error> {
    build_two_args(OP_NAME_UPDATE, address, name, value)
}

/// Builds a NAME_DOI script.
pub fn build_name_doi(address: &Script, name: &[u8], value: &[u8]) -> Result<ScriptBuf, Error> {
    build_two_args(OP_NAME_DOI, address, name, value)
}

fn build_two_args(
    op: Opcode,
    address: &Script,
    name: &[u8],
    value: &[u8],
) -> Result<ScriptBuf, Error> {
    let prefix = Builder::new()
        .push_opcode(op)
        .push_slice(push_bytes(name)?)
        .push_slice(push_bytes(value)?)
        .push_opcode(OP_2DROP)
        .push_opcode(OP_DROP);
    Ok(with_address(prefix, address))
}
