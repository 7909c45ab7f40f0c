use crate::{Error, Result};
use bitcoin::blockdata::script::Script;
use namechain_consensus::{ChainParams, NameDbCheckParams};
use namechain_primitives::{MEMPOOL_HEIGHT, NameDisplay, name_new_hash};
use namechain_script::NameScript;
use std::fmt::Write;

/// Bitcoin network type.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Network {
    /// Mainnet.
    Mainnet,
    /// Testnet.
    Testnet,
    /// Signet.
    Signet,
    /// Regtest.
    Regtest,
}

impl From<Network> for bitcoin::Network {
    fn from(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::Bitcoin,
            Network::Testnet => Self::Testnet,
            Network::Signet => Self::Signet,
            Network::Regtest => Self::Regtest,
        }
    }
}

/// Utilities
#[derive(Debug, clap::Subcommand)]
pub enum Tools {
    /// Decode the name operation of a hex encoded output script.
    #[command(name = "decode-script")]
    DecodeScript {
        #[arg(index = 1)]
        script: String,
    },

    /// Compute the NAME_NEW commitment of a name.
    #[command(name = "name-new-hash")]
    NameNewHash {
        /// Hex encoded rand value.
        #[arg(index = 1)]
        rand: String,
        /// The name, as text.
        #[arg(index = 2)]
        name: String,
    },

    /// Show the name expiration rules of a network at a given height.
    #[command(name = "expiration")]
    Expiration {
        /// Specify the chain network.
        #[arg(long, value_name = "NETWORK", default_value = "mainnet")]
        network: Network,

        /// Height of the last name update.
        #[arg(long)]
        height: u32,

        #[allow(missing_docs)]
        #[clap(flatten)]
        name_db: NameDbCheckParams,
    },
}

fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let str_without_0x = input.strip_prefix("0x").unwrap_or(input);
    Ok(hex::decode(str_without_0x)?)
}

fn decode_script(input: &str) -> Result<String> {
    let bytes = decode_hex(input)?;
    let script = Script::from_bytes(&bytes);

    let Some(name_op) = NameScript::parse(script) else {
        return Ok(format!("Not a name script: {script:?}"));
    };

    let mut out = format!("op: {}", name_op.kind().as_str());
    if let Some(name) = name_op.name() {
        let _ = write!(out, "\nname: {}", NameDisplay(name));
    }
    if let Some(value) = name_op.value() {
        let _ = write!(out, "\nvalue: {}", NameDisplay(value));
    }
    if let Some(hash) = name_op.hash() {
        let _ = write!(out, "\nhash: {}", hex::encode(hash));
    }
    if let Some(rand) = name_op.rand() {
        let _ = write!(out, "\nrand: {}", hex::encode(rand));
    }
    let _ = write!(out, "\naddress: {:?}", name_op.address());

    Ok(out)
}

fn name_new_commitment(rand: &str, name: &str) -> Result<String> {
    let rand = decode_hex(rand)?;
    if rand.len() > namechain_primitives::MAX_RAND_LENGTH {
        return Err(Error::Input(format!("rand is too long: {} bytes", rand.len())));
    }
    Ok(hex::encode(name_new_hash(&rand, name.as_bytes())))
}

/// Returns the first height at which a name updated at `height` is expired.
///
/// Names updated at [`MEMPOOL_HEIGHT`] never expire.
fn expiration_height(params: &ChainParams, height: u32) -> Option<u32> {
    if height >= MEMPOOL_HEIGHT {
        return None;
    }
    (height..MEMPOOL_HEIGHT).find(|at| params.is_expired(height, *at))
}

impl Tools {
    pub fn run(self) -> Result<()> {
        match self {
            Self::DecodeScript { script } => {
                println!("{}", decode_script(&script)?);
            }
            Self::NameNewHash { rand, name } => {
                println!("{}", name_new_commitment(&rand, &name)?);
            }
            Self::Expiration {
                network,
                height,
                name_db,
            } => {
                let params = ChainParams::new(network.into());
                let check_name_db = name_db
                    .check_name_db
                    .unwrap_or(params.default_check_name_db);

                tracing::debug!("Chain params: {params:?}");

                println!("expiration depth: {}", params.expiration_depth(height));
                println!("min name amount: {} sat", params.min_name_coin_amount(height));
                match expiration_height(&params, height) {
                    Some(at) => println!("expires at: {at}"),
                    None => println!("expires at: never"),
                }
                println!("check name db: {check_name_db}");
            }
        }
        Ok(())
    }
}
