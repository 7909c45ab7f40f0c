use crate::name_db::NameDbCheck;
use bitcoin::Network;
use namechain_primitives::{COIN, Name, NameData, is_expired};
use std::ops::RangeInclusive;

/// Height above which a DOI registration may no longer take over an existing name.
pub const DOI_OVERWRITE_CUTOFF: u32 = 170_000;

/// Name rules varying between networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRules {
    /// Mainnet rules, with the expiration depth ramping up over the early chain.
    Main,
    /// Testnet and signet rules.
    Test,
    /// Short expiration for local testing.
    Regtest,
    /// Constant parameters, mostly for tests.
    Custom {
        expiration_depth: u32,
        min_name_coin_amount: u64,
    },
}

impl NameRules {
    /// Returns the number of blocks after which a name expires if it was last
    /// updated at or before `height - depth`.
    pub fn expiration_depth(&self, height: u32) -> u32 {
        match self {
            Self::Main => {
                // The depth grows together with the height between 24000 and 48000,
                // so no names expire in that range.
                if height < 24_000 {
                    12_000
                } else if height < 48_000 {
                    height - 12_000
                } else {
                    36_000
                }
            }
            Self::Test => 36_000,
            Self::Regtest => 30,
            Self::Custom {
                expiration_depth, ..
            } => *expiration_depth,
        }
    }

    /// Returns the minimum value of a name output at `height`, in satoshis.
    pub fn min_name_coin_amount(&self, height: u32) -> u64 {
        match self {
            Self::Main => {
                if height < 212_500 {
                    0
                } else {
                    COIN / 100
                }
            }
            Self::Test | Self::Regtest => COIN / 100,
            Self::Custom {
                min_name_coin_amount,
                ..
            } => *min_name_coin_amount,
        }
    }
}

/// Name registry parameters of a chain.
#[derive(Debug, Clone)]
pub struct ChainParams {
    /// Height dependent rules.
    pub rules: NameRules,
    /// See [`DOI_OVERWRITE_CUTOFF`].
    pub doi_overwrite_cutoff: u32,
    /// Name whose coin was already gone when it expired, with the expiration height.
    pub legacy_expiry_skip: Option<(Name, u32)>,
    /// Heights at which the name database is known to disagree with the UTXO set.
    pub legacy_inconsistency_window: Option<RangeInclusive<u32>>,
    /// How often to audit the name database unless configured otherwise.
    pub default_check_name_db: NameDbCheck,
}

impl ChainParams {
    /// Constructs a new instance of [`ChainParams`].
    pub fn new(network: Network) -> Self {
        match network {
            Network::Bitcoin => Self {
                rules: NameRules::Main,
                doi_overwrite_cutoff: DOI_OVERWRITE_CUTOFF,
                // Spent by the name stealing demonstration long before it expired.
                legacy_expiry_skip: Some((b"d/postmortem".to_vec(), 175_868)),
                legacy_inconsistency_window: Some(139_000..=180_000),
                default_check_name_db: NameDbCheck::Disabled,
            },
            Network::Regtest => Self {
                default_check_name_db: NameDbCheck::Always,
                ..Self::custom(NameRules::Regtest)
            },
            _ => Self::custom(NameRules::Test),
        }
    }

    /// Constructs parameters without any legacy exceptions.
    pub fn custom(rules: NameRules) -> Self {
        Self {
            rules,
            doi_overwrite_cutoff: DOI_OVERWRITE_CUTOFF,
            legacy_expiry_skip: None,
            legacy_inconsistency_window: None,
            default_check_name_db: NameDbCheck::Disabled,
        }
    }

    pub fn expiration_depth(&self, height: u32) -> u32 {
        self.rules.expiration_depth(height)
    }

    pub fn min_name_coin_amount(&self, height: u32) -> u64 {
        self.rules.min_name_coin_amount(height)
    }

    /// Returns `true` if a name last updated at `prev_height` is expired at `height`.
    pub fn is_expired(&self, prev_height: u32, height: u32) -> bool {
        is_expired(prev_height, height, self.expiration_depth(height))
    }

    /// Returns `true` if the name record is expired at `height`.
    pub fn is_name_expired(&self, data: &NameData, height: u32) -> bool {
        data.is_expired_with_depth(height, self.expiration_depth(height))
    }

    /// Returns `true` if `name` expiring at `height` must be left alone.
    pub fn is_legacy_expiry_skip(&self, name: &[u8], height: u32) -> bool {
        self.legacy_expiry_skip
            .as_ref()
            .is_some_and(|(skip_name, skip_height)| {
                *skip_height == height && skip_name.as_slice() == name
            })
    }

    /// Returns `true` if an inconsistent name database is tolerated at `height`.
    pub fn is_in_legacy_window(&self, height: u32) -> bool {
        self.legacy_inconsistency_window
            .as_ref()
            .is_some_and(|window| window.contains(&height))
    }
}
