use serde::{Deserialize, Serialize};

/// Which revenue-share partner an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerRole {
    Store,
    Oem,
}

impl std::fmt::Display for PartnerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartnerRole::Store => write!(f, "store"),
            PartnerRole::Oem => write!(f, "oem"),
        }
    }
}

/// Wallet address a partner receives its share on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerAddress {
    pub address: String,
}
