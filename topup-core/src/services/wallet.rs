use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ServiceError, WalletResolver};

/// A wallet the user pays from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
}

impl Wallet {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Resolves to a fixed wallet, typically taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct DefaultWallet {
    wallet: Option<Wallet>,
}

impl DefaultWallet {
    pub fn new(wallet: Option<Wallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl WalletResolver for DefaultWallet {
    async fn find_default(&self) -> Result<Wallet, ServiceError> {
        self.wallet.clone().ok_or(ServiceError::NoWallet)
    }
}
