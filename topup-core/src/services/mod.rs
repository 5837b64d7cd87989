//! Seams between the top-up processors and the outside world.
//!
//! Each remote concern is a trait so processors can be driven by the SDK
//! clients in production (see [`remote`]) and by in-memory doubles in tests.

pub mod rate_cache;
pub mod remote;
pub mod wallet;

pub use rate_cache::{
    CacheError, CachedRate, InMemoryRateCache, JsonFileRateCache, RateDirection, RateKey,
    RatePersistence,
};
pub use remote::RemoteBonusService;
pub use wallet::{DefaultWallet, Wallet};

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use topup_sdk::client::ClientError;
use topup_sdk::objects::{
    ConversionResponseBody, ForecastBonus, PaymentInfoModel, PaymentMethodData, PaymentModel,
    PaymentRequest, TopUpLimits, TransactionResponse,
};

/// Errors returned by service implementations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The remote call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// No wallet is available to act on behalf of.
    #[error("no default wallet available")]
    NoWallet,

    /// The service is not reachable or refused to answer.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Exchange rate lookups.
#[async_trait]
pub trait ConversionApi: Send + Sync {
    /// Convert `value` expressed in `currency` into `target`, or into the
    /// caller's local fiat currency when `target` is `None`.
    async fn convert(
        &self,
        currency: &str,
        value: &str,
        target: Option<&str>,
    ) -> Result<ConversionResponseBody, ServiceError>;
}

/// Resolution of the wallet payments are made from.
#[async_trait]
pub trait WalletResolver: Send + Sync {
    async fn find_default(&self) -> Result<Wallet, ServiceError>;
}

/// Revenue-share routing addresses of the app being paid for.
#[async_trait]
pub trait PartnerAddressService: Send + Sync {
    async fn store_address(&self, package_name: &str) -> Result<String, ServiceError>;

    async fn oem_address(&self, package_name: &str) -> Result<String, ServiceError>;
}

/// The payment provider backend.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn payment_methods(&self) -> Result<Vec<PaymentMethodData>, ServiceError>;

    async fn payment_info(
        &self,
        method: &str,
        value: &str,
        currency: &str,
        wallet_address: &str,
    ) -> Result<PaymentInfoModel, ServiceError>;

    async fn make_payment(&self, request: &PaymentRequest) -> Result<PaymentModel, ServiceError>;

    async fn get_transaction(
        &self,
        uid: &str,
        wallet_address: &str,
    ) -> Result<TransactionResponse, ServiceError>;

    async fn submit_redirect(
        &self,
        uid: &str,
        wallet_address: &str,
        details: &serde_json::Value,
        payment_data: Option<&str>,
    ) -> Result<PaymentModel, ServiceError>;

    async fn disable_payments(&self, wallet_address: &str) -> Result<(), ServiceError>;
}

/// Minimum and maximum top-up amounts.
#[async_trait]
pub trait TopUpLimitsService: Send + Sync {
    async fn limits(&self, currency: &str) -> Result<TopUpLimits, ServiceError>;
}

/// Bonus forecasts for a purchase.
#[async_trait]
pub trait BonusService: Send + Sync {
    /// Bonus earned when spending `appc_amount` in `package_name`.
    async fn forecast(
        &self,
        package_name: &str,
        appc_amount: Decimal,
    ) -> Result<ForecastBonus, ServiceError>;
}

/// Source of transaction status updates.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn transaction(&self, uid: &str) -> Result<TransactionResponse, ServiceError>;
}
