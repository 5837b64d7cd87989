//! Currency conversion through the broker.
//!
//! Every converted amount is floored to the requested number of decimal
//! digits. Token-to-fiat conversions are also written to the rate cache so
//! the last known value stays available offline.

use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use topup_sdk::objects::ConversionResult;
use tracing::{debug, warn};

use crate::services::{
    CacheError, CachedRate, ConversionApi, RateDirection, RateKey, RatePersistence, ServiceError,
};
use crate::utils::numeric::is_non_negative_decimal;
use crate::utils::rounding::{MAX_SCALE, floor_to_scale};

pub const APPC: &str = "APPC";
pub const ETH: &str = "ETH";

/// Scale of the 1 APPC quote used to learn the local currency.
const LOCAL_CURRENCY_SCALE: u32 = 18;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("not a non-negative decimal: {0:?}")]
    InvalidAmount(String),

    #[error("scale {0} is out of range (max {MAX_SCALE})")]
    InvalidScale(u32),

    #[error("conversion failed: {0}")]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("no cached value for {direction:?} {amount}")]
    NotCached {
        direction: RateDirection,
        amount: Decimal,
    },
}

/// Converts amounts between APPC, ETH and fiat currencies.
#[derive(Clone)]
pub struct ConversionService {
    api: Arc<dyn ConversionApi>,
    cache: Option<Arc<dyn RatePersistence>>,
}

impl ConversionService {
    pub fn new(api: Arc<dyn ConversionApi>) -> Self {
        Self { api, cache: None }
    }

    pub fn with_cache(mut self, cache: Arc<dyn RatePersistence>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Convert `amount` of `source` into `target`, or into the local fiat
    /// currency when no target is given, flooring the result to `scale`
    /// digits.
    pub async fn convert(
        &self,
        amount: &str,
        source: &str,
        target: Option<&str>,
        scale: u32,
    ) -> Result<ConversionResult, ConversionError> {
        let amount = amount.trim();
        if !is_non_negative_decimal(amount) {
            return Err(ConversionError::InvalidAmount(amount.to_string()));
        }
        if scale > MAX_SCALE {
            return Err(ConversionError::InvalidScale(scale));
        }

        let body = self.api.convert(source, amount, target).await?;
        let result = ConversionResult::new(
            floor_to_scale(body.appc_value, scale),
            body.currency,
            body.symbol,
        );
        debug!(
            source,
            target = target.unwrap_or("local"),
            amount,
            result = %result.amount,
            "Converted amount"
        );
        Ok(result)
    }

    /// Local fiat currency of the user, learned from the 1 APPC quote.
    pub async fn local_currency(&self) -> Result<ConversionResult, ConversionError> {
        self.appc_to_local_fiat("1.0", LOCAL_CURRENCY_SCALE).await
    }

    pub async fn appc_to_local_fiat(
        &self,
        value: &str,
        scale: u32,
    ) -> Result<ConversionResult, ConversionError> {
        let result = self.convert(value, APPC, None, scale).await?;
        self.persist(RateDirection::AppcToFiat, value, &result).await;
        Ok(result)
    }

    pub async fn eth_to_local_fiat(
        &self,
        value: &str,
        scale: u32,
    ) -> Result<ConversionResult, ConversionError> {
        let result = self.convert(value, ETH, None, scale).await?;
        self.persist(RateDirection::EthToFiat, value, &result).await;
        Ok(result)
    }

    pub async fn fiat_to_appc(
        &self,
        currency: &str,
        value: &str,
        scale: u32,
    ) -> Result<ConversionResult, ConversionError> {
        self.convert(value, currency, Some(APPC), scale).await
    }

    pub async fn fiat_to_local_fiat(
        &self,
        currency: &str,
        value: &str,
        scale: u32,
    ) -> Result<ConversionResult, ConversionError> {
        self.convert(value, currency, None, scale).await
    }

    /// Last fiat value stored for `value` APPC, without touching the network.
    pub async fn cached_appc_to_local_fiat(
        &self,
        value: &str,
        scale: u32,
    ) -> Result<ConversionResult, ConversionError> {
        if scale > MAX_SCALE {
            return Err(ConversionError::InvalidScale(scale));
        }
        let key = Self::rate_key(RateDirection::AppcToFiat, value)?;
        let cached = match &self.cache {
            Some(cache) => cache.load_rate(&key).await?,
            None => None,
        };
        let cached = cached.ok_or(ConversionError::NotCached {
            direction: key.direction,
            amount: key.source_amount,
        })?;
        Ok(ConversionResult::new(
            floor_to_scale(cached.amount, scale),
            cached.currency,
            cached.symbol,
        ))
    }

    fn rate_key(direction: RateDirection, value: &str) -> Result<RateKey, ConversionError> {
        let value = value.trim();
        if !is_non_negative_decimal(value) {
            return Err(ConversionError::InvalidAmount(value.to_string()));
        }
        let amount = Decimal::from_str(value)
            .map_err(|_| ConversionError::InvalidAmount(value.to_string()))?;
        Ok(RateKey::new(direction, amount.normalize()))
    }

    async fn persist(&self, direction: RateDirection, value: &str, result: &ConversionResult) {
        let Some(cache) = &self.cache else {
            return;
        };
        let key = match Self::rate_key(direction, value) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Skipping rate cache write");
                return;
            }
        };
        let rate = CachedRate {
            amount: result.amount,
            currency: result.currency.clone(),
            symbol: result.symbol.clone(),
            saved_at: OffsetDateTime::now_utc(),
        };
        if let Err(e) = cache.save_rate(key, rate).await {
            warn!(error = %e, ?direction, value, "Failed to cache conversion rate");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryRateCache;
    use crate::test_utils::{MockConversion, dec};
    use async_trait::async_trait;

    struct BrokenCache;

    #[async_trait]
    impl RatePersistence for BrokenCache {
        async fn save_rate(&self, _key: RateKey, _rate: CachedRate) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::other("disk full")))
        }

        async fn load_rate(&self, _key: &RateKey) -> Result<Option<CachedRate>, CacheError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_result_is_floored_to_scale() {
        let service = ConversionService::new(Arc::new(MockConversion::fixed("2.567")));
        let result = service.convert("1.0", APPC, None, 2).await.unwrap();
        assert_eq!(result.amount.to_string(), "2.56");

        let service = ConversionService::new(Arc::new(MockConversion::fixed("2.999")));
        let result = service.convert("1.0", APPC, None, 2).await.unwrap();
        assert_eq!(result.amount.to_string(), "2.99");
        assert_eq!(result.currency, "EUR");
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_the_broker() {
        let api = Arc::new(MockConversion::fixed("1"));
        let service = ConversionService::new(api.clone());

        for amount in ["", "-1", "abc", "1."] {
            assert!(matches!(
                service.convert(amount, APPC, None, 2).await,
                Err(ConversionError::InvalidAmount(_))
            ));
        }
        assert!(matches!(
            service.convert("1", APPC, None, 29).await,
            Err(ConversionError::InvalidScale(29))
        ));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_direction_and_target() {
        let api = Arc::new(MockConversion::with_rate("20"));
        let service = ConversionService::new(api.clone());

        let appc = service.fiat_to_appc("EUR", "10", 2).await.unwrap();
        assert_eq!(appc.currency, "APPC");
        service.eth_to_local_fiat("0.5", 2).await.unwrap();
        service.fiat_to_local_fiat("USD", "3", 2).await.unwrap();

        let calls = api.calls();
        assert_eq!(calls[0].currency, "EUR");
        assert_eq!(calls[0].target.as_deref(), Some(APPC));
        assert_eq!(calls[1].currency, ETH);
        assert_eq!(calls[1].target, None);
        assert_eq!(calls[2].currency, "USD");
        assert_eq!(calls[2].target, None);
    }

    #[tokio::test]
    async fn test_broker_failure_is_typed() {
        let service = ConversionService::new(Arc::new(MockConversion::failing()));
        assert!(matches!(
            service.appc_to_local_fiat("1", 2).await,
            Err(ConversionError::Service(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_is_cached_and_served_offline() {
        let cache = Arc::new(InMemoryRateCache::new());
        let service = ConversionService::new(Arc::new(MockConversion::with_rate("0.0537")))
            .with_cache(cache.clone());

        let online = service.appc_to_local_fiat("100", 4).await.unwrap();
        assert_eq!(online.amount, dec("5.37"));

        let offline = service.cached_appc_to_local_fiat("100.0", 1).await.unwrap();
        assert_eq!(offline.amount, dec("5.3"));
        assert_eq!(offline.currency, "EUR");

        assert!(matches!(
            service.cached_appc_to_local_fiat("7", 2).await,
            Err(ConversionError::NotCached { .. })
        ));
    }

    #[tokio::test]
    async fn test_cache_failure_does_not_fail_conversion() {
        let service = ConversionService::new(Arc::new(MockConversion::fixed("3.14159")))
            .with_cache(Arc::new(BrokenCache));
        let result = service.appc_to_local_fiat("1", 3).await.unwrap();
        assert_eq!(result.amount, dec("3.141"));
    }
}
