//! In-memory doubles of the service traits.
//!
//! Every double counts its calls so tests can assert on how often the
//! network would have been hit. Latencies are plain `tokio::time::sleep`s and
//! are meant to be used with paused time.

use async_trait::async_trait;
use compact_str::CompactString;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use topup_sdk::objects::{
    BonusStatus, ConversionResponseBody, ConversionResult, ForecastBonus, PaymentInfoModel,
    PaymentMethodData, PaymentModel, PaymentRequest, TopUpLimits, TransactionResponse,
    TransactionStatus,
};

use crate::services::{
    BonusService, ConversionApi, PartnerAddressService, PaymentProvider, ServiceError,
    TopUpLimitsService, TransactionSource,
};

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn method(id: &str) -> PaymentMethodData {
    PaymentMethodData {
        id: id.into(),
        label: id.to_string(),
        icon_url: None,
        min_amount: None,
        max_amount: None,
    }
}

pub fn limits(min: &str, max: &str) -> TopUpLimits {
    TopUpLimits {
        min: ConversionResult::new(dec(min), "EUR", "€"),
        max: ConversionResult::new(dec(max), "EUR", "€"),
    }
}

fn unavailable(what: &str) -> ServiceError {
    ServiceError::Unavailable(what.to_string())
}

// -- Conversion -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertCall {
    pub currency: String,
    pub value: String,
    pub target: Option<String>,
}

enum Quote {
    Rate(Decimal),
    Fixed(Decimal),
}

/// Broker double. Quotes `value * rate` (or a fixed amount) in EUR, or in the
/// requested target currency.
pub struct MockConversion {
    quote: Quote,
    delay: Duration,
    failing: bool,
    calls: Mutex<Vec<ConvertCall>>,
}

impl MockConversion {
    pub fn with_rate(rate: &str) -> Self {
        Self::new(Quote::Rate(dec(rate)))
    }

    pub fn fixed(amount: &str) -> Self {
        Self::new(Quote::Fixed(dec(amount)))
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(Quote::Fixed(Decimal::ZERO))
        }
    }

    fn new(quote: Quote) -> Self {
        Self {
            quote,
            delay: Duration::ZERO,
            failing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<ConvertCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ConversionApi for MockConversion {
    async fn convert(
        &self,
        currency: &str,
        value: &str,
        target: Option<&str>,
    ) -> Result<ConversionResponseBody, ServiceError> {
        self.calls.lock().unwrap().push(ConvertCall {
            currency: currency.to_string(),
            value: value.to_string(),
            target: target.map(str::to_string),
        });
        tokio::time::sleep(self.delay).await;
        if self.failing {
            return Err(unavailable("broker"));
        }
        let appc_value = match self.quote {
            Quote::Rate(rate) => dec(value) * rate,
            Quote::Fixed(amount) => amount,
        };
        let (currency, symbol) = match target {
            Some(target) => (CompactString::from(target), CompactString::from(target)),
            None => (CompactString::from("EUR"), CompactString::from("€")),
        };
        Ok(ConversionResponseBody {
            appc_value,
            currency,
            symbol,
        })
    }
}

// -- Transactions ---------------------------------------------------------

/// Plays back a fixed sequence of statuses, repeating the last one.
pub struct StatusScript {
    statuses: Mutex<VecDeque<TransactionStatus>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StatusScript {
    pub fn new(statuses: &[TransactionStatus]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self, uid: &str) -> Result<TransactionResponse, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let status = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().copied()
            }
        };
        let status = status.ok_or_else(|| unavailable("transactions"))?;
        Ok(TransactionResponse {
            uid: uid.to_string(),
            status,
            hash: None,
            order_reference: None,
        })
    }
}

#[async_trait]
impl TransactionSource for StatusScript {
    async fn transaction(&self, uid: &str) -> Result<TransactionResponse, ServiceError> {
        self.next(uid).await
    }
}

// -- Payment provider -----------------------------------------------------

pub struct MockPaymentProvider {
    pub methods: Vec<PaymentMethodData>,
    pub response: PaymentModel,
    pub fail_payment: bool,
    pub statuses: StatusScript,
    pub requests: Mutex<Vec<PaymentRequest>>,
    pub redirects: AtomicUsize,
    pub disabled: AtomicUsize,
}

impl MockPaymentProvider {
    pub fn new(response: PaymentModel) -> Self {
        Self {
            methods: vec![method("paypal"), method("credit_card"), method("sofort")],
            response,
            fail_payment: false,
            statuses: StatusScript::new(&[TransactionStatus::Completed]),
            requests: Mutex::new(Vec::new()),
            redirects: AtomicUsize::new(0),
            disabled: AtomicUsize::new(0),
        }
    }

    pub fn with_statuses(mut self, statuses: StatusScript) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn submitted(&self) -> Vec<PaymentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn payment_methods(&self) -> Result<Vec<PaymentMethodData>, ServiceError> {
        Ok(self.methods.clone())
    }

    async fn payment_info(
        &self,
        _method: &str,
        value: &str,
        currency: &str,
        _wallet_address: &str,
    ) -> Result<PaymentInfoModel, ServiceError> {
        Ok(PaymentInfoModel {
            payment_methods: serde_json::json!({"paymentMethods": []}),
            price_value: dec(value),
            price_currency: currency.into(),
            is_stored: false,
        })
    }

    async fn make_payment(&self, request: &PaymentRequest) -> Result<PaymentModel, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_payment {
            return Err(unavailable("gateway"));
        }
        Ok(self.response.clone())
    }

    async fn get_transaction(
        &self,
        uid: &str,
        _wallet_address: &str,
    ) -> Result<TransactionResponse, ServiceError> {
        self.statuses.next(uid).await
    }

    async fn submit_redirect(
        &self,
        _uid: &str,
        _wallet_address: &str,
        _details: &serde_json::Value,
        _payment_data: Option<&str>,
    ) -> Result<PaymentModel, ServiceError> {
        self.redirects.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }

    async fn disable_payments(&self, _wallet_address: &str) -> Result<(), ServiceError> {
        self.disabled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// -- Partners -------------------------------------------------------------

pub struct MockPartners {
    store: Option<String>,
    oem: Option<String>,
    delay: Duration,
}

impl MockPartners {
    pub fn new(store: Option<&str>, oem: Option<&str>) -> Self {
        Self {
            store: store.map(str::to_string),
            oem: oem.map(str::to_string),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PartnerAddressService for MockPartners {
    async fn store_address(&self, _package_name: &str) -> Result<String, ServiceError> {
        tokio::time::sleep(self.delay).await;
        self.store.clone().ok_or_else(|| unavailable("store partner"))
    }

    async fn oem_address(&self, _package_name: &str) -> Result<String, ServiceError> {
        tokio::time::sleep(self.delay).await;
        self.oem.clone().ok_or_else(|| unavailable("oem partner"))
    }
}

// -- Limits and bonus -----------------------------------------------------

pub struct MockLimits {
    limits: TopUpLimits,
    calls: AtomicUsize,
}

impl MockLimits {
    pub fn new(limits: TopUpLimits) -> Self {
        Self {
            limits,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TopUpLimitsService for MockLimits {
    async fn limits(&self, _currency: &str) -> Result<TopUpLimits, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.limits.clone())
    }
}

pub struct MockBonus {
    amount: Option<Decimal>,
    calls: Mutex<Vec<Decimal>>,
}

impl MockBonus {
    /// Active bonus of `amount` APPC, or a failing service for `None`.
    pub fn new(amount: Option<&str>) -> Self {
        Self {
            amount: amount.map(dec),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Decimal> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BonusService for MockBonus {
    async fn forecast(
        &self,
        _package_name: &str,
        appc_amount: Decimal,
    ) -> Result<ForecastBonus, ServiceError> {
        self.calls.lock().unwrap().push(appc_amount);
        let amount = self.amount.ok_or_else(|| unavailable("gamification"))?;
        Ok(ForecastBonus {
            status: BonusStatus::Active,
            amount,
            currency: "APPC".into(),
        })
    }
}
