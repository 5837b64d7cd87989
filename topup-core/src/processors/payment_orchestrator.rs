//! Payment submission.
//!
//! A payment request is only sent once everything it depends on has been
//! resolved: the paying wallet and, for app purchases, the store and OEM
//! routing addresses. A failure in any of these steps is reported as its own
//! [`PaymentError`] variant and nothing reaches the provider.

use async_trait::async_trait;
use compact_str::CompactString;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use topup_sdk::objects::{
    PartnerRole, PaymentAction, PaymentInfoModel, PaymentMethodData, PaymentModel,
    PaymentRequest, TransactionResponse, TransactionStatus,
};
use tracing::{info, warn};

use super::status_poller::StatusFilter;
use crate::events::PaymentSubmission;
use crate::services::{
    PartnerAddressService, PaymentProvider, ServiceError, TransactionSource, Wallet,
    WalletResolver,
};
use crate::state::AmountEntry;

/// Transaction type of wallet top-ups.
pub const TOP_UP_TRANSACTION_TYPE: &str = "TOPUP";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("failed to resolve the wallet: {0}")]
    Identity(#[source] ServiceError),

    #[error("failed to resolve the {role} address: {source}")]
    RoutingAddress {
        role: PartnerRole,
        #[source]
        source: ServiceError,
    },

    #[error("payment submission failed: {0}")]
    Submission(#[source] ServiceError),

    #[error("payment refused: {reason}")]
    Refused { uid: Option<String>, reason: String },

    #[error("provider response carries no transaction")]
    MissingTransaction,
}

/// Everything needed to pay for one order, except the resolved addresses.
#[derive(Debug, Clone)]
pub struct PaymentOrder {
    /// Payment method identifier, e.g. `credit_card`.
    pub method: CompactString,
    /// Provider payment method payload.
    pub payment: serde_json::Value,
    pub return_url: String,
    pub value: Decimal,
    pub currency: CompactString,
    pub package_name: String,
    pub transaction_type: String,
    pub reference: Option<String>,
    pub origin: Option<String>,
    pub metadata: Option<String>,
    pub sku: Option<String>,
    pub callback_url: Option<String>,
    pub developer_wallet: Option<String>,
}

impl PaymentOrder {
    /// Top-up of the fiat amount of `entry`. `None` unless that amount is
    /// positive.
    pub fn top_up(
        method: &PaymentMethodData,
        entry: &AmountEntry,
        submission: PaymentSubmission,
        package_name: impl Into<String>,
    ) -> Option<Self> {
        let value = entry.fiat.positive()?;
        Some(Self {
            method: method.id.clone(),
            payment: submission.payment,
            return_url: submission.return_url,
            value,
            currency: entry.currency.code.clone(),
            package_name: package_name.into(),
            transaction_type: TOP_UP_TRANSACTION_TYPE.to_string(),
            reference: None,
            origin: None,
            metadata: None,
            sku: None,
            callback_url: None,
            developer_wallet: None,
        })
    }

    fn request(&self, wallet: &Wallet, routing: Option<(String, String)>) -> PaymentRequest {
        let (store_wallet, oem_wallet, user_wallet) = match routing {
            Some((store, oem)) => (Some(store), Some(oem), Some(wallet.address.clone())),
            None => (None, None, None),
        };
        PaymentRequest {
            payment: self.payment.clone(),
            return_url: self.return_url.clone(),
            price_value: self.value,
            price_currency: self.currency.clone(),
            reference: self.reference.clone(),
            method: self.method.to_string(),
            wallet_address: wallet.address.clone(),
            origin: self.origin.clone(),
            domain: self.package_name.clone(),
            metadata: self.metadata.clone(),
            sku: self.sku.clone(),
            callback_url: self.callback_url.clone(),
            transaction_type: self.transaction_type.clone(),
            developer_wallet: self.developer_wallet.clone(),
            store_wallet,
            oem_wallet,
            user_wallet,
        }
    }
}

/// What the provider made of a submitted payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The user has to complete the payment with the provider.
    Redirect {
        uid: Option<String>,
        action: PaymentAction,
    },
    /// The transaction already settled.
    Finished {
        uid: String,
        status: TransactionStatus,
    },
    /// The transaction is being processed and should be polled.
    Pending { uid: String },
}

impl PaymentOutcome {
    fn from_model(model: PaymentModel) -> Result<Self, PaymentError> {
        if model.is_refused() {
            let reason = model.refusal_message();
            return Err(PaymentError::Refused {
                uid: model.uid,
                reason,
            });
        }
        if let Some(action) = model.action {
            return Ok(PaymentOutcome::Redirect {
                uid: model.uid,
                action,
            });
        }
        let uid = model.uid.ok_or(PaymentError::MissingTransaction)?;
        match model.status {
            Some(status) if StatusFilter::is_final(status) => {
                Ok(PaymentOutcome::Finished { uid, status })
            }
            _ => Ok(PaymentOutcome::Pending { uid }),
        }
    }
}

/// Submits payments on behalf of the default wallet.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    wallet: Arc<dyn WalletResolver>,
    partners: Arc<dyn PartnerAddressService>,
    provider: Arc<dyn PaymentProvider>,
}

impl PaymentOrchestrator {
    pub fn new(
        wallet: Arc<dyn WalletResolver>,
        partners: Arc<dyn PartnerAddressService>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            wallet,
            partners,
            provider,
        }
    }

    async fn wallet(&self) -> Result<Wallet, PaymentError> {
        self.wallet
            .find_default()
            .await
            .map_err(PaymentError::Identity)
    }

    /// Pay for an app purchase, routing revenue to the store and OEM
    /// partners of `order.package_name`.
    pub async fn submit(&self, order: &PaymentOrder) -> Result<PaymentOutcome, PaymentError> {
        let wallet = self.wallet().await?;

        let package = order.package_name.as_str();
        let (store, oem) = tokio::try_join!(
            async {
                self.partners
                    .store_address(package)
                    .await
                    .map_err(|source| PaymentError::RoutingAddress {
                        role: PartnerRole::Store,
                        source,
                    })
            },
            async {
                self.partners
                    .oem_address(package)
                    .await
                    .map_err(|source| PaymentError::RoutingAddress {
                        role: PartnerRole::Oem,
                        source,
                    })
            },
        )?;

        self.send(order, &wallet, Some((store, oem))).await
    }

    /// Top up the default wallet. Top-ups carry no routing addresses.
    pub async fn submit_top_up(
        &self,
        order: &PaymentOrder,
    ) -> Result<PaymentOutcome, PaymentError> {
        let wallet = self.wallet().await?;
        self.send(order, &wallet, None).await
    }

    /// Complete a redirect or 3DS challenge with the details the provider
    /// returned to the return url.
    pub async fn submit_redirect(
        &self,
        uid: &str,
        details: &serde_json::Value,
        payment_data: Option<&str>,
    ) -> Result<PaymentOutcome, PaymentError> {
        let wallet = self.wallet().await?;
        let model = self
            .provider
            .submit_redirect(uid, &wallet.address, details, payment_data)
            .await
            .map_err(PaymentError::Submission)?;
        PaymentOutcome::from_model(model)
    }

    /// Provider configuration for paying `value` `currency` with `method`.
    pub async fn load_payment_info(
        &self,
        method: &str,
        value: &str,
        currency: &str,
    ) -> Result<PaymentInfoModel, PaymentError> {
        let wallet = self.wallet().await?;
        self.provider
            .payment_info(method, value, currency, &wallet.address)
            .await
            .map_err(PaymentError::Submission)
    }

    /// Forget the payment instruments stored for the default wallet.
    pub async fn disable_payments(&self) -> Result<(), PaymentError> {
        let wallet = self.wallet().await?;
        self.provider
            .disable_payments(&wallet.address)
            .await
            .map_err(PaymentError::Submission)
    }

    async fn send(
        &self,
        order: &PaymentOrder,
        wallet: &Wallet,
        routing: Option<(String, String)>,
    ) -> Result<PaymentOutcome, PaymentError> {
        let request = order.request(wallet, routing);
        let model = self.provider.make_payment(&request).await.map_err(|e| {
            warn!(method = %order.method, error = %e, "Payment submission failed");
            PaymentError::Submission(e)
        })?;
        let outcome = PaymentOutcome::from_model(model)?;
        info!(
            method = %order.method,
            value = %order.value,
            currency = %order.currency,
            outcome = ?outcome,
            "Payment submitted"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl TransactionSource for PaymentOrchestrator {
    async fn transaction(&self, uid: &str) -> Result<TransactionResponse, ServiceError> {
        let wallet = self.wallet.find_default().await?;
        self.provider.get_transaction(uid, &wallet.address).await
    }
}
