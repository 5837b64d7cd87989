//! Payment provider request and response types.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A payment method offered by the backend for a top-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodData {
    /// Stable identifier of the rail, e.g. `credit_card` or `paypal`.
    pub id: CompactString,
    pub label: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    #[serde(default)]
    pub max_amount: Option<Decimal>,
}

/// Status of a transaction as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    PendingUserPayment,
    PendingServiceAuthorization,
    Processing,
    Completed,
    Failed,
    Canceled,
    InvalidTransaction,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::PendingUserPayment => "pending_user_payment",
            TransactionStatus::PendingServiceAuthorization => "pending_service_authorization",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Canceled => "canceled",
            TransactionStatus::InvalidTransaction => "invalid_transaction",
            TransactionStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Body of a payment submission.
///
/// Built once all dependent values (wallet, partner addresses) are known and
/// never mutated after it is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Provider specific payment method payload (card data, paypal token, ...).
    pub payment: serde_json::Value,
    pub return_url: String,
    pub price_value: Decimal,
    pub price_currency: CompactString,
    pub reference: Option<String>,
    pub method: String,
    pub wallet_address: String,
    pub origin: Option<String>,
    pub domain: String,
    pub metadata: Option<String>,
    pub sku: Option<String>,
    pub callback_url: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub developer_wallet: Option<String>,
    pub store_wallet: Option<String>,
    pub oem_wallet: Option<String>,
    pub user_wallet: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "redirect")]
    Redirect,
    #[serde(rename = "threeDS2")]
    ThreeDs2,
    #[serde(other)]
    Other,
}

/// Additional step the user has to go through before the payment settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub payment_data: Option<String>,
}

/// Provider answer to a payment submission or redirect completion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentModel {
    pub uid: Option<String>,
    pub status: Option<TransactionStatus>,
    pub result_code: Option<String>,
    pub action: Option<PaymentAction>,
    pub refusal_reason: Option<String>,
    pub refusal_code: Option<i32>,
    pub error: Option<String>,
    pub hash: Option<String>,
    pub order_reference: Option<String>,
}

impl PaymentModel {
    /// Whether the provider rejected the payment outright.
    pub fn is_refused(&self) -> bool {
        self.error.is_some()
            || self.refusal_reason.is_some()
            || self
                .result_code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case("refused"))
    }

    /// The reason reported by the provider for a refused payment.
    pub fn refusal_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.refusal_reason.clone())
            .or_else(|| self.result_code.clone())
            .unwrap_or_else(|| "unknown refusal".to_string())
    }
}

/// Response of the transaction status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub uid: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub order_reference: Option<String>,
}

/// Provider configuration for paying with a given method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInfoModel {
    /// Provider payment-methods payload, passed through to the payment form.
    pub payment_methods: serde_json::Value,
    pub price_value: Decimal,
    pub price_currency: CompactString,
    /// Whether the user already has a stored instrument for this method.
    #[serde(default)]
    pub is_stored: bool,
}
