//! Payment provider client (card and wallet rails).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ClientError, ensure_success, parse_response};
use crate::objects::conversion::TopUpLimits;
use crate::objects::payment::{
    PaymentInfoModel, PaymentMethodData, PaymentModel, PaymentRequest, TransactionResponse,
};

const GATEWAY_PATH: &str = "/broker/8.20200815/gateways/adyen_v2";
const METHODS_PATH: &str = "/broker/8.20200815/methods";
const TOP_UP_VALUES_PATH: &str = "/product/8.20200701/topup/billing/values";

#[derive(Debug, Deserialize)]
struct ItemsEnvelope<T> {
    items: Vec<T>,
}

#[derive(Debug, Serialize)]
struct RedirectDetails<'a> {
    details: &'a serde_json::Value,
    payment_data: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DisableRecurring<'a> {
    wallet_address: &'a str,
}

/// Typed HTTP client for the **payment provider** gateway.
///
/// The provider itself is opaque: requests carry a method payload produced
/// by the provider's client-side components, and responses carry a status
/// plus optional redirect data.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    http: Client,
    base_url: Url,
}

impl PaymentClient {
    /// Create a new `PaymentClient` rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /broker/{version}/methods` – fiat payment methods available for
    /// a top-up.
    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethodData>, ClientError> {
        let url = self.base_url.join(METHODS_PATH)?;

        let resp = self
            .http
            .get(url)
            .query(&[("currency.type", "fiat"), ("transaction.type", "TOPUP")])
            .send()
            .await?;

        let envelope: ItemsEnvelope<PaymentMethodData> = parse_response(resp).await?;
        Ok(envelope.items)
    }

    /// `GET {gateway}/payment-methods` – provider configuration for paying
    /// `value` with `method`.
    pub async fn payment_info(
        &self,
        method: &str,
        value: &str,
        currency: &str,
        wallet_address: &str,
    ) -> Result<PaymentInfoModel, ClientError> {
        let url = self
            .base_url
            .join(&format!("{GATEWAY_PATH}/payment-methods"))?;

        let resp = self
            .http
            .get(url)
            .query(&[
                ("price.value", value),
                ("price.currency", currency),
                ("method", method),
                ("wallet.address", wallet_address),
            ])
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST {gateway}/transactions` – submit a payment.
    pub async fn make_payment(&self, request: &PaymentRequest) -> Result<PaymentModel, ClientError> {
        let url = self.base_url.join(&format!("{GATEWAY_PATH}/transactions"))?;

        let resp = self.http.post(url).json(request).send().await?;

        parse_response(resp).await
    }

    /// `GET {gateway}/transactions/{uid}` – current status of a transaction.
    pub async fn get_transaction(
        &self,
        uid: &str,
        wallet_address: &str,
    ) -> Result<TransactionResponse, ClientError> {
        let url = self.base_url.join(&format!(
            "{GATEWAY_PATH}/transactions/{}",
            urlencoding::encode(uid)
        ))?;

        let resp = self
            .http
            .get(url)
            .query(&[("wallet.address", wallet_address)])
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `PATCH {gateway}/transactions/{uid}` – complete a redirect or 3DS
    /// challenge with the details returned to the return url.
    pub async fn submit_redirect(
        &self,
        uid: &str,
        wallet_address: &str,
        details: &serde_json::Value,
        payment_data: Option<&str>,
    ) -> Result<PaymentModel, ClientError> {
        let url = self.base_url.join(&format!(
            "{GATEWAY_PATH}/transactions/{}",
            urlencoding::encode(uid)
        ))?;

        let resp = self
            .http
            .patch(url)
            .query(&[("wallet.address", wallet_address)])
            .json(&RedirectDetails {
                details,
                payment_data,
            })
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST {gateway}/disable-recurring` – forget stored instruments of a
    /// wallet.
    pub async fn disable_payments(&self, wallet_address: &str) -> Result<(), ClientError> {
        let url = self
            .base_url
            .join(&format!("{GATEWAY_PATH}/disable-recurring"))?;

        let resp = self
            .http
            .post(url)
            .json(&DisableRecurring { wallet_address })
            .send()
            .await?;

        ensure_success(resp).await
    }

    /// `GET /product/{version}/topup/billing/values` – minimum and maximum
    /// top-up amounts expressed in `currency`.
    pub async fn top_up_limits(&self, currency: &str) -> Result<TopUpLimits, ClientError> {
        let url = self.base_url.join(TOP_UP_VALUES_PATH)?;

        let resp = self
            .http
            .get(url)
            .query(&[("currency", currency)])
            .send()
            .await?;

        parse_response(resp).await
    }
}
