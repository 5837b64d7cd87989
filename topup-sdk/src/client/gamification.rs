//! Gamification client (bonus forecasts).

use reqwest::Client;
use rust_decimal::Decimal;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::bonus::ForecastBonus;

/// Typed HTTP client for the **gamification** API.
#[derive(Debug, Clone)]
pub struct GamificationClient {
    http: Client,
    base_url: Url,
}

impl GamificationClient {
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

    /// `GET /gamification/bonus_forecast` – bonus earned by `wallet_address`
    /// when spending `amount` APPC in `package_name`.
    pub async fn forecast_bonus(
        &self,
        wallet_address: &str,
        package_name: &str,
        amount: Decimal,
    ) -> Result<ForecastBonus, ClientError> {
        let url = self.base_url.join("/gamification/bonus_forecast")?;
        let amount = amount.to_string();

        let resp = self
            .http
            .get(url)
            .query(&[
                ("address", wallet_address),
                ("package_name", package_name),
                ("amount", amount.as_str()),
                ("currency", "APPC"),
            ])
            .send()
            .await?;

        parse_response(resp).await
    }
}
