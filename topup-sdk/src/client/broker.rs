//! Exchange broker client (token and fiat conversion rates).

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::conversion::ConversionResponseBody;

/// API version segment of the exchange endpoints.
pub const BROKER_VERSION: &str = "8.20180518";

/// Typed HTTP client for the exchange **broker**.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: Client,
    base_url: Url,
}

impl BrokerClient {
    /// Create a new `BrokerClient` rooted at `base_url`.
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

    /// `GET /broker/{version}/exchanges/{currency}/convert/{value}[?to=TARGET]`
    ///
    /// Without a target the broker converts into the local fiat currency of
    /// the caller, as determined by the backend.
    pub async fn convert(
        &self,
        currency: &str,
        value: &str,
        target: Option<&str>,
    ) -> Result<ConversionResponseBody, ClientError> {
        let url = self.base_url.join(&format!(
            "/broker/{BROKER_VERSION}/exchanges/{}/convert/{}",
            urlencoding::encode(currency),
            urlencoding::encode(value),
        ))?;

        let mut request = self.http.get(url);
        if let Some(target) = target {
            request = request.query(&[("to", target)]);
        }

        let resp = request.send().await?;
        parse_response(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_convert_to_target_currency() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/broker/8.20180518/exchanges/EUR/convert/12.5"))
            .and(query_param("to", "APPC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "appcValue": 251.337,
                "currency": "APPC",
                "symbol": ""
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = BrokerClient::new(Url::parse(&mock_server.uri()).unwrap());
        let body = client.convert("EUR", "12.5", Some("APPC")).await.unwrap();

        assert_eq!(body.appc_value, Decimal::from_str("251.337").unwrap());
        assert_eq!(body.currency, "APPC");
    }

    #[tokio::test]
    async fn test_convert_without_target_has_no_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/broker/8.20180518/exchanges/APPC/convert/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "appcValue": 0.0421,
                "currency": "EUR",
                "symbol": "€"
            })))
            .mount(&mock_server)
            .await;

        let client = BrokerClient::new(Url::parse(&mock_server.uri()).unwrap());
        let body = client.convert("APPC", "1.0", None).await.unwrap();

        assert_eq!(body.symbol, "€");
        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.query().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock_server)
            .await;

        let client = BrokerClient::new(Url::parse(&mock_server.uri()).unwrap());
        let err = client.convert("APPC", "1.0", None).await.unwrap_err();

        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
