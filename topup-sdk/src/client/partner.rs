//! Partner address client (store and OEM revenue-share wallets).

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::partner::{PartnerAddress, PartnerRole};

/// Typed HTTP client for the partner **roles** API.
#[derive(Debug, Clone)]
pub struct PartnerClient {
    http: Client,
    base_url: Url,
}

impl PartnerClient {
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

    /// `GET /roles/{version}/partners/{role}?package=` – wallet address of
    /// the partner that distributed `package_name`.
    pub async fn address(
        &self,
        role: PartnerRole,
        package_name: &str,
    ) -> Result<String, ClientError> {
        let url = self
            .base_url
            .join(&format!("/roles/8.20180518/partners/{role}"))?;

        let resp = self
            .http
            .get(url)
            .query(&[("package", package_name)])
            .send()
            .await?;

        let partner: PartnerAddress = parse_response(resp).await?;
        Ok(partner.address)
    }

    pub async fn store_address(&self, package_name: &str) -> Result<String, ClientError> {
        self.address(PartnerRole::Store, package_name).await
    }

    pub async fn oem_address(&self, package_name: &str) -> Result<String, ClientError> {
        self.address(PartnerRole::Oem, package_name).await
    }
}
