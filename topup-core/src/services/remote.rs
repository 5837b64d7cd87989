//! Service implementations backed by the SDK HTTP clients.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use topup_sdk::client::{BrokerClient, GamificationClient, PartnerClient, PaymentClient};
use topup_sdk::objects::{
    ConversionResponseBody, ForecastBonus, PaymentInfoModel, PaymentMethodData, PaymentModel,
    PaymentRequest, TopUpLimits, TransactionResponse,
};

use super::{
    BonusService, ConversionApi, PartnerAddressService, PaymentProvider, ServiceError,
    TopUpLimitsService, WalletResolver,
};

#[async_trait]
impl ConversionApi for BrokerClient {
    async fn convert(
        &self,
        currency: &str,
        value: &str,
        target: Option<&str>,
    ) -> Result<ConversionResponseBody, ServiceError> {
        Ok(BrokerClient::convert(self, currency, value, target).await?)
    }
}

#[async_trait]
impl PartnerAddressService for PartnerClient {
    async fn store_address(&self, package_name: &str) -> Result<String, ServiceError> {
        Ok(PartnerClient::store_address(self, package_name).await?)
    }

    async fn oem_address(&self, package_name: &str) -> Result<String, ServiceError> {
        Ok(PartnerClient::oem_address(self, package_name).await?)
    }
}

#[async_trait]
impl PaymentProvider for PaymentClient {
    async fn payment_methods(&self) -> Result<Vec<PaymentMethodData>, ServiceError> {
        Ok(PaymentClient::payment_methods(self).await?)
    }

    async fn payment_info(
        &self,
        method: &str,
        value: &str,
        currency: &str,
        wallet_address: &str,
    ) -> Result<PaymentInfoModel, ServiceError> {
        Ok(PaymentClient::payment_info(self, method, value, currency, wallet_address).await?)
    }

    async fn make_payment(&self, request: &PaymentRequest) -> Result<PaymentModel, ServiceError> {
        Ok(PaymentClient::make_payment(self, request).await?)
    }

    async fn get_transaction(
        &self,
        uid: &str,
        wallet_address: &str,
    ) -> Result<TransactionResponse, ServiceError> {
        Ok(PaymentClient::get_transaction(self, uid, wallet_address).await?)
    }

    async fn submit_redirect(
        &self,
        uid: &str,
        wallet_address: &str,
        details: &serde_json::Value,
        payment_data: Option<&str>,
    ) -> Result<PaymentModel, ServiceError> {
        Ok(
            PaymentClient::submit_redirect(self, uid, wallet_address, details, payment_data)
                .await?,
        )
    }

    async fn disable_payments(&self, wallet_address: &str) -> Result<(), ServiceError> {
        Ok(PaymentClient::disable_payments(self, wallet_address).await?)
    }
}

#[async_trait]
impl TopUpLimitsService for PaymentClient {
    async fn limits(&self, currency: &str) -> Result<TopUpLimits, ServiceError> {
        Ok(self.top_up_limits(currency).await?)
    }
}

/// Bonus forecasts for the default wallet.
pub struct RemoteBonusService {
    client: GamificationClient,
    wallet: Arc<dyn WalletResolver>,
}

impl RemoteBonusService {
    pub fn new(client: GamificationClient, wallet: Arc<dyn WalletResolver>) -> Self {
        Self { client, wallet }
    }
}

#[async_trait]
impl BonusService for RemoteBonusService {
    async fn forecast(
        &self,
        package_name: &str,
        appc_amount: Decimal,
    ) -> Result<ForecastBonus, ServiceError> {
        let wallet = self.wallet.find_default().await?;
        Ok(self
            .client
            .forecast_bonus(&wallet.address, package_name, appc_amount)
            .await?)
    }
}
