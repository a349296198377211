//! HTTP client for the fee-estimate endpoint.

use crate::error::{ProviderError, Result};
use crate::provider::FeeProvider;
use async_trait::async_trait;
use flipscope_core::{FeeComponent, FeeEstimate, MarketplaceCode};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const ENDPOINT_NAME: &str = "fees";

/// Reqwest-backed client for the fee-estimate endpoint.
pub struct HttpFeeProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpFeeProvider {
    /// Create a new fee-estimate client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl FeeProvider for HttpFeeProvider {
    async fn fee_estimate(
        &self,
        identifier: &str,
        home_price: Decimal,
        home_marketplace: &MarketplaceCode,
    ) -> Result<FeeEstimate> {
        if home_price <= Decimal::ZERO {
            return Err(ProviderError::InvalidRequest(format!(
                "home price must be positive, got {home_price}"
            )));
        }

        let request = FeeRequestDto {
            identifier,
            marketplace: home_marketplace.as_str(),
            price: home_price,
        };

        tracing::debug!(%identifier, price = %home_price, "Fetching fee estimate");

        let response = self
            .client
            .post(format!("{}/fees/estimate", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Throttled {
                endpoint: ENDPOINT_NAME.to_string(),
                message,
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication {
                endpoint: ENDPOINT_NAME.to_string(),
                message,
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api {
                endpoint: ENDPOINT_NAME.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let body: FeeResponseDto = response.json().await.map_err(|e| ProviderError::Parse {
            endpoint: ENDPOINT_NAME.to_string(),
            message: format!("failed to parse response: {e}"),
        })?;

        Ok(FeeEstimate {
            total: body.total,
            referral: body.referral,
            components: body
                .components
                .into_iter()
                .map(|c| FeeComponent {
                    name: c.name,
                    amount: c.amount,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeeRequestDto<'a> {
    identifier: &'a str,
    marketplace: &'a str,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeResponseDto {
    total: Decimal,
    referral: Decimal,
    #[serde(default)]
    components: Vec<FeeComponentDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeComponentDto {
    name: String,
    amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_fee_response() {
        let json = r#"{
            "total": "20.00",
            "referral": "15.00",
            "components": [
                {"name": "referral", "amount": "15.00"},
                {"name": "closing", "amount": "5.00"}
            ]
        }"#;

        let body: FeeResponseDto = serde_json::from_str(json).expect("parse response");
        assert_eq!(body.total, dec!(20.00));
        assert_eq!(body.referral, dec!(15.00));
        assert_eq!(body.components.len(), 2);
        assert_eq!(body.components[1].name, "closing");
    }

    #[test]
    fn test_parse_fee_response_without_components() {
        let json = r#"{"total": 3.4, "referral": 3.4}"#;
        let body: FeeResponseDto = serde_json::from_str(json).expect("parse response");
        assert!(body.components.is_empty());
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let provider = HttpFeeProvider::new("http://localhost:9", "key", 5).expect("build client");
        let us = MarketplaceCode::new("US").expect("valid code");

        let result = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build runtime")
            .block_on(provider.fee_estimate("B000TEST01", dec!(0), &us));

        assert!(matches!(result, Err(ProviderError::InvalidRequest(_))));
    }
}
