//! HTTP client for the batch pricing endpoint.

use crate::error::{ProviderError, Result};
use crate::provider::PricingProvider;
use async_trait::async_trait;
use flipscope_core::{MarketplaceCode, PriceObservation};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const ENDPOINT_NAME: &str = "pricing";

/// Reqwest-backed client for the pricing endpoint.
pub struct HttpPricingProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpPricingProvider {
    /// Create a new pricing client.
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

    /// Map one response item into a domain observation.
    fn to_observation(item: PricedItemDto, marketplace: &MarketplaceCode) -> PriceObservation {
        PriceObservation {
            identifier: item.identifier,
            marketplace: marketplace.clone(),
            amount: item.listing_price,
            currency: item.currency,
            offer_count: item.offer_count,
            sales_rank: item.sales_rank,
            buy_box: item.buy_box,
        }
    }
}

#[async_trait]
impl PricingProvider for HttpPricingProvider {
    async fn prices(
        &self,
        identifiers: &[String],
        marketplace: &MarketplaceCode,
    ) -> Result<Vec<PriceObservation>> {
        if identifiers.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "identifier list must not be empty".to_string(),
            ));
        }

        let request = PricingRequestDto {
            marketplace: marketplace.as_str(),
            identifiers,
        };

        tracing::debug!(
            marketplace = %marketplace,
            count = identifiers.len(),
            "Fetching batch prices"
        );

        let response = self
            .client
            .post(format!("{}/prices", self.base_url))
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

        let body: PricingResponseDto =
            response.json().await.map_err(|e| ProviderError::Parse {
                endpoint: ENDPOINT_NAME.to_string(),
                message: format!("failed to parse response: {e}"),
            })?;

        Ok(body
            .items
            .into_iter()
            .map(|item| Self::to_observation(item, marketplace))
            .collect())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PricingRequestDto<'a> {
    marketplace: &'a str,
    identifiers: &'a [String],
}

#[derive(Debug, Deserialize)]
struct PricingResponseDto {
    items: Vec<PricedItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricedItemDto {
    identifier: String,
    listing_price: Decimal,
    currency: String,
    #[serde(default)]
    offer_count: u32,
    #[serde(default)]
    sales_rank: Option<u64>,
    #[serde(default)]
    buy_box: bool,
}
