use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Currency conversion rate capability consumed by the financial calculator.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn rate(&self, from_currency: &str, to_currency: &str) -> Result<Decimal, RateError>;
}

/// Client for an HTTP exchange-rate service.
pub struct HttpRateClient {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, Decimal>,
}

impl HttpRateClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RateProvider for HttpRateClient {
    async fn rate(&self, from_currency: &str, to_currency: &str) -> Result<Decimal, RateError> {
        let url = format!(
            "{}/latest?base={}&symbols={}",
            self.base_url, from_currency, to_currency
        );

        let response = self.http.get(&url).send().await.map_err(RateError::Http)?;
        if !response.status().is_success() {
            return Err(RateError::Api(format!(
                "rate service returned {}",
                response.status()
            )));
        }

        let body: RatesResponse = response.json().await.map_err(RateError::Http)?;
        body.rates
            .get(to_currency)
            .copied()
            .ok_or_else(|| RateError::MissingRate {
                from: from_currency.to_string(),
                to: to_currency.to_string(),
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate service error: {0}")]
    Api(String),

    #[error("no conversion rate for {from} -> {to}")]
    MissingRate { from: String, to: String },
}
