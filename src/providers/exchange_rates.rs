use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::core::config::RatesConfig;
use crate::core::currency::{ExchangeRateSnapshot, RateSource};
use crate::providers::util::with_retry;

/// Fetches the latest rates for a pivot currency from a JSON endpoint
/// shaped as `{ "base": "USD", "rates": { "EUR": 0.9, ... }, "timestamp": 1700000000 }`.
pub struct HttpRateSource {
    base_url: String,
    pivot: String,
    retries: usize,
    retry_delay_ms: u64,
    client: reqwest::Client,
}

impl HttpRateSource {
    pub fn new(base_url: &str, pivot: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("convkit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpRateSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            pivot: pivot.to_uppercase(),
            retries: 0,
            retry_delay_ms: 0,
            client,
        })
    }

    pub fn from_config(config: &RatesConfig) -> Result<Self> {
        Ok(Self::new(&config.base_url, &config.pivot)?
            .with_retries(config.retries, config.retry_delay_ms))
    }

    pub fn with_retries(mut self, retries: usize, retry_delay_ms: u64) -> Self {
        self.retries = retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url, self.pivot)
    }
}

#[derive(Debug, Deserialize)]
struct RatesPayload {
    base: String,
    rates: BTreeMap<String, Option<f64>>,
    #[serde(default, alias = "time_last_updated")]
    timestamp: Option<i64>,
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    #[instrument(name = "RatesFetch", skip(self), fields(pivot = %self.pivot))]
    async fn fetch_snapshot(&self) -> Result<ExchangeRateSnapshot> {
        let url = self.url();
        debug!("Requesting exchange rates from {}", url);

        let response = with_retry(
            || {
                let request = self.client.get(&url);
                async move { request.send().await?.error_for_status() }
            },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for rates URL: {}", e, url))?;

        let text = response.text().await?;

        let payload: RatesPayload = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse rates payload from {}: {}", url, e))?;

        let published_at = payload
            .timestamp
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());
        let rates = payload
            .rates
            .into_iter()
            .filter_map(|(code, rate)| rate.map(|rate| (code, rate)));

        let snapshot = ExchangeRateSnapshot::new(&payload.base, rates, Utc::now(), &url)?
            .with_published_at(published_at);
        debug!(
            pivot = snapshot.pivot(),
            currencies = snapshot.rates().len(),
            "Received exchange rates"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(pivot: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/{pivot}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_response = r#"{
            "base": "USD",
            "timestamp": 1700000000,
            "rates": {
                "USD": 1,
                "EUR": 0.92,
                "INR": 83.2,
                "GBP": 0.79
            }
        }"#;

        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;
        let source = HttpRateSource::new(&mock_server.uri(), "usd").unwrap();

        let snapshot = source.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.pivot(), "USD");
        assert_eq!(snapshot.rate("EUR"), Some(0.92));
        assert_eq!(snapshot.rate("INR"), Some(83.2));
        assert_eq!(snapshot.rates().len(), 4);
        assert_eq!(
            snapshot.published_at().map(|t| t.timestamp()),
            Some(1700000000)
        );
        assert_eq!(snapshot.provenance(), format!("{}/USD", mock_server.uri()));
    }

    #[tokio::test]
    async fn test_alternate_timestamp_field_and_null_rates() {
        let mock_response = r#"{
            "base": "EUR",
            "time_last_updated": 1700000000,
            "rates": { "USD": 1.08, "XAU": null, "ZZZ": -2 }
        }"#;

        let mock_server =
            create_mock_server("EUR", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;
        let source = HttpRateSource::new(&mock_server.uri(), "EUR").unwrap();

        let snapshot = source.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.rate("USD"), Some(1.08));
        assert_eq!(snapshot.rate("EUR"), Some(1.0));
        assert!(snapshot.rate("XAU").is_none());
        assert!(snapshot.rate("ZZZ").is_none());
        assert!(snapshot.published_at().is_some());
    }

    #[tokio::test]
    async fn test_missing_timestamp_is_allowed() {
        let mock_response = r#"{"base": "USD", "rates": {"EUR": 0.9}}"#;
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;
        let source = HttpRateSource::new(&mock_server.uri(), "USD").unwrap();

        let snapshot = source.fetch_snapshot().await.unwrap();
        assert!(snapshot.published_at().is_none());
    }

    #[tokio::test]
    async fn test_rates_api_error_response() {
        let mock_server = create_mock_server("USD", ResponseTemplate::new(500)).await;
        let source = HttpRateSource::new(&mock_server.uri(), "USD")
            .unwrap()
            .with_retries(1, 1);

        let result = source.fetch_snapshot().await;
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Request error"), "{message}");
        assert!(message.contains("500"), "{message}");

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
    }

    #[tokio::test]
    async fn test_rates_api_malformed_response() {
        let mock_response = r#"{"base": "USD", "quotes": {"EUR": 0.9}}"#; // "quotes" instead of "rates"
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;
        let source = HttpRateSource::new(&mock_server.uri(), "USD").unwrap();

        let result = source.fetch_snapshot().await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse rates payload")
        );
    }

    #[tokio::test]
    async fn test_rates_api_empty_rates() {
        let mock_response = r#"{"base": "USD", "rates": {}}"#;
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;
        let source = HttpRateSource::new(&mock_server.uri(), "USD").unwrap();

        let result = source.fetch_snapshot().await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("has no usable rates")
        );
    }

    #[test]
    fn test_from_config() {
        let config = RatesConfig {
            base_url: "http://example.com/latest/".to_string(),
            pivot: "eur".to_string(),
            ..RatesConfig::default()
        };
        let source = HttpRateSource::from_config(&config).unwrap();
        assert_eq!(source.url(), "http://example.com/latest/EUR");
        assert_eq!(source.retries, 2);
    }
}
