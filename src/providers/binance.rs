use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::price::{HistorySource, PricePoint, normalize_closes};
use crate::providers::util::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, with_retry};

/// Daily candles requested per fetch, roughly 2.7 years.
const KLINE_LIMIT: u32 = 1000;

/// Crypto daily closes from the Binance public klines endpoint.
pub struct BinanceSource {
    base_url: String,
    client: reqwest::Client,
}

impl BinanceSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("dcasim/1.0")
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(BinanceSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

/// Extracts `(open time, close)` from `[openTime, open, high, low, close, volume, ...]` rows.
fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<(i64, f64)>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let timestamp = row
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| anyhow!("Missing open time in kline {i}"))?;
            let close = match row.get(4) {
                Some(Value::String(s)) => s
                    .parse::<f64>()
                    .with_context(|| format!("Invalid close price '{s}' in kline {i}"))?,
                Some(Value::Number(n)) => n
                    .as_f64()
                    .ok_or_else(|| anyhow!("Invalid close price in kline {i}"))?,
                _ => return Err(anyhow!("Missing close price in kline {i}")),
            };
            Ok((timestamp, close))
        })
        .collect()
}

#[async_trait]
impl HistorySource for BinanceSource {
    #[instrument(name = "BinanceHistoryFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_closes(&self, symbol: &str) -> Result<Vec<PricePoint>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval=1d&limit={}",
            self.base_url, symbol, KLINE_LIMIT
        );
        debug!("Requesting klines from {}", url);

        let response = with_retry(
            || self.client.get(&url).send(),
            DEFAULT_RETRIES,
            DEFAULT_RETRY_DELAY,
        )
        .await
        .with_context(|| format!("Request error for symbol: {symbol} URL: {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let rows: Vec<Vec<Value>> = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse klines response for {}: {}", symbol, e))?;

        let points = normalize_closes(parse_klines(&rows)?);
        debug!(count = points.len(), "Parsed Binance klines");
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .and(query_param("symbol", "BTCUSDT"))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_successful_kline_fetch() {
        let body = r#"[
            [1704153600000, "42000.0", "43000.0", "41000.0", "42500.5", "1000.0", 1704239999999],
            [1704067200000, "41000.0", "42500.0", "40500.0", "42000.25", "900.0", 1704153599999]
        ]"#;
        let mock_server = create_mock_server(200, body).await;

        let source = BinanceSource::new(&mock_server.uri()).unwrap();
        let points = source.fetch_closes("BTCUSDT").await.unwrap();

        assert_eq!(
            points,
            vec![
                PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 42000.25),
                PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 42500.5),
            ]
        );
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mock_server = create_mock_server(429, r#"{"code":-1003}"#).await;

        let source = BinanceSource::new(&mock_server.uri()).unwrap();
        let result = source.fetch_closes("BTCUSDT").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 429 Too Many Requests for symbol: BTCUSDT"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server(200, r#"{"klines": []}"#).await;

        let source = BinanceSource::new(&mock_server.uri()).unwrap();
        let result = source.fetch_closes("BTCUSDT").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse klines response for BTCUSDT")
        );
    }

    #[test]
    fn test_parse_klines_rejects_missing_close() {
        let rows: Vec<Vec<Value>> = serde_json::from_str(r#"[[1704067200000, "1.0"]]"#).unwrap();
        assert!(parse_klines(&rows).is_err());
    }

    #[test]
    fn test_parse_klines_accepts_numeric_close() {
        let rows: Vec<Vec<Value>> =
            serde_json::from_str(r#"[[1704067200000, 1, 2, 0.5, 1.5, 10]]"#).unwrap();
        assert_eq!(parse_klines(&rows).unwrap(), vec![(1704067200000, 1.5)]);
    }
}
