use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::price::{HistorySource, PricePoint, normalize_closes};
use crate::providers::util::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, with_retry};

/// Daily history and symbol search through the Yahoo Finance relay.
///
/// `base_url` points at the relay's mount point, so requests go to
/// `{base_url}/history` and `{base_url}/search`.
pub struct YahooRelaySource {
    base_url: String,
    history_years: u32,
    client: reqwest::Client,
}

/// A symbol match returned by [`YahooRelaySource::search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSuggestion {
    pub symbol: String,
    pub exchange: String,
    pub longname: String,
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct YahooSearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Deserialize, Debug)]
struct SearchQuote {
    symbol: Option<String>,
    exchange: Option<String>,
    longname: Option<String>,
    shortname: Option<String>,
}

impl YahooRelaySource {
    pub fn new(base_url: &str, history_years: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("dcasim/1.0")
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(YahooRelaySource {
            base_url: base_url.trim_end_matches('/').to_string(),
            history_years,
            client,
        })
    }

    async fn get_text(&self, url: Url, what: &str) -> Result<String> {
        debug!("Requesting {} from {}", what, url);
        let response = with_retry(
            || self.client.get(url.clone()).send(),
            DEFAULT_RETRIES,
            DEFAULT_RETRY_DELAY,
        )
        .await
        .with_context(|| format!("Request error for {what} URL: {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for {}", response.status(), what));
        }
        Ok(response.text().await?)
    }

    /// Finds symbols matching a free-text query.
    #[instrument(name = "YahooSymbolSearch", skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SymbolSuggestion>> {
        let url = Url::parse_with_params(&format!("{}/search", self.base_url), &[("q", query)])?;
        let text = self.get_text(url, &format!("search '{query}'")).await?;

        let data: YahooSearchResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse search response for '{}': {}", query, e))?;

        Ok(data
            .quotes
            .into_iter()
            .filter_map(|q| {
                let symbol = q.symbol?;
                Some(SymbolSuggestion {
                    longname: q.longname.or(q.shortname).unwrap_or_else(|| symbol.clone()),
                    exchange: q.exchange.unwrap_or_default(),
                    symbol,
                })
            })
            .collect())
    }
}

fn chart_closes(data: YahooChartResponse, symbol: &str) -> Result<Vec<(i64, f64)>> {
    let item = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

    let timestamps = item.timestamp.unwrap_or_default();
    let closes = item
        .indicators
        .and_then(|inds| inds.quote.into_iter().next())
        .and_then(|q| q.close)
        .unwrap_or_default();

    // timestamps too large to express in milliseconds are dropped
    Ok(timestamps
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| Some((ts.checked_mul(1000)?, close?)))
        .collect())
}

#[async_trait]
impl HistorySource for YahooRelaySource {
    #[instrument(name = "YahooHistoryFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_closes(&self, symbol: &str) -> Result<Vec<PricePoint>> {
        let now = Utc::now();
        let period_start = now - ChronoDuration::days(365 * i64::from(self.history_years));
        let url = Url::parse_with_params(
            &format!("{}/history", self.base_url),
            &[
                ("symbol", symbol.to_string()),
                ("period1", period_start.timestamp().to_string()),
                ("period2", now.timestamp().to_string()),
            ],
        )?;

        let text = self.get_text(url, &format!("symbol: {symbol}")).await?;
        let data: YahooChartResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse chart response for {}: {}", symbol, e))?;

        let points = normalize_closes(chart_closes(data, symbol)?);
        debug!(count = points.len(), "Parsed Yahoo chart history");
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_history_server(symbol: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/yahoo/history"))
            .and(query_param("symbol", symbol))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn relay_url(server: &MockServer) -> String {
        format!("{}/api/yahoo", server.uri())
    }

    #[tokio::test]
    async fn test_successful_history_fetch() {
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {"currency": "USD", "symbol": "GC=F"},
                    "timestamp": [1704205800, 1704292200, 1704378600],
                    "indicators": {"quote": [{"close": [2064.4, null, 2042.3]}]}
                }],
                "error": null
            }
        }"#;
        let mock_server = create_history_server("GC=F", 200, body).await;

        let source = YahooRelaySource::new(&relay_url(&mock_server), 10).unwrap();
        let points = source.fetch_closes("GC=F").await.unwrap();

        assert_eq!(
            points,
            vec![
                PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 2064.4),
                PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(), 2042.3),
            ]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_timestamps_are_skipped() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [9300000000000000, 1704205800],
                    "indicators": {"quote": [{"close": [1.0, 2064.4]}]}
                }],
                "error": null
            }
        }"#;
        let mock_server = create_history_server("X", 200, body).await;

        let source = YahooRelaySource::new(&relay_url(&mock_server), 10).unwrap();
        let points = source.fetch_closes("X").await.unwrap();

        assert_eq!(
            points,
            vec![PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 2064.4)]
        );
    }

    #[tokio::test]
    async fn test_empty_chart_result() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found"}}}"#;
        let mock_server = create_history_server("NOPE", 200, body).await;

        let source = YahooRelaySource::new(&relay_url(&mock_server), 10).unwrap();
        let result = source.fetch_closes("NOPE").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No price data found for symbol: NOPE"
        );
    }

    #[tokio::test]
    async fn test_relay_error_status() {
        let mock_server =
            create_history_server("AAPL", 404, r#"{"error": "Failed to fetch history data"}"#).await;

        let source = YahooRelaySource::new(&relay_url(&mock_server), 10).unwrap();
        let result = source.fetch_closes("AAPL").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 404 Not Found for symbol: AAPL"
        );
    }

    #[tokio::test]
    async fn test_search_maps_quotes() {
        let mock_server = MockServer::start().await;
        let body = r#"{
            "quotes": [
                {"symbol": "VNM.VN", "exchange": "VSE", "longname": "Vietnam Dairy Products JSC"},
                {"symbol": "VNM", "exchange": "PCX", "shortname": "VanEck Vietnam ETF"},
                {"exchange": "NYQ", "longname": "No symbol"}
            ],
            "news": []
        }"#;
        Mock::given(method("GET"))
            .and(path("/api/yahoo/search"))
            .and(query_param("q", "vnm"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let source = YahooRelaySource::new(&relay_url(&mock_server), 10).unwrap();
        let suggestions = source.search("vnm").await.unwrap();

        assert_eq!(
            suggestions,
            vec![
                SymbolSuggestion {
                    symbol: "VNM.VN".to_string(),
                    exchange: "VSE".to_string(),
                    longname: "Vietnam Dairy Products JSC".to_string(),
                },
                SymbolSuggestion {
                    symbol: "VNM".to_string(),
                    exchange: "PCX".to_string(),
                    longname: "VanEck Vietnam ETF".to_string(),
                },
            ]
        );
    }
}
