use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Sent upstream in place of the relay's own agent; Yahoo rejects unknown clients.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub struct RelayState {
    pub client: reqwest::Client,
    pub upstream: String,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Upstream responded with {status}")]
    Upstream {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },

    #[error("Failed to fetch {what} data from Yahoo Finance")]
    Network {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid upstream URL: {0}")]
    Url(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            RelayError::Upstream {
                status,
                content_type,
                body,
            } => verbatim(status, content_type, body),
            err @ (RelayError::Network { .. } | RelayError::Url(_)) => {
                error!(error = ?err, "Relay request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

fn verbatim(status: StatusCode, content_type: Option<HeaderValue>, body: Bytes) -> Response {
    let mut response = (status, body).into_response();
    let content_type =
        content_type.unwrap_or_else(|| HeaderValue::from_static("application/json"));
    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    response
}

fn required(value: Option<String>, name: &str) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            debug!("Missing relay parameter {}", name);
            None
        })
}

/// Forwards a GET to Yahoo, mirroring the upstream status and body.
async fn forward(state: &RelayState, url: Url, what: &'static str) -> Result<Response, RelayError> {
    debug!("Relaying {} request to {}", what, url);

    let response = state
        .client
        .get(url)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|source| RelayError::Network { what, source })?;

    let status = StatusCode::from_u16(response.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());
    let body = response
        .bytes()
        .await
        .map_err(|source| RelayError::Network { what, source })?;

    if !status.is_success() {
        return Err(RelayError::Upstream {
            status,
            content_type,
            body,
        });
    }
    Ok(verbatim(StatusCode::OK, content_type, body))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// `GET /api/yahoo/search?q=...`
pub async fn search(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<SearchParams>,
) -> Result<Response, RelayError> {
    let query = required(params.q, "q")
        .ok_or_else(|| RelayError::InvalidInput("Missing query parameter q".to_string()))?;

    let url = Url::parse_with_params(
        &format!("{}/v1/finance/search", state.upstream),
        &[
            ("q", query.as_str()),
            ("quotesCount", "10"),
            ("newsCount", "0"),
            ("listsCount", "0"),
        ],
    )
    .map_err(|e| RelayError::Url(e.to_string()))?;

    forward(&state, url, "search").await
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub symbol: Option<String>,
    pub period1: Option<String>,
    pub period2: Option<String>,
}

/// `GET /api/yahoo/history?symbol=...&period1=...&period2=...`
pub async fn history(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Response, RelayError> {
    let (Some(symbol), Some(period1), Some(period2)) = (
        required(params.symbol, "symbol"),
        required(params.period1, "period1"),
        required(params.period2, "period2"),
    ) else {
        return Err(RelayError::InvalidInput(
            "Missing required parameters: symbol, period1, period2".to_string(),
        ));
    };
    for (name, value) in [("period1", &period1), ("period2", &period2)] {
        if value.parse::<i64>().is_err() {
            return Err(RelayError::InvalidInput(format!(
                "Invalid {name}: expected a unix timestamp"
            )));
        }
    }

    let mut url = Url::parse_with_params(
        &format!("{}/v8/finance/chart/", state.upstream),
        &[
            ("period1", period1.as_str()),
            ("period2", period2.as_str()),
            ("interval", "1d"),
            ("events", "history"),
        ],
    )
    .map_err(|e| RelayError::Url(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| RelayError::Url(state.upstream.clone()))?
        .pop_if_empty()
        .push(&symbol);

    forward(&state, url, "history").await
}
