//! Authenticated POSTs to the paired companion service.

use crate::session::StoredSession;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid service URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: String },
}

impl RelayError {
    /// The response body of a failed call, parsed as JSON when possible.
    pub fn response_body(&self) -> Option<Value> {
        match self {
            RelayError::Status { body, .. } if !body.is_empty() => Some(
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone())),
            ),
            _ => None,
        }
    }
}

/// Request payloads accepted by [`RelayClient::post`].
pub enum RelayBody {
    /// Sent as `{}`.
    Empty,
    Json(Value),
    Bytes(Vec<u8>),
    Multipart(Form),
}

/// Client bound to one service URL and bearer token.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    service_url: String,
    token: String,
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("service_url", &self.service_url)
            .finish_non_exhaustive()
    }
}

impl RelayClient {
    pub fn new(
        service_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            service_url: service_url.into(),
            token: token.into(),
        })
    }

    /// Client for the stored durable session.
    pub fn from_session(session: &StoredSession, timeout: Duration) -> Result<Self, RelayError> {
        Self::new(&session.service_url, &session.auth_token, timeout)
    }

    /// Client with the default timeout.
    pub fn with_defaults(
        service_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, RelayError> {
        Self::new(service_url, token, DEFAULT_TIMEOUT)
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// `{serviceUrl}{endpoint}`, validated.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<url::Url, RelayError> {
        let raw = format!("{}{}", self.service_url.trim_end_matches('/'), endpoint);
        url::Url::parse(&raw).map_err(|source| RelayError::InvalidUrl { url: raw, source })
    }

    /// POST `body` to `endpoint`. `headers` are merged over the default
    /// `Authorization: Bearer <token>` header, caller values winning.
    ///
    /// Failures are logged before being returned.
    pub async fn post(
        &self,
        endpoint: &str,
        body: RelayBody,
        headers: HeaderMap,
    ) -> Result<Value, RelayError> {
        let result = self.send(endpoint, body, headers).await;
        if let Err(e) = &result {
            log::error!("Error calling {endpoint}: {e}");
        }
        result
    }

    /// POST with no extra headers.
    pub async fn post_json(&self, endpoint: &str, body: Value) -> Result<Value, RelayError> {
        self.post(endpoint, RelayBody::Json(body), HeaderMap::new())
            .await
    }

    async fn send(
        &self,
        endpoint: &str,
        body: RelayBody,
        extra: HeaderMap,
    ) -> Result<Value, RelayError> {
        let url = self.endpoint_url(endpoint)?;
        let mut headers = self.merged_headers(extra)?;

        let request = self.http.post(url);
        let request = match body {
            RelayBody::Empty => request
                .headers(headers)
                .json(&Value::Object(serde_json::Map::new())),
            RelayBody::Json(value) => request.headers(headers).json(&value),
            RelayBody::Bytes(bytes) => request.headers(headers).body(bytes),
            RelayBody::Multipart(form) => {
                // The form supplies its own content type with the boundary.
                headers.remove(CONTENT_TYPE);
                request.headers(headers).multipart(form)
            }
        };

        log::debug!("POST {endpoint}");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RelayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(parse_body(&text))
    }

    fn merged_headers(&self, extra: HeaderMap) -> Result<HeaderMap, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))?,
        );
        headers.extend(extra);
        Ok(headers)
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}
