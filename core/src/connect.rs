//! The connect exchange: trade the link's temporary token for a durable one.
//!
//! [`ConnectForm`] models the connect screen. A submission is split into
//! [`ConnectForm::begin`] (raises the loading flag and freezes the input),
//! [`ConnectRequest::send`] (the single POST), and [`ConnectForm::finish`]
//! (persists or records the inline error). [`ConnectForm::submit`] runs all three.

use crate::relay::{RelayClient, RelayError};
use crate::session::{HandshakeContext, Route, SessionStore, StoreError, StoredSession};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const CONNECT_ENDPOINT: &str = "/auth/connect";

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("Response did not contain a token")]
    MissingToken,
    #[error("Failed to save session: {0}")]
    Store(#[from] StoreError),
}

impl ConnectError {
    /// Inline text for the connect screen: the server's response body as
    /// JSON when there is one, otherwise the error message as a JSON string.
    pub fn display_message(&self) -> String {
        if let ConnectError::Relay(e) = self {
            if let Some(body) = e.response_body() {
                return body.to_string();
            }
        }
        serde_json::Value::String(self.to_string()).to_string()
    }
}

#[derive(Deserialize)]
struct ConnectResponse {
    token: Option<String>,
}

/// Successful exchange: the persisted session and where to go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    pub session: StoredSession,
    pub redirect: Route,
}

/// One in-flight connect call, detached from the form.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    context: HandshakeContext,
    device_name: String,
}

impl ConnectRequest {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// POST `{serviceUrl}/auth/connect` with the temporary token as bearer.
    /// Returns the durable token.
    pub async fn send(&self, timeout: Duration) -> Result<String, ConnectError> {
        let client = RelayClient::new(&self.context.service_url, &self.context.token, timeout)?;
        let value = client
            .post_json(
                CONNECT_ENDPOINT,
                serde_json::json!({ "device_name": self.device_name }),
            )
            .await?;
        let response: ConnectResponse =
            serde_json::from_value(value).map_err(|_| ConnectError::MissingToken)?;
        response
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ConnectError::MissingToken)
    }
}

/// State of the connect screen.
#[derive(Debug, Clone)]
pub struct ConnectForm {
    device_name: String,
    loading: bool,
    error: Option<String>,
}

impl ConnectForm {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            loading: false,
            error: None,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The inline error of the last failed attempt.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Edit the device name. Ignored while a request is in flight.
    pub fn set_device_name(&mut self, name: impl Into<String>) -> bool {
        if self.loading {
            return false;
        }
        self.device_name = name.into();
        true
    }

    /// Start a submission. `None` when there is no service URL to call or a
    /// request is already in flight.
    pub fn begin(&mut self, context: &HandshakeContext) -> Option<ConnectRequest> {
        if context.service_url.is_empty() || self.loading {
            return None;
        }
        self.loading = true;
        Some(ConnectRequest {
            context: context.clone(),
            device_name: self.device_name.clone(),
        })
    }

    /// Complete a submission. On success both values are persisted together;
    /// on failure nothing is persisted and the inline error is set.
    pub fn finish(
        &mut self,
        request: &ConnectRequest,
        result: Result<String, ConnectError>,
        store: &dyn SessionStore,
    ) -> Option<ConnectOutcome> {
        self.loading = false;
        let outcome = result.and_then(|token| {
            let session = StoredSession::new(token, request.context.service_url.clone());
            store.save(&session)?;
            Ok(session)
        });

        match outcome {
            Ok(session) => {
                log::info!("Connected as '{}'", request.device_name);
                self.error = None;
                Some(ConnectOutcome {
                    session,
                    redirect: Route::Remote,
                })
            }
            Err(e) => {
                log::error!("Connect failed: {e}");
                self.error = Some(e.display_message());
                None
            }
        }
    }

    /// Run a whole submission. No retry is attempted on failure.
    pub async fn submit(
        &mut self,
        context: &HandshakeContext,
        store: &dyn SessionStore,
        timeout: Duration,
    ) -> Option<ConnectOutcome> {
        let request = self.begin(context)?;
        let result = request.send(timeout).await;
        self.finish(&request, result, store)
    }
}
