use serde::Serialize;
use thiserror::Error;

/// Unified error type for the remote client.
///
/// Module errors convert into this enum so callers (the CLI, or an embedding
/// UI) get a structured, serializable error.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Missing token or service URL")]
    Handshake,

    #[error("Not connected. Open the connect link from the companion to pair this device.")]
    NotConnected,

    #[error("Connect failed: {message}")]
    Connect { message: String },

    #[error("Request to {endpoint} failed: {message}")]
    Relay {
        endpoint: String,
        message: String,
        status: Option<u16>,
    },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl AppError {
    /// Create a Session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a Relay error for a specific endpoint
    pub fn relay(endpoint: impl Into<String>, err: &crate::relay::RelayError) -> Self {
        let status = match err {
            crate::relay::RelayError::Status { status, .. } => Some(*status),
            _ => None,
        };
        Self::Relay {
            endpoint: endpoint.into(),
            message: err.to_string(),
            status,
        }
    }

    /// Create an Audio error
    pub fn audio(message: impl Into<String>) -> Self {
        Self::Audio {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (user can retry or take action)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Network and device problems may be transient
            Self::Relay { .. } | Self::Audio { .. } | Self::Io { .. } => true,
            // Pairing again fixes these
            Self::NotConnected | Self::Connect { .. } => true,
            // The link itself is broken, or the local files are
            Self::Handshake | Self::Session { .. } | Self::Config { .. } => false,
        }
    }
}

// Convert from StoreError
impl From<crate::session::StoreError> for AppError {
    fn from(err: crate::session::StoreError) -> Self {
        AppError::session(err.to_string())
    }
}

// Convert from ConfigError
impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::Config {
            message: err.to_string(),
        }
    }
}

// Convert from ConnectError, keeping the inline text shown on the connect screen
impl From<crate::connect::ConnectError> for AppError {
    fn from(err: crate::connect::ConnectError) -> Self {
        AppError::Connect {
            message: err.display_message(),
        }
    }
}

// Convert from AudioError
impl From<crate::audio::AudioError> for AppError {
    fn from(err: crate::audio::AudioError) -> Self {
        use crate::audio::AudioError;
        match err {
            AudioError::Relay(e) => AppError::relay(crate::audio::UPLOAD_ENDPOINT, &e),
            AudioError::Io(e) => AppError::io(e.to_string()),
            other => AppError::audio(other.to_string()),
        }
    }
}

// Convert to String for CLI command errors
impl From<AppError> for String {
    fn from(err: AppError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayError;

    #[test]
    fn test_error_serialization() {
        let err = AppError::relay(
            "/media/next",
            &RelayError::Status {
                status: 401,
                body: String::new(),
            },
        );
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"Relay\""));
        assert!(json.contains("\"endpoint\":\"/media/next\""));
        assert!(json.contains("\"status\":401"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(AppError::NotConnected.is_recoverable());
        assert!(AppError::audio("device busy").is_recoverable());
        assert!(!AppError::Handshake.is_recoverable());
        assert!(!AppError::session("corrupt session.json").is_recoverable());
    }

    #[test]
    fn test_connect_error_keeps_inline_text() {
        let err: AppError = crate::connect::ConnectError::Relay(RelayError::Status {
            status: 403,
            body: r#"{"error":"expired"}"#.to_owned(),
        })
        .into();
        assert_eq!(err.to_string(), r#"Connect failed: {"error":"expired"}"#);
    }

    #[test]
    fn test_handshake_message() {
        // The binary prefixes every error with "Error: ".
        assert_eq!(
            format!("Error: {}", AppError::Handshake),
            crate::session::bootstrap::HANDSHAKE_ERROR_MESSAGE
        );
    }
}
