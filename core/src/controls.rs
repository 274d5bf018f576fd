//! Remote-screen actions and state.

use crate::relay::{RelayBody, RelayClient};
use crate::session::{self, SessionStore, StoreError};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Media transport and navigation keys, relayed to `/media/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum MediaAction {
    Previous,
    PlayPause,
    Next,
    Mute,
    VolumeDown,
    VolumeUp,
    Up,
    Down,
    Left,
    Right,
}

impl MediaAction {
    pub const ALL: [MediaAction; 10] = [
        MediaAction::Previous,
        MediaAction::PlayPause,
        MediaAction::Next,
        MediaAction::Mute,
        MediaAction::VolumeDown,
        MediaAction::VolumeUp,
        MediaAction::Up,
        MediaAction::Down,
        MediaAction::Left,
        MediaAction::Right,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaAction::Previous => "previous",
            MediaAction::PlayPause => "play-pause",
            MediaAction::Next => "next",
            MediaAction::Mute => "mute",
            MediaAction::VolumeDown => "volume-down",
            MediaAction::VolumeUp => "volume-up",
            MediaAction::Up => "up",
            MediaAction::Down => "down",
            MediaAction::Left => "left",
            MediaAction::Right => "right",
        }
    }

    pub fn endpoint(self) -> String {
        format!("/media/{}", self.as_str())
    }
}

/// Host controls, relayed to `/system/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum SystemAction {
    Lock,
    CaptureAndLock,
    Sleep,
    BrightnessDown,
    BrightnessUp,
    Battery,
}

impl SystemAction {
    pub const ALL: [SystemAction; 6] = [
        SystemAction::Lock,
        SystemAction::CaptureAndLock,
        SystemAction::Sleep,
        SystemAction::BrightnessDown,
        SystemAction::BrightnessUp,
        SystemAction::Battery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SystemAction::Lock => "lock",
            SystemAction::CaptureAndLock => "capture-and-lock",
            SystemAction::Sleep => "sleep",
            SystemAction::BrightnessDown => "brightness-down",
            SystemAction::BrightnessUp => "brightness-up",
            SystemAction::Battery => "battery",
        }
    }

    pub fn endpoint(self) -> String {
        format!("/system/{}", self.as_str())
    }
}

/// Error for action names that are not part of the vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for MediaAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_owned()))
    }
}

impl FromStr for SystemAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_owned()))
    }
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SystemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of `/system/battery`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub status: String,
    #[serde(default)]
    pub percentage: Option<f64>,
}

/// Which audio capture is running, as shown on the remote screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Idle,
    Recording,
    Streaming,
}

impl CaptureMode {
    /// Status line under the audio controls, if anything is running.
    pub fn status_line(self) -> Option<&'static str> {
        match self {
            CaptureMode::Idle => None,
            CaptureMode::Recording => Some("Recording audio..."),
            CaptureMode::Streaming => Some("Streaming audio..."),
        }
    }
}

/// The remote screen: every action goes through the relay, failures are
/// logged and swallowed.
#[derive(Debug)]
pub struct RemoteScreen {
    relay: RelayClient,
    battery_level: Option<f64>,
    capture: CaptureMode,
}

impl RemoteScreen {
    pub fn new(relay: RelayClient) -> Self {
        Self {
            relay,
            battery_level: None,
            capture: CaptureMode::Idle,
        }
    }

    pub fn relay(&self) -> &RelayClient {
        &self.relay
    }

    /// Last successful battery reading.
    pub fn battery_level(&self) -> Option<f64> {
        self.battery_level
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.capture
    }

    /// Start recording or streaming. Refused while either is already running,
    /// so the two never overlap.
    pub fn begin_capture(&mut self, mode: CaptureMode) -> bool {
        if mode == CaptureMode::Idle || self.capture != CaptureMode::Idle {
            return false;
        }
        self.capture = mode;
        true
    }

    /// Mark the running capture as finished and return what it was.
    pub fn end_capture(&mut self) -> CaptureMode {
        std::mem::take(&mut self.capture)
    }

    /// Press a media key. Returns whether the companion accepted it.
    pub async fn media(&self, action: MediaAction) -> bool {
        self.relay
            .post(&action.endpoint(), RelayBody::Empty, HeaderMap::new())
            .await
            .is_ok()
    }

    /// Run a system control. A successful battery query updates the label.
    pub async fn system(&mut self, action: SystemAction) -> Option<Value> {
        let result = match self
            .relay
            .post(&action.endpoint(), RelayBody::Empty, HeaderMap::new())
            .await
        {
            Ok(value) => value,
            Err(e) => {
                log::error!("Error in system control {action}: {e}");
                return None;
            }
        };

        if action == SystemAction::Battery {
            match serde_json::from_value::<BatteryStatus>(result.clone()) {
                Ok(battery) if battery.status == "success" => {
                    self.battery_level = battery.percentage;
                }
                Ok(battery) => log::warn!("Battery query returned status '{}'", battery.status),
                Err(e) => log::warn!("Unexpected battery response: {e}"),
            }
        }

        Some(result)
    }

    /// Label of the battery button.
    pub fn battery_label(&self) -> String {
        match self.battery_level {
            Some(level) => format!("Battery - {level}%"),
            None => "Battery".to_owned(),
        }
    }

    /// Forget the stored session ("Clean token").
    pub fn clean_token(&self, store: &dyn SessionStore) -> Result<(), StoreError> {
        session::clean_token(store)
    }
}
