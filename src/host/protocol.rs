use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::HostEvent;
use crate::{
    settings::{ButtonConfig, InstanceId},
    Error, Result,
};

pub const DEFAULT_ACTION_UUID: &str = "dev.pipelinedeck.codepipeline";

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
}

/// `setImage` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub image: String,
    pub target: u8,
}

/// `openUrl` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPayload {
    pub url: String,
}

/// One outgoing line of the host protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostRequest {
    SetImage {
        context: String,
        payload: ImagePayload,
    },
    ShowAlert {
        context: String,
    },
    OpenUrl {
        payload: UrlPayload,
    },
    SetSettings {
        context: String,
        payload: ButtonConfig,
    },
}

pub fn encode_request(request: &HostRequest) -> Result<String> {
    Ok(serde_json::to_string(request)?)
}

/// EventBridge ingests newline-delimited JSON host messages and emits events
/// addressed to this plugin's action.
#[derive(Debug)]
pub struct EventBridge {
    action_uuid: String,
    ignored: u64,
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_UUID)
    }
}

impl EventBridge {
    pub fn new(action_uuid: impl Into<String>) -> Self {
        Self {
            action_uuid: action_uuid.into(),
            ignored: 0,
        }
    }

    /// Decode one line. `Ok(None)` means the message is valid but not for us.
    pub fn ingest_line(&mut self, raw: &str) -> Result<Option<HostEvent>> {
        let envelope: Envelope = serde_json::from_str(raw.trim())?;
        let event = self.route(envelope)?;
        if event.is_none() {
            self.ignored += 1;
        }
        Ok(event)
    }

    /// Number of well-formed messages skipped so far.
    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    fn route(&self, envelope: Envelope) -> Result<Option<HostEvent>> {
        if let Some(action) = envelope.action.as_deref() {
            if action != self.action_uuid {
                return Ok(None);
            }
        }
        let instance = envelope.context.map(InstanceId::new);
        let payload = envelope.payload;

        let event = match envelope.event.as_str() {
            "willAppear" => HostEvent::Activate {
                instance: require_context(instance, "willAppear")?,
                settings: settings_from(payload)?,
            },
            "willDisappear" => HostEvent::Deactivate {
                instance: require_context(instance, "willDisappear")?,
            },
            "keyDown" => HostEvent::PressDown {
                instance: require_context(instance, "keyDown")?,
                settings: settings_from(payload)?,
            },
            "keyUp" => HostEvent::PressUp {
                instance: require_context(instance, "keyUp")?,
                settings: settings_from(payload)?,
            },
            "didReceiveSettings" => HostEvent::SettingsChanged {
                instance: require_context(instance, "didReceiveSettings")?,
                settings: settings_from(payload)?,
            },
            "sendToPlugin" => HostEvent::PluginMessage {
                instance,
                payload: payload.unwrap_or(Value::Null),
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn require_context(instance: Option<InstanceId>, event: &str) -> Result<InstanceId> {
    instance.ok_or_else(|| Error::Parse(format!("{event} message without context")))
}

fn settings_from(payload: Option<Value>) -> Result<ButtonConfig> {
    let settings = payload.and_then(|mut p| p.get_mut("settings").map(Value::take));
    match settings {
        Some(Value::Null) | None => Ok(ButtonConfig::default()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}
