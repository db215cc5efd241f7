use crate::{display::IconImage, settings::ButtonConfig, settings::InstanceId, Result};

pub mod fake;
pub mod protocol;
pub mod stdio;

pub use protocol::{EventBridge, HostRequest};
pub use stdio::StdioHost;

/// Events the button host delivers for this action.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Activate {
        instance: InstanceId,
        settings: ButtonConfig,
    },
    Deactivate {
        instance: InstanceId,
    },
    PressDown {
        instance: InstanceId,
        settings: ButtonConfig,
    },
    PressUp {
        instance: InstanceId,
        settings: ButtonConfig,
    },
    SettingsChanged {
        instance: InstanceId,
        settings: ButtonConfig,
    },
    /// Free-form message from the property inspector.
    PluginMessage {
        instance: Option<InstanceId>,
        payload: serde_json::Value,
    },
}

impl HostEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::Activate { .. } => "activate",
            HostEvent::Deactivate { .. } => "deactivate",
            HostEvent::PressDown { .. } => "press_down",
            HostEvent::PressUp { .. } => "press_up",
            HostEvent::SettingsChanged { .. } => "settings_changed",
            HostEvent::PluginMessage { .. } => "plugin_message",
        }
    }
}

/// Requests this plugin makes of the button host.
pub trait Host {
    fn set_icon(&mut self, instance: &InstanceId, icon: &IconImage) -> Result<()>;
    fn show_failure_indicator(&mut self, instance: &InstanceId) -> Result<()>;
    fn open_url(&mut self, url: &str) -> Result<()>;
    fn persist_settings(&mut self, instance: &InstanceId, settings: &ButtonConfig) -> Result<()>;
}
