use super::Host;
use crate::{
    display::IconImage,
    settings::{ButtonConfig, InstanceId},
    Error, Result,
};

/// One call made against a [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    SetIcon(InstanceId, IconImage),
    Failure(InstanceId),
    OpenUrl(String),
    Persist(InstanceId, ButtonConfig),
}

/// Host used in tests to record every request.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Vec<HostCall>,
    fail_writes: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent request fail like a closed pipe.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn icons_for(&self, instance: &InstanceId) -> Vec<&IconImage> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::SetIcon(id, icon) if id == instance => Some(icon),
                _ => None,
            })
            .collect()
    }

    pub fn last_icon(&self, instance: &InstanceId) -> Option<&IconImage> {
        self.icons_for(instance).last().copied()
    }

    pub fn failures_for(&self, instance: &InstanceId) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, HostCall::Failure(id) if id == instance))
            .count()
    }

    pub fn opened_urls(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::OpenUrl(url) => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: HostCall) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "host closed",
            )));
        }
        self.calls.push(call);
        Ok(())
    }
}

impl Host for RecordingHost {
    fn set_icon(&mut self, instance: &InstanceId, icon: &IconImage) -> Result<()> {
        self.record(HostCall::SetIcon(instance.clone(), icon.clone()))
    }

    fn show_failure_indicator(&mut self, instance: &InstanceId) -> Result<()> {
        self.record(HostCall::Failure(instance.clone()))
    }

    fn open_url(&mut self, url: &str) -> Result<()> {
        self.record(HostCall::OpenUrl(url.to_string()))
    }

    fn persist_settings(&mut self, instance: &InstanceId, settings: &ButtonConfig) -> Result<()> {
        self.record(HostCall::Persist(instance.clone(), settings.clone()))
    }
}
