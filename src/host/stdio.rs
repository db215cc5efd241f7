use std::io::Write;

use super::protocol::{encode_request, HostRequest, ImagePayload, UrlPayload};
use super::Host;
use crate::{
    display::IconImage,
    settings::{ButtonConfig, InstanceId},
    Result,
};

/// Host that writes protocol requests as newline-delimited JSON.
pub struct StdioHost<W: Write> {
    out: W,
}

impl<W: Write> StdioHost<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn send(&mut self, request: &HostRequest) -> Result<()> {
        let line = encode_request(request)?;
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Host for StdioHost<W> {
    fn set_icon(&mut self, instance: &InstanceId, icon: &IconImage) -> Result<()> {
        self.send(&HostRequest::SetImage {
            context: instance.to_string(),
            payload: ImagePayload {
                image: icon.to_data_url(),
                target: 0,
            },
        })
    }

    fn show_failure_indicator(&mut self, instance: &InstanceId) -> Result<()> {
        self.send(&HostRequest::ShowAlert {
            context: instance.to_string(),
        })
    }

    fn open_url(&mut self, url: &str) -> Result<()> {
        self.send(&HostRequest::OpenUrl {
            payload: UrlPayload {
                url: url.to_string(),
            },
        })
    }

    fn persist_settings(&mut self, instance: &InstanceId, settings: &ButtonConfig) -> Result<()> {
        self.send(&HostRequest::SetSettings {
            context: instance.to_string(),
            payload: settings.clone(),
        })
    }
}
