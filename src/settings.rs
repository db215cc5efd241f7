use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-button settings as persisted by the host.
///
/// The JSON keys match what the property inspector writes; any key the
/// inspector has not filled in yet deserializes as an empty string.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonConfig {
    #[serde(rename = "AWS_ACCESS_KEY_ID", default)]
    pub credential_id: String,
    #[serde(rename = "AWS_SECRET_ACCESS_KEY", default)]
    pub credential_secret: String,
    #[serde(default)]
    pub region: String,
    #[serde(rename = "pipelineName", default)]
    pub pipeline_name: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
}

impl ButtonConfig {
    /// True when every field is non-blank; polling is only permitted then.
    pub fn is_complete(&self) -> bool {
        [
            &self.credential_id,
            &self.credential_secret,
            &self.region,
            &self.pipeline_name,
            &self.display_name,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }

    /// Names of the fields that still need a value, for log messages.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.credential_id.trim().is_empty() {
            missing.push("AWS_ACCESS_KEY_ID");
        }
        if self.credential_secret.trim().is_empty() {
            missing.push("AWS_SECRET_ACCESS_KEY");
        }
        if self.region.trim().is_empty() {
            missing.push("region");
        }
        if self.pipeline_name.trim().is_empty() {
            missing.push("pipelineName");
        }
        if self.display_name.trim().is_empty() {
            missing.push("displayName");
        }
        missing
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_key_id: self.credential_id.trim().to_string(),
            secret_access_key: self.credential_secret.trim().to_string(),
        }
    }

    /// Web console page for the configured pipeline, if region and name are set.
    pub fn console_url(&self) -> Option<String> {
        let region = self.region.trim();
        let pipeline = self.pipeline_name.trim();
        if region.is_empty() || pipeline.is_empty() {
            return None;
        }
        Some(format!(
            "https://{region}.console.aws.amazon.com/codesuite/codepipeline/pipelines/{pipeline}/view?region={region}"
        ))
    }
}

/// Static long-lived credentials handed straight to the pipeline client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for ButtonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonConfig")
            .field("credential_id", &self.credential_id)
            .field("credential_secret", &"<redacted>")
            .field("region", &self.region)
            .field("pipeline_name", &self.pipeline_name)
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Opaque identifier of one visible button occurrence (the host's context string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
