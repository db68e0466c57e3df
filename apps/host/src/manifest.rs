use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;

pub const HOST_NAME: &str = "com.teamlink.host";

/// Native messaging host manifest, in the layout the browser registry
/// expects.
#[derive(Debug, Serialize)]
pub struct HostManifest {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub transport: String,
    pub allowed_origins: Vec<String>,
}

impl HostManifest {
    pub fn for_current_exe(allowed_origins: Vec<String>) -> anyhow::Result<Self> {
        let path = std::env::current_exe().context("failed to resolve host binary path")?;
        Ok(Self {
            name: HOST_NAME.to_string(),
            description: "Creates Microsoft Teams chats for selected issues".to_string(),
            path,
            transport: "stdio".to_string(),
            allowed_origins,
        })
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize host manifest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_serializes_with_expected_keys() {
        let manifest = HostManifest {
            name: HOST_NAME.to_string(),
            description: "test".to_string(),
            path: PathBuf::from("/usr/local/bin/teamlink-host"),
            transport: "stdio".to_string(),
            allowed_origins: vec!["chrome-extension://abc/".to_string()],
        };

        let value: serde_json::Value =
            serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(value["name"], "com.teamlink.host");
        assert_eq!(value["type"], "stdio");
        assert_eq!(value["path"], "/usr/local/bin/teamlink-host");
        assert_eq!(value["allowed_origins"][0], "chrome-extension://abc/");
    }
}
