//! Image configuration documents
//!
//! The config blob referenced by schema2/OCI manifests, and the
//! `v1Compatibility` history entries that carry the same data in schema1.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Runtime configuration of the container (`config` in the image config)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default)]
    pub env: Option<Vec<String>>,
    #[serde(default)]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

/// Docker `application/vnd.docker.container.image.v1+json` or OCI image config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub docker_version: Option<String>,
    #[serde(default)]
    pub config: Option<ContainerConfig>,
}

/// Decoded `history[].v1Compatibility` of a schema1 manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct V1Compatibility {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub docker_version: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub config: Option<ContainerConfig>,
}

impl ContainerConfig {
    pub fn labels(&self) -> HashMap<String, String> {
        self.labels.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_config_labels_and_env() {
        let config: ImageConfig = serde_json::from_str(
            r#"{
                "architecture": "amd64",
                "os": "linux",
                "created": "2023-05-01T10:00:00Z",
                "config": {"Labels": {"version": "5.2.0"}, "Env": ["PATH=/usr/bin"]},
                "rootfs": {"type": "layers", "diff_ids": []}
            }"#,
        )
        .unwrap();
        let container = config.config.unwrap();
        assert_eq!(container.labels().get("version").map(String::as_str), Some("5.2.0"));
        assert_eq!(container.env, Some(vec!["PATH=/usr/bin".to_string()]));
    }

    #[test]
    fn test_null_labels_decode_to_empty_map() {
        let config: ImageConfig = serde_json::from_str(r#"{"config": {"Labels": null}}"#).unwrap();
        assert!(config.config.unwrap().labels().is_empty());
    }

    #[test]
    fn test_v1_compatibility() {
        let v1: V1Compatibility = serde_json::from_str(
            r#"{"id":"abc","docker_version":"1.13.1","architecture":"amd64","os":"linux","config":{"Labels":{"version":"2.1"}}}"#,
        )
        .unwrap();
        assert_eq!(v1.docker_version.as_deref(), Some("1.13.1"));
        assert_eq!(v1.config.unwrap().labels().get("version").map(String::as_str), Some("2.1"));
    }
}
