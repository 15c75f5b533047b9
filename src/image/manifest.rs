//! Manifest formats and MIME type handling
//!
//! Supports Docker schema1 (signed and unsigned), Docker schema2, OCI image
//! manifests, Docker manifest lists and OCI indexes.

use crate::config::SystemContext;
use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DOCKER_V2_SCHEMA1_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v1+json";
pub const DOCKER_V2_SCHEMA1_SIGNED_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";
pub const DOCKER_V2_SCHEMA2_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const DOCKER_V2_LIST_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
pub const OCI_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
pub const OCI_INDEX_MEDIA_TYPE: &str = "application/vnd.oci.image.index.v1+json";
pub const DOCKER_CONFIG_MEDIA_TYPE: &str = "application/vnd.docker.container.image.v1+json";

/// Accept header value for manifest requests
pub fn manifest_accept_header() -> String {
    [
        DOCKER_V2_SCHEMA2_MEDIA_TYPE,
        DOCKER_V2_LIST_MEDIA_TYPE,
        OCI_MANIFEST_MEDIA_TYPE,
        OCI_INDEX_MEDIA_TYPE,
        DOCKER_V2_SCHEMA1_SIGNED_MEDIA_TYPE,
        DOCKER_V2_SCHEMA1_MEDIA_TYPE,
    ]
    .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestType {
    DockerV2Schema1,
    DockerV2Schema1Signed,
    DockerV2Schema2,
    DockerV2List,
    OciManifest,
    OciIndex,
}

impl ManifestType {
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match normalize_media_type(media_type) {
            DOCKER_V2_SCHEMA1_MEDIA_TYPE => Some(ManifestType::DockerV2Schema1),
            DOCKER_V2_SCHEMA1_SIGNED_MEDIA_TYPE => Some(ManifestType::DockerV2Schema1Signed),
            DOCKER_V2_SCHEMA2_MEDIA_TYPE => Some(ManifestType::DockerV2Schema2),
            DOCKER_V2_LIST_MEDIA_TYPE => Some(ManifestType::DockerV2List),
            OCI_MANIFEST_MEDIA_TYPE => Some(ManifestType::OciManifest),
            OCI_INDEX_MEDIA_TYPE => Some(ManifestType::OciIndex),
            _ => None,
        }
    }

    pub fn to_content_type(&self) -> &'static str {
        match self {
            ManifestType::DockerV2Schema1 => DOCKER_V2_SCHEMA1_MEDIA_TYPE,
            ManifestType::DockerV2Schema1Signed => DOCKER_V2_SCHEMA1_SIGNED_MEDIA_TYPE,
            ManifestType::DockerV2Schema2 => DOCKER_V2_SCHEMA2_MEDIA_TYPE,
            ManifestType::DockerV2List => DOCKER_V2_LIST_MEDIA_TYPE,
            ManifestType::OciManifest => OCI_MANIFEST_MEDIA_TYPE,
            ManifestType::OciIndex => OCI_INDEX_MEDIA_TYPE,
        }
    }
}

/// Drop parameters such as `; charset=utf-8`
pub fn normalize_media_type(media_type: &str) -> &str {
    media_type.split(';').next().unwrap_or("").trim()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestProbe {
    schema_version: Option<u32>,
    media_type: Option<String>,
    signatures: Option<serde_json::Value>,
    manifests: Option<serde_json::Value>,
    config: Option<ConfigProbe>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigProbe {
    media_type: Option<String>,
}

/// Work out the manifest type from its content, for registries that serve
/// manifests as `application/json` or without a content type.
pub fn guess_manifest_type(data: &[u8]) -> Result<ManifestType> {
    let probe: ManifestProbe = serde_json::from_slice(data)
        .map_err(|e| RegistryError::Parse(format!("Manifest is not valid JSON: {}", e)))?;

    if let Some(manifest_type) = probe.media_type.as_deref().and_then(ManifestType::from_media_type) {
        return Ok(manifest_type);
    }

    match probe.schema_version {
        Some(1) if probe.signatures.is_some() => Ok(ManifestType::DockerV2Schema1Signed),
        Some(1) => Ok(ManifestType::DockerV2Schema1),
        Some(2) if probe.manifests.is_some() => Ok(ManifestType::OciIndex),
        Some(2) => match probe.config.and_then(|c| c.media_type).as_deref() {
            Some(DOCKER_CONFIG_MEDIA_TYPE) => Ok(ManifestType::DockerV2Schema2),
            Some(_) | None => Ok(ManifestType::OciManifest),
        },
        other => Err(RegistryError::Unsupported(format!(
            "Unrecognized manifest (schemaVersion {:?}, mediaType {:?})",
            other, probe.media_type
        ))),
    }
}

/// Manifest type from the served content type, falling back to the content
pub fn detect_manifest_type(data: &[u8], content_type: &str) -> Result<ManifestType> {
    match ManifestType::from_media_type(content_type) {
        Some(manifest_type) => Ok(manifest_type),
        None => guess_manifest_type(data),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(rename = "os.version", default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: Option<String>,
    pub digest: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

/// Docker schema2 or OCI image manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: Option<String>,
    pub config: Descriptor,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

/// Docker manifest list or OCI index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestList {
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: Option<String>,
    pub manifests: Vec<Descriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema1Layer {
    pub blob_sum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema1History {
    pub v1_compatibility: String,
}

/// Docker schema1 manifest; image metadata lives in the history entries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema1Manifest {
    pub schema_version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub fs_layers: Vec<Schema1Layer>,
    #[serde(default)]
    pub history: Vec<Schema1History>,
}

#[derive(Debug, Clone)]
pub enum Manifest {
    Image(ImageManifest),
    List(ManifestList),
    Schema1(Schema1Manifest),
}

/// Parsed manifest together with its type
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub manifest_type: ManifestType,
    pub manifest: Manifest,
}

pub fn parse_manifest(data: &[u8], content_type: &str) -> Result<ParsedManifest> {
    let manifest_type = detect_manifest_type(data, content_type)?;

    let parse_error =
        |e: serde_json::Error| RegistryError::Parse(format!("Invalid {} manifest: {}", manifest_type.to_content_type(), e));

    let manifest = match manifest_type {
        ManifestType::DockerV2Schema2 | ManifestType::OciManifest => {
            let manifest: ImageManifest = serde_json::from_slice(data).map_err(parse_error)?;
            check_schema_version(manifest.schema_version, 2)?;
            Manifest::Image(manifest)
        }
        ManifestType::DockerV2List | ManifestType::OciIndex => {
            let list: ManifestList = serde_json::from_slice(data).map_err(parse_error)?;
            check_schema_version(list.schema_version, 2)?;
            Manifest::List(list)
        }
        ManifestType::DockerV2Schema1 | ManifestType::DockerV2Schema1Signed => {
            let manifest: Schema1Manifest = serde_json::from_slice(data).map_err(parse_error)?;
            check_schema_version(manifest.schema_version, 1)?;
            if manifest.history.is_empty() {
                return Err(RegistryError::Parse(
                    "Schema1 manifest has no history entries".to_string(),
                ));
            }
            Manifest::Schema1(manifest)
        }
    };

    Ok(ParsedManifest {
        manifest_type,
        manifest,
    })
}

fn check_schema_version(actual: u32, expected: u32) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(RegistryError::Unsupported(format!(
            "Unsupported schema version {} (expected {})",
            actual, expected
        )))
    }
}

impl ManifestList {
    /// Pick the instance matching the platform requested by `sys`
    pub fn choose_instance(&self, sys: &SystemContext) -> Result<&Descriptor> {
        let os = sys.os();
        let architecture = sys.architecture();
        let variant = sys.variant();

        self.manifests
            .iter()
            .find(|d| {
                d.platform.as_ref().is_some_and(|p| {
                    p.os == os
                        && p.architecture == architecture
                        && variant.is_none_or(|v| p.variant.as_deref() == Some(v))
                })
            })
            .ok_or_else(|| {
                RegistryError::NotFound(format!(
                    "no image found in manifest list for architecture {}, variant {:?}, OS {}",
                    architecture,
                    variant.unwrap_or(""),
                    os
                ))
            })
    }
}
