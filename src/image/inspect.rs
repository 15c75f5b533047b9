//! Reading an image from a source and producing its inspection result

use crate::common::Context;
use crate::config::SystemContext;
use crate::digest::DigestUtils;
use crate::error::{RegistryError, Result};
use crate::image::config::{ImageConfig, V1Compatibility};
use crate::image::manifest::{
    parse_manifest, ImageManifest, Manifest, ManifestType, ParsedManifest, Schema1Manifest,
};
use crate::registry::transport::{BlobInfo, ImageSource, ManifestResponse};
use serde::Serialize;
use std::collections::HashMap;

/// Structured metadata of an image, as printed by `inspect`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageInspectInfo {
    pub tag: Option<String>,
    pub created: Option<String>,
    pub docker_version: Option<String>,
    pub labels: HashMap<String, String>,
    pub architecture: Option<String>,
    pub variant: Option<String>,
    pub os: Option<String>,
    pub author: Option<String>,
    pub layers: Vec<String>,
    pub env: Vec<String>,
}

/// An image source, optionally narrowed to one instance of a manifest list,
/// whose manifest has not been read yet.
pub struct UnparsedImage<'a> {
    source: &'a dyn ImageSource,
    instance_digest: Option<String>,
}

impl<'a> UnparsedImage<'a> {
    pub fn new(source: &'a dyn ImageSource, instance_digest: Option<String>) -> Self {
        Self {
            source,
            instance_digest,
        }
    }

    pub fn source(&self) -> &'a dyn ImageSource {
        self.source
    }

    /// Fetch the manifest, verifying it when addressed by digest
    pub async fn manifest(&self, ctx: &Context) -> Result<ManifestResponse> {
        fetch_manifest(self.source, ctx, self.instance_digest.as_deref()).await
    }
}

async fn fetch_manifest(
    source: &dyn ImageSource,
    ctx: &Context,
    instance_digest: Option<&str>,
) -> Result<ManifestResponse> {
    let response = source.get_manifest(ctx, instance_digest).await?;
    if let Some(digest) = instance_digest {
        DigestUtils::verify_data_integrity(&response.data, digest)?;
    }
    Ok(response)
}

#[derive(Debug, Clone)]
enum ResolvedManifest {
    Image(ImageManifest),
    Schema1(Schema1Manifest),
}

/// A single-platform image with its manifest parsed
pub struct Image<'a> {
    source: &'a dyn ImageSource,
    manifest_type: ManifestType,
    manifest: ResolvedManifest,
}

/// Read the manifest of `unparsed` and resolve it to a single image. Manifest
/// lists are narrowed to the instance matching the platform in `sys`.
pub async fn from_unparsed_image<'a>(
    ctx: &Context,
    sys: &SystemContext,
    unparsed: UnparsedImage<'a>,
) -> Result<Image<'a>> {
    let source = unparsed.source();
    let response = unparsed.manifest(ctx).await?;
    let parsed = parse_manifest(&response.data, &response.content_type)?;

    let parsed = match parsed.manifest {
        Manifest::List(list) => {
            if unparsed.instance_digest.is_some() {
                return Err(RegistryError::Unsupported(
                    "manifest list instance is itself a manifest list".to_string(),
                ));
            }
            let instance = list.choose_instance(sys)?;
            let response = fetch_manifest(source, ctx, Some(&instance.digest)).await?;
            parse_manifest(&response.data, &response.content_type)?
        }
        _ => parsed,
    };

    let ParsedManifest {
        manifest_type,
        manifest,
    } = parsed;

    let manifest = match manifest {
        Manifest::Image(m) => ResolvedManifest::Image(m),
        Manifest::Schema1(m) => ResolvedManifest::Schema1(m),
        Manifest::List(_) => {
            return Err(RegistryError::Unsupported(
                "manifest list instance is itself a manifest list".to_string(),
            ));
        }
    };

    Ok(Image {
        source,
        manifest_type,
        manifest,
    })
}

impl Image<'_> {
    pub fn manifest_type(&self) -> ManifestType {
        self.manifest_type
    }

    /// Descriptor of the config blob; schema1 images have none
    pub fn config_info(&self) -> Option<BlobInfo> {
        match &self.manifest {
            ResolvedManifest::Image(m) => Some(BlobInfo {
                digest: m.config.digest.clone(),
                size: m.config.size,
                media_type: m.config.media_type.clone(),
            }),
            ResolvedManifest::Schema1(_) => None,
        }
    }

    pub async fn config_blob(&self, ctx: &Context) -> Result<Option<Vec<u8>>> {
        let Some(info) = self.config_info() else {
            return Ok(None);
        };

        let blob = self.source.get_blob(ctx, &info).await?;
        if let Some(size) = info.size {
            if blob.len() as u64 != size {
                return Err(RegistryError::Validation(format!(
                    "Config blob {} has size {}, manifest says {}",
                    info.digest,
                    blob.len(),
                    size
                )));
            }
        }
        Ok(Some(blob))
    }

    pub async fn inspect(&self, ctx: &Context) -> Result<ImageInspectInfo> {
        match &self.manifest {
            ResolvedManifest::Image(manifest) => {
                let blob = self.config_blob(ctx).await?.ok_or_else(|| {
                    RegistryError::Parse("Image has no config blob".to_string())
                })?;
                let config: ImageConfig = serde_json::from_slice(&blob).map_err(|e| {
                    RegistryError::Parse(format!("Invalid image config: {}", e))
                })?;
                Ok(inspect_image_config(manifest, config))
            }
            ResolvedManifest::Schema1(manifest) => inspect_schema1(manifest),
        }
    }
}

fn inspect_image_config(manifest: &ImageManifest, config: ImageConfig) -> ImageInspectInfo {
    let container = config.config.unwrap_or_default();
    ImageInspectInfo {
        tag: None,
        created: config.created,
        docker_version: config.docker_version,
        labels: container.labels(),
        architecture: config.architecture,
        variant: config.variant,
        os: config.os,
        author: config.author,
        layers: manifest.layers.iter().map(|l| l.digest.clone()).collect(),
        env: container.env.unwrap_or_default(),
    }
}

fn inspect_schema1(manifest: &Schema1Manifest) -> Result<ImageInspectInfo> {
    let top = manifest
        .history
        .first()
        .ok_or_else(|| RegistryError::Parse("Schema1 manifest has no history entries".to_string()))?;
    let v1: V1Compatibility = serde_json::from_str(&top.v1_compatibility).map_err(|e| {
        RegistryError::Parse(format!("Invalid v1Compatibility entry: {}", e))
    })?;
    let container = v1.config.unwrap_or_default();

    // fsLayers are listed top-most first
    let layers = manifest
        .fs_layers
        .iter()
        .rev()
        .map(|l| l.blob_sum.clone())
        .collect();

    let architecture = v1
        .architecture
        .or_else(|| Some(manifest.architecture.clone()).filter(|a| !a.is_empty()));

    Ok(ImageInspectInfo {
        tag: Some(manifest.tag.clone()).filter(|t| !t.is_empty()),
        created: v1.created,
        docker_version: v1.docker_version,
        labels: container.labels(),
        architecture,
        variant: v1.variant,
        os: v1.os,
        author: v1.author,
        layers,
        env: container.env.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::manifest::{DOCKER_V2_SCHEMA1_SIGNED_MEDIA_TYPE, OCI_MANIFEST_MEDIA_TYPE};

    #[test]
    fn test_inspect_schema1_uses_top_history_entry() {
        let manifest = format!(
            r#"{{"schemaVersion":1,"name":"scylladb/scylla","tag":"4.0","architecture":"amd64",
                "fsLayers":[{{"blobSum":"sha256:{top}"}},{{"blobSum":"sha256:{base}"}}],
                "history":[{{"v1Compatibility":"{{\"created\":\"2020-01-01T00:00:00Z\",\"os\":\"linux\",\"config\":{{\"Labels\":{{\"version\":\"4.0.0\"}}}}}}"}},
                           {{"v1Compatibility":"{{}}"}}],
                "signatures":[]}}"#,
            top = "1".repeat(64),
            base = "2".repeat(64)
        );
        let parsed = parse_manifest(manifest.as_bytes(), DOCKER_V2_SCHEMA1_SIGNED_MEDIA_TYPE).unwrap();
        let Manifest::Schema1(m) = parsed.manifest else {
            panic!("expected schema1");
        };

        let info = inspect_schema1(&m).unwrap();
        assert_eq!(info.tag.as_deref(), Some("4.0"));
        assert_eq!(info.labels.get("version").map(String::as_str), Some("4.0.0"));
        assert_eq!(info.architecture.as_deref(), Some("amd64"));
        assert_eq!(info.os.as_deref(), Some("linux"));
        assert_eq!(info.layers[0], format!("sha256:{}", "2".repeat(64)));
    }

    #[test]
    fn test_inspect_image_config_without_container_config() {
        let manifest = format!(
            r#"{{"schemaVersion":2,"config":{{"digest":"sha256:{c}"}},"layers":[{{"digest":"sha256:{l}"}}]}}"#,
            c = "c".repeat(64),
            l = "d".repeat(64)
        );
        let parsed = parse_manifest(manifest.as_bytes(), OCI_MANIFEST_MEDIA_TYPE).unwrap();
        let Manifest::Image(m) = parsed.manifest else {
            panic!("expected image manifest");
        };

        let info = inspect_image_config(&m, ImageConfig::default());
        assert!(info.labels.is_empty());
        assert!(info.env.is_empty());
        assert_eq!(info.layers, vec![format!("sha256:{}", "d".repeat(64))]);
    }
}
