//! Transport abstraction for image access
//!
//! A [`Transport`] turns a reference string into an [`ImageReference`]; the
//! reference opens an [`ImageSource`], a session against one image from which
//! manifests and blobs are read. Everything above this module (image parsing,
//! the inspect command) talks to these traits only.

use crate::common::Context;
use crate::config::SystemContext;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Manifest bytes as served by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestResponse {
    pub data: Vec<u8>,
    pub content_type: String,
    pub digest: Option<String>,
}

/// Descriptor of a blob to fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub digest: String,
    pub size: Option<u64>,
    pub media_type: Option<String>,
}

impl BlobInfo {
    pub fn new(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            size: None,
            media_type: None,
        }
    }
}

pub trait Transport: Send + Sync {
    /// Transport prefix, e.g. `docker`
    fn name(&self) -> &'static str;

    /// Parse the transport-specific part of a reference (for `docker`,
    /// the `//registry/repo:tag` form). Never touches the network.
    fn parse_reference(&self, reference: &str) -> Result<Box<dyn ImageReference>>;
}

#[async_trait]
pub trait ImageReference: Send + Sync + fmt::Debug {
    fn transport_name(&self) -> &'static str;

    /// Reference in the transport's own syntax, without the transport prefix
    fn string_within_transport(&self) -> String;

    /// Open a session against the referenced image. The returned source
    /// must be released with [`ImageSource::close`].
    async fn new_image_source(
        &self,
        ctx: &Context,
        sys: &SystemContext,
    ) -> Result<Box<dyn ImageSource>>;
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Reference this source was opened for, for diagnostics
    fn reference(&self) -> String;

    /// Fetch the manifest of the image, or of one instance of a manifest
    /// list when `instance_digest` is given.
    async fn get_manifest(
        &self,
        ctx: &Context,
        instance_digest: Option<&str>,
    ) -> Result<ManifestResponse>;

    /// Fetch a blob and verify it against its digest
    async fn get_blob(&self, ctx: &Context, info: &BlobInfo) -> Result<Vec<u8>>;

    /// Release the session. Consumes the source, so it runs at most once.
    fn close(self: Box<Self>) -> Result<()>;
}
