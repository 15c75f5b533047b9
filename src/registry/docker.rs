//! `docker://` transport: images served by a Docker Registry HTTP API v2 /
//! OCI distribution registry.

use crate::common::Context;
use crate::config::{AuthConfig, SystemContext};
use crate::digest::DigestUtils;
use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{RegistryError, Result};
use crate::image::manifest::manifest_accept_header;
use crate::logging::Logger;
use crate::registry::auth::{Auth, Authorization};
use crate::registry::reference::DockerReference;
use crate::registry::transport::{
    BlobInfo, ImageReference, ImageSource, ManifestResponse, Transport,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Client, StatusCode};

pub const TRANSPORT_NAME: &str = "docker";

const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

#[derive(Debug, Clone)]
pub struct DockerTransport {
    output: Logger,
}

impl DockerTransport {
    pub fn new(output: Logger) -> Self {
        Self { output }
    }
}

impl Transport for DockerTransport {
    fn name(&self) -> &'static str {
        TRANSPORT_NAME
    }

    fn parse_reference(&self, reference: &str) -> Result<Box<dyn ImageReference>> {
        let rest = reference.strip_prefix("//").ok_or_else(|| {
            RegistryError::Parse(format!(
                "docker: image reference {} does not start with //",
                reference
            ))
        })?;
        let reference = DockerReference::parse(rest)?;

        Ok(Box::new(DockerImageReference {
            reference,
            output: self.output.clone(),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct DockerImageReference {
    reference: DockerReference,
    output: Logger,
}

#[async_trait]
impl ImageReference for DockerImageReference {
    fn transport_name(&self) -> &'static str {
        TRANSPORT_NAME
    }

    fn string_within_transport(&self) -> String {
        format!("//{}", self.reference)
    }

    async fn new_image_source(
        &self,
        ctx: &Context,
        sys: &SystemContext,
    ) -> Result<Box<dyn ImageSource>> {
        let source = ctx
            .run(
                "image source open",
                DockerImageSource::open(self.reference.clone(), sys, self.output.clone()),
            )
            .await?;
        Ok(Box::new(source))
    }
}

pub struct RegistryClientBuilder {
    skip_tls: bool,
    user_agent: Option<String>,
}

impl RegistryClientBuilder {
    pub fn new() -> Self {
        Self {
            skip_tls: false,
            user_agent: None,
        }
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.skip_tls = skip_tls;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    pub fn build(self) -> Result<Client> {
        let mut builder = Client::builder();
        if self.skip_tls {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        builder
            .build()
            .map_err(|e| RegistryError::Network(format!("Failed to create HTTP client: {}", e)))
    }
}

impl Default for RegistryClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Open session against one image in a registry
pub struct DockerImageSource {
    client: Client,
    base_url: String,
    reference: DockerReference,
    authorization: Authorization,
    output: Logger,
}

impl DockerImageSource {
    /// Resolve credentials, find the registry endpoint and authorize for pull
    pub async fn open(
        reference: DockerReference,
        sys: &SystemContext,
        output: Logger,
    ) -> Result<Self> {
        let credentials = sys.credentials_for(reference.domain())?;
        let insecure = sys.docker_insecure_skip_tls_verify;

        let client = RegistryClientBuilder::new()
            .with_skip_tls(insecure)
            .with_user_agent(sys.user_agent())
            .build()?;

        let schemes: &[&str] = if insecure { &["https", "http"] } else { &["https"] };
        let auth = Auth::new(client.clone(), output.clone());

        let mut last_error = None;
        for scheme in schemes {
            let base_url = format!("{}://{}", scheme, reference.api_host());
            output.detail(&format!("Pinging registry at {}/v2/", base_url));

            match ping(&client, &base_url).await {
                Ok(outcome) => {
                    let authorization =
                        authorize(&auth, outcome, &reference, credentials.as_ref()).await?;
                    output.verbose(&format!("Opened image source for {}", reference));
                    return Ok(Self {
                        client,
                        base_url,
                        reference,
                        authorization,
                        output,
                    });
                }
                Err(e @ RegistryError::Network(_)) => {
                    if *scheme == "https" && insecure {
                        output.warning(&format!(
                            "{} unreachable over https ({}), retrying over plain http",
                            reference.domain(),
                            e
                        ));
                    } else {
                        output.detail(&format!("Registry ping failed: {}", e));
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            RegistryError::Network(format!("No endpoint reachable for {}", reference.domain()))
        }))
    }

    fn repository_url(&self, kind: &str, reference: &str) -> String {
        format!(
            "{}/v2/{}/{}/{}",
            self.base_url,
            self.reference.repository(),
            kind,
            reference
        )
    }

    async fn fetch_manifest(&self, instance_digest: Option<&str>) -> Result<ManifestResponse> {
        let manifest_ref = instance_digest.unwrap_or(self.reference.manifest_reference());
        let url = self.repository_url("manifests", manifest_ref);
        self.output.detail(&format!("Fetching manifest {}", url));

        let request = self
            .client
            .get(&url)
            .header(ACCEPT, manifest_accept_header());
        let response = self
            .authorization
            .apply(request)
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "manifest fetch"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                &error_text,
                &format!("manifest fetch for {}", self.reference),
            ));
        }

        let content_type = header_value(&response, CONTENT_TYPE.as_str()).unwrap_or_default();
        let digest = header_value(&response, DOCKER_CONTENT_DIGEST);
        let data = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Network(format!("Failed to read manifest response: {}", e)))?
            .to_vec();

        // Manifests addressed by digest must match it
        let expected = instance_digest.or(self.reference.digest());
        if let Some(expected) = expected {
            DigestUtils::verify_data_integrity(&data, expected)?;
        }

        self.output.detail(&format!(
            "Manifest type: {} ({})",
            if content_type.is_empty() { "unknown" } else { content_type.as_str() },
            self.output.format_size(data.len() as u64)
        ));

        Ok(ManifestResponse {
            data,
            content_type,
            digest,
        })
    }

    async fn fetch_blob(&self, info: &BlobInfo) -> Result<Vec<u8>> {
        DigestUtils::validate_digest(&info.digest)?;
        let url = self.repository_url("blobs", &info.digest);
        self.output.detail(&format!(
            "Fetching blob {}",
            DigestUtils::format_digest_short(&info.digest)
        ));

        let response = self
            .authorization
            .apply(self.client.get(&url))
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "blob fetch"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                &error_text,
                &format!("blob fetch for {}", info.digest),
            ));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Network(format!("Failed to read blob response: {}", e)))?
            .to_vec();
        DigestUtils::verify_data_integrity(&data, &info.digest)?;

        Ok(data)
    }
}

#[async_trait]
impl ImageSource for DockerImageSource {
    fn reference(&self) -> String {
        format!("{}://{}", TRANSPORT_NAME, self.reference)
    }

    async fn get_manifest(
        &self,
        ctx: &Context,
        instance_digest: Option<&str>,
    ) -> Result<ManifestResponse> {
        ctx.run("manifest fetch", self.fetch_manifest(instance_digest))
            .await
    }

    async fn get_blob(&self, ctx: &Context, info: &BlobInfo) -> Result<Vec<u8>> {
        ctx.run("blob fetch", self.fetch_blob(info)).await
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.output
            .detail(&format!("Closing image source for {}", self.reference));
        // Dropping the client releases its pooled connections
        drop(self);
        Ok(())
    }
}

enum Ping {
    Open,
    Challenge(Option<String>),
}

async fn ping(client: &Client, base_url: &str) -> Result<Ping> {
    let url = format!("{}/v2/", base_url);
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "registry ping"))?;

    let status = response.status();
    if status.is_success() {
        Ok(Ping::Open)
    } else if status == StatusCode::UNAUTHORIZED {
        Ok(Ping::Challenge(header_value(
            &response,
            WWW_AUTHENTICATE.as_str(),
        )))
    } else {
        let error_text = response.text().await.unwrap_or_default();
        Err(HttpErrorHandler::handle_registry_error(
            status,
            &error_text,
            "registry ping",
        ))
    }
}

async fn authorize(
    auth: &Auth,
    ping: Ping,
    reference: &DockerReference,
    credentials: Option<&AuthConfig>,
) -> Result<Authorization> {
    match ping {
        Ping::Open => Ok(Authorization::Anonymous),
        Ping::Challenge(Some(header)) => match Auth::parse_challenge(&header) {
            Some(challenge) => {
                auth.authorize(&challenge, reference.repository(), credentials)
                    .await
            }
            None => Err(RegistryError::Auth(format!(
                "Unsupported authentication challenge from {}: {}",
                reference.domain(),
                header
            ))),
        },
        Ping::Challenge(None) => Err(RegistryError::Auth(format!(
            "{} requires authentication but sent no challenge",
            reference.domain()
        ))),
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}
