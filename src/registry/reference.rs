//! Docker image reference parsing and validation.
//!
//! Handles `name`, `name:tag`, `name@digest`, `registry[:port]/path[:tag]`.
//! Names without a registry resolve to Docker Hub, and single-component
//! Docker Hub names get the `library/` namespace.

use crate::config::DOCKER_HUB_DOMAIN;
use crate::digest::DigestUtils;
use crate::error::{RegistryError, Result};
use std::fmt;

/// API endpoint serving Docker Hub's `docker.io` references
pub const DOCKER_HUB_API_HOST: &str = "registry-1.docker.io";

/// Older Docker Hub name, folded into `docker.io`
const LEGACY_DOCKER_HUB_DOMAIN: &str = "index.docker.io";

pub const DEFAULT_TAG: &str = "latest";

const MAX_NAME_LENGTH: usize = 255;
const MAX_TAG_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerReference {
    domain: String,
    path: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl DockerReference {
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(RegistryError::Parse("image reference is empty".to_string()));
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((name, digest)) => {
                DigestUtils::validate_digest(digest).map_err(|e| {
                    RegistryError::Parse(format!("invalid digest in {}: {}", input, e))
                })?;
                (name, Some(digest.to_string()))
            }
            None => (input, None),
        };

        // A colon after the last slash starts a tag; before it, a port
        let (name, tag) = match without_digest.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') => {
                validate_tag(tag, input)?;
                (name, Some(tag.to_string()))
            }
            _ => (without_digest, None),
        };

        if name.is_empty() {
            return Err(RegistryError::Parse(format!(
                "invalid reference format: {}",
                input
            )));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(RegistryError::Parse(format!(
                "repository name must not be more than {} characters",
                MAX_NAME_LENGTH
            )));
        }

        let (domain, path) = split_domain(name);
        validate_domain(&domain, input)?;
        validate_path(&path, input)?;

        if tag.is_some() && digest.is_some() {
            return Err(RegistryError::Validation(format!(
                "references with both a tag and digest are not supported: {}",
                input
            )));
        }

        let tag = match (&tag, &digest) {
            (None, None) => Some(DEFAULT_TAG.to_string()),
            _ => tag,
        };

        Ok(Self {
            domain,
            path,
            tag,
            digest,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Repository path on the registry, e.g. `library/nginx`
    pub fn repository(&self) -> &str {
        &self.path
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Tag or digest to put in the manifest URL
    pub fn manifest_reference(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(DEFAULT_TAG)
    }

    /// Host serving the registry API for this reference
    pub fn api_host(&self) -> &str {
        if self.domain == DOCKER_HUB_DOMAIN {
            DOCKER_HUB_API_HOST
        } else {
            &self.domain
        }
    }
}

impl fmt::Display for DockerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.path)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

fn split_domain(name: &str) -> (String, String) {
    let (domain, remainder) = match name.split_once('/') {
        Some((first, rest)) if is_domain_component(first) => (first, rest),
        _ => (DOCKER_HUB_DOMAIN, name),
    };
    let domain = if domain == LEGACY_DOCKER_HUB_DOMAIN {
        DOCKER_HUB_DOMAIN
    } else {
        domain
    };

    // Official Docker Hub images live under `library/`
    let remainder = if domain == DOCKER_HUB_DOMAIN && !remainder.contains('/') {
        format!("library/{}", remainder)
    } else {
        remainder.to_string()
    };

    (domain.to_string(), remainder)
}

/// A first path component names a registry if it has a `.` or `:`, is
/// `localhost`, or has uppercase letters (repository paths are lowercase).
fn is_domain_component(first: &str) -> bool {
    first.contains(['.', ':'])
        || first == "localhost"
        || first.chars().any(|c| c.is_ascii_uppercase())
}

fn validate_domain(domain: &str, input: &str) -> Result<()> {
    let invalid = || {
        RegistryError::Parse(format!(
            "invalid registry host {:?} in {}",
            domain, input
        ))
    };

    let (host_ok, port) = match domain.strip_prefix('[') {
        Some(bracketed) => {
            let (address, after) = bracketed.split_once(']').ok_or_else(invalid)?;
            let port = if after.is_empty() {
                None
            } else {
                Some(after.strip_prefix(':').ok_or_else(invalid)?)
            };
            (is_valid_ipv6(address), port)
        }
        None => match domain.rsplit_once(':') {
            Some((host, port)) => (is_valid_hostname(host), Some(port)),
            None => (is_valid_hostname(domain), None),
        },
    };
    let port_ok = port.is_none_or(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));

    if host_ok && port_ok {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn is_valid_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                && !label.starts_with('-')
                && !label.ends_with('-')
        })
}

fn is_valid_ipv6(address: &str) -> bool {
    address.contains(':') && address.parse::<std::net::Ipv6Addr>().is_ok()
}

fn validate_path(path: &str, input: &str) -> Result<()> {
    if path.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(RegistryError::Parse(format!(
            "repository name must be lowercase: {}",
            input
        )));
    }

    for component in path.split('/') {
        if !is_valid_path_component(component) {
            return Err(RegistryError::Parse(format!(
                "invalid repository name component {:?} in {}",
                component, input
            )));
        }
    }
    Ok(())
}

/// `[a-z0-9]+` runs joined by `.`, `_`, `__` or one or more `-`
fn is_valid_path_component(component: &str) -> bool {
    let bytes = component.as_bytes();
    let is_alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last)) if is_alnum(first) && is_alnum(last) => {}
        _ => return false,
    }

    let mut i = 0;
    while i < bytes.len() {
        if is_alnum(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && !is_alnum(bytes[i]) {
            i += 1;
        }
        let separator = &component[start..i];
        let valid = matches!(separator, "." | "_" | "__")
            || separator.chars().all(|c| c == '-');
        if !valid {
            return false;
        }
    }
    true
}

fn validate_tag(tag: &str, input: &str) -> Result<()> {
    let mut chars = tag.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if first_ok && rest_ok && tag.len() <= MAX_TAG_LENGTH {
        Ok(())
    } else {
        Err(RegistryError::Parse(format!(
            "invalid tag {:?} in {}",
            tag, input
        )))
    }
}
