//! Configuration for registry access
//!
//! [`SystemContext`] carries everything the transport may need besides the
//! reference itself: credentials, TLS policy and the platform to select from
//! multi-arch images. The inspect command always passes the default (empty)
//! context; the fields exist for library callers and tests.

use crate::error::{RegistryError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Registry host name used in references for Docker Hub
pub const DOCKER_HUB_DOMAIN: &str = "docker.io";

/// Authentication configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl AuthConfig {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(RegistryError::Validation(
                "Username cannot be empty".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(RegistryError::Validation(
                "Password cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemContext {
    /// Explicit credentials; take precedence over the auth file
    pub docker_auth_config: Option<AuthConfig>,
    /// Path to a docker `config.json`-style auth file
    pub auth_file_path: Option<PathBuf>,
    /// Skip TLS verification and allow plain HTTP registries
    pub docker_insecure_skip_tls_verify: bool,
    pub os_choice: Option<String>,
    pub architecture_choice: Option<String>,
    pub variant_choice: Option<String>,
    pub user_agent: Option<String>,
}

impl SystemContext {
    /// Resolve credentials for `registry` (a reference domain such as
    /// `quay.io` or `localhost:5000`).
    pub fn credentials_for(&self, registry: &str) -> Result<Option<AuthConfig>> {
        if let Some(auth) = &self.docker_auth_config {
            auth.validate()?;
            return Ok(Some(auth.clone()));
        }

        match &self.auth_file_path {
            Some(path) => AuthFile::load(path)?.credentials_for(registry),
            None => Ok(None),
        }
    }

    /// OS to select from a manifest list
    pub fn os(&self) -> String {
        self.os_choice.clone().unwrap_or_else(|| {
            match std::env::consts::OS {
                "windows" => "windows",
                // Images for other hosts are practically always linux images
                _ => "linux",
            }
            .to_string()
        })
    }

    /// Architecture to select from a manifest list, in the registry's naming
    pub fn architecture(&self) -> String {
        self.architecture_choice
            .clone()
            .unwrap_or_else(|| host_architecture().to_string())
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant_choice.as_deref()
    }

    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(|| {
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        })
    }
}

/// Map the Rust target architecture onto the names used in image configs
pub fn host_architecture() -> &'static str {
    registry_architecture(std::env::consts::ARCH, cfg!(target_endian = "little"))
}

fn registry_architecture(arch: &'static str, little_endian: bool) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" if little_endian => "ppc64le",
        "powerpc64" => "ppc64",
        "mips64" if little_endian => "mips64le",
        other => other,
    }
}

#[derive(Debug, Default, Deserialize)]
struct AuthFileEntry {
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// Parsed docker `config.json`-style auth file
#[derive(Debug, Default, Deserialize)]
pub struct AuthFile {
    #[serde(default)]
    auths: HashMap<String, AuthFileEntry>,
}

impl AuthFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::Io(format!(
                "Failed to read auth file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content).map_err(|e| {
            RegistryError::Parse(format!("Invalid auth file {}: {}", path.display(), e))
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn credentials_for(&self, registry: &str) -> Result<Option<AuthConfig>> {
        let wanted = normalize_auth_key(registry);

        let entry = self
            .auths
            .iter()
            .find(|(key, _)| normalize_auth_key(key) == wanted)
            .map(|(_, entry)| entry);

        match entry {
            Some(entry) => entry.to_auth_config(registry).map(Some),
            None => Ok(None),
        }
    }
}

impl AuthFileEntry {
    fn to_auth_config(&self, registry: &str) -> Result<AuthConfig> {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Ok(AuthConfig::new(username.clone(), password.clone()));
        }

        let encoded = self.auth.as_deref().ok_or_else(|| {
            RegistryError::Parse(format!("Auth entry for {} has no credentials", registry))
        })?;
        let decoded = STANDARD.decode(encoded.trim()).map_err(|e| {
            RegistryError::Parse(format!("Invalid base64 auth for {}: {}", registry, e))
        })?;
        let decoded = String::from_utf8(decoded)?;
        let (username, password) = decoded.split_once(':').ok_or_else(|| {
            RegistryError::Parse(format!(
                "Auth for {} is not in user:password form",
                registry
            ))
        })?;

        Ok(AuthConfig::new(username.to_string(), password.to_string()))
    }
}

/// Reduce an auth file key or a reference domain to a bare host, folding the
/// Docker Hub aliases together.
fn normalize_auth_key(key: &str) -> String {
    let without_scheme = key
        .strip_prefix("https://")
        .or_else(|| key.strip_prefix("http://"))
        .unwrap_or(key);
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);

    match host {
        "index.docker.io" | "registry-1.docker.io" | "registry.hub.docker.com" => {
            DOCKER_HUB_DOMAIN.to_string()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_registry_architecture_names() {
        assert_eq!(registry_architecture("x86_64", true), "amd64");
        assert_eq!(registry_architecture("aarch64", true), "arm64");
        assert_eq!(registry_architecture("powerpc64", true), "ppc64le");
        assert_eq!(registry_architecture("powerpc64", false), "ppc64");
        assert_eq!(registry_architecture("s390x", false), "s390x");
    }

    #[test]
    fn test_default_context_has_no_credentials() {
        let sys = SystemContext::default();
        assert_eq!(sys.credentials_for("quay.io").unwrap(), None);
        assert!(!sys.docker_insecure_skip_tls_verify);
    }

    #[test]
    fn test_explicit_credentials_win() {
        let sys = SystemContext {
            docker_auth_config: Some(AuthConfig::new("alice".into(), "secret".into())),
            auth_file_path: Some(PathBuf::from("/nonexistent/config.json")),
            ..Default::default()
        };
        let creds = sys.credentials_for("quay.io").unwrap().unwrap();
        assert_eq!(creds.username, "alice");
    }

    #[test]
    fn test_empty_explicit_credentials_are_rejected() {
        let sys = SystemContext {
            docker_auth_config: Some(AuthConfig::new("alice".into(), String::new())),
            ..Default::default()
        };
        assert!(matches!(
            sys.credentials_for("quay.io"),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_auth_file_base64_entry() {
        // "bob:hunter2"
        let file = AuthFile::parse(r#"{"auths":{"quay.io":{"auth":"Ym9iOmh1bnRlcjI="}}}"#).unwrap();
        let creds = file.credentials_for("quay.io").unwrap().unwrap();
        assert_eq!(creds, AuthConfig::new("bob".into(), "hunter2".into()));
        assert_eq!(file.credentials_for("ghcr.io").unwrap(), None);
    }

    #[test]
    fn test_auth_file_docker_hub_alias() {
        let file = AuthFile::parse(
            r#"{"auths":{"https://index.docker.io/v1/":{"username":"carol","password":"pw"}}}"#,
        )
        .unwrap();
        let creds = file.credentials_for("docker.io").unwrap().unwrap();
        assert_eq!(creds.username, "carol");
    }

    #[test]
    fn test_auth_file_malformed_entry() {
        let file = AuthFile::parse(r#"{"auths":{"quay.io":{"auth":"bm9jb2xvbg=="}}}"#).unwrap();
        assert!(matches!(
            file.credentials_for("quay.io"),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn test_auth_file_loaded_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"auths":{{"localhost:5000":{{"auth":"Ym9iOmh1bnRlcjI="}}}}}}"#).unwrap();

        let sys = SystemContext {
            auth_file_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let creds = sys.credentials_for("localhost:5000").unwrap().unwrap();
        assert_eq!(creds.password, "hunter2");
    }

    #[test]
    fn test_missing_auth_file_is_io_error() {
        let sys = SystemContext {
            auth_file_path: Some(PathBuf::from("/nonexistent/auth.json")),
            ..Default::default()
        };
        assert!(matches!(sys.credentials_for("quay.io"), Err(RegistryError::Io(_))));
    }

    #[test]
    fn test_platform_choice() {
        let sys = SystemContext {
            os_choice: Some("linux".into()),
            architecture_choice: Some("arm64".into()),
            variant_choice: Some("v8".into()),
            ..Default::default()
        };
        assert_eq!(sys.os(), "linux");
        assert_eq!(sys.architecture(), "arm64");
        assert_eq!(sys.variant(), Some("v8"));
        assert!(!SystemContext::default().architecture().is_empty());
    }
}
