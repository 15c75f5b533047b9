//! Authentication module for Docker registry access
//!
//! Handles the `WWW-Authenticate` challenge returned by `GET /v2/` and the
//! token exchange of the Docker Registry v2 token protocol. Pull tokens are
//! requested anonymously or with basic credentials.

use crate::config::AuthConfig;
use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChallenge {
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
    Basic {
        realm: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Credentials to attach to registry requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Authorization {
    #[default]
    Anonymous,
    Basic(AuthConfig),
    Bearer(String),
}

impl Authorization {
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Authorization::Anonymous => request,
            Authorization::Basic(auth) => request.basic_auth(&auth.username, Some(&auth.password)),
            Authorization::Bearer(token) => request.bearer_auth(token),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Auth {
    client: Client,
    output: Logger,
}

impl Auth {
    pub fn new(client: Client, output: Logger) -> Self {
        Self { client, output }
    }

    /// Parse a `WWW-Authenticate` header value
    pub fn parse_challenge(header: &str) -> Option<AuthChallenge> {
        let header = header.trim();
        let (scheme, params_str) = header.split_once(' ').unwrap_or((header, ""));
        let params = parse_auth_params(params_str);

        if scheme.eq_ignore_ascii_case("bearer") {
            let realm = params.get("realm")?.clone();
            Some(AuthChallenge::Bearer {
                realm,
                service: params.get("service").cloned(),
                scope: params.get("scope").cloned(),
            })
        } else if scheme.eq_ignore_ascii_case("basic") {
            Some(AuthChallenge::Basic {
                realm: params.get("realm").cloned(),
            })
        } else {
            None
        }
    }

    /// Turn a challenge into request credentials for pulling `repository`
    pub async fn authorize(
        &self,
        challenge: &AuthChallenge,
        repository: &str,
        credentials: Option<&AuthConfig>,
    ) -> Result<Authorization> {
        match challenge {
            AuthChallenge::Basic { .. } => {
                let credentials = credentials.ok_or_else(|| {
                    RegistryError::Auth(
                        "Registry requires basic authentication but no credentials are configured"
                            .to_string(),
                    )
                })?;
                self.output.detail("Using basic authentication");
                Ok(Authorization::Basic(credentials.clone()))
            }
            AuthChallenge::Bearer { realm, service, .. } => {
                let scope = format!("repository:{}:pull", repository);
                let token = self
                    .request_token(realm, service.as_deref(), &scope, credentials)
                    .await?;
                Ok(Authorization::Bearer(token))
            }
        }
    }

    pub async fn request_token(
        &self,
        realm: &str,
        service: Option<&str>,
        scope: &str,
        credentials: Option<&AuthConfig>,
    ) -> Result<String> {
        let mut url = Url::parse(realm)
            .map_err(|e| RegistryError::Auth(format!("Invalid token realm {}: {}", realm, e)))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = service {
                query.append_pair("service", service);
            }
            query.append_pair("scope", scope);
        }

        self.output.detail(&format!("Requesting token from: {}", url));

        let mut request = self.client.get(url.as_str());
        if let Some(credentials) = credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "token request"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(HttpErrorHandler::handle_auth_error(status, &error_text));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(format!("Failed to parse token response: {}", e)))?;

        if let Some(expires_in) = token_response.expires_in {
            self.output
                .detail(&format!("Token expires in {} seconds", expires_in));
        }

        token_response
            .token
            .or(token_response.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RegistryError::Auth("Token response contained no token".to_string()))
    }
}

/// Split `key="value", key2=value2` pairs; quoted values may contain commas
fn parse_auth_params(params: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();
    let mut chars = params.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| *c == ',' || c.is_whitespace()) {
            chars.next();
        }

        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.trim().is_empty() {
            break;
        }

        while chars.peek().is_some_and(|c| *c == ' ') {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    c => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
        }

        result.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    result
}
