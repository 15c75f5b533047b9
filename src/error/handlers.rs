//! Standardized mapping of registry HTTP failures onto [`RegistryError`]

use crate::error::RegistryError;
use reqwest::StatusCode;

/// Standard error handler for HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Handle registry-related HTTP errors for pull operations
    pub fn handle_registry_error(
        status: StatusCode,
        error_text: &str,
        operation: &str,
    ) -> RegistryError {
        let error_text = Self::summarize_body(error_text);
        match status.as_u16() {
            401 => RegistryError::Auth(format!(
                "Unauthorized to perform {}: {}",
                operation, error_text
            )),
            403 => RegistryError::Auth(format!(
                "Forbidden: insufficient permissions for {}: {}",
                operation, error_text
            )),
            404 => RegistryError::NotFound(format!("{}: {}", operation, error_text)),
            429 => RegistryError::Registry(format!(
                "Rate limited during {}: {}",
                operation, error_text
            )),
            500 => RegistryError::Registry(format!(
                "Registry server error during {}: {}",
                operation, error_text
            )),
            502 | 503 => RegistryError::Registry(format!(
                "Registry unavailable for {}: {}",
                operation, error_text
            )),
            _ => RegistryError::Registry(format!(
                "{} failed (status {}): {}",
                operation, status, error_text
            )),
        }
    }

    /// Handle token endpoint HTTP errors
    pub fn handle_auth_error(status: StatusCode, error_text: &str) -> RegistryError {
        let error_msg = match status.as_u16() {
            400 => "Invalid token request parameters".to_string(),
            401 => "Invalid credentials provided".to_string(),
            403 => "Access denied - insufficient permissions".to_string(),
            404 => "Authentication endpoint not found".to_string(),
            _ => format!(
                "Authentication failed (status {}): {}",
                status,
                Self::summarize_body(error_text)
            ),
        };

        RegistryError::Auth(error_msg)
    }

    /// Registries answer with `{"errors":[{"code":..,"message":..}]}`; keep the
    /// messages, fall back to the raw body.
    fn summarize_body(error_text: &str) -> String {
        let parsed: Option<serde_json::Value> = serde_json::from_str(error_text).ok();
        let messages: Vec<String> = parsed
            .as_ref()
            .and_then(|v| v.get("errors"))
            .and_then(|e| e.as_array())
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| {
                        let code = e.get("code").and_then(|c| c.as_str()).unwrap_or("UNKNOWN");
                        e.get("message")
                            .and_then(|m| m.as_str())
                            .map(|m| format!("{}: {}", code, m))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if messages.is_empty() {
            error_text.trim().to_string()
        } else {
            messages.join("; ")
        }
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> RegistryError {
        if error.is_timeout() {
            RegistryError::Network(format!("{} timeout: {}", context, error))
        } else if error.is_connect() {
            RegistryError::Network(format!("Connection error during {}: {}", context, error))
        } else if error.to_string().contains("dns") {
            RegistryError::Network(format!("DNS resolution error for {}: {}", context, error))
        } else if error.to_string().contains("certificate") {
            RegistryError::Network(format!(
                "TLS certificate error during {}: {}",
                context, error
            ))
        } else {
            RegistryError::Network(format!("{} network error: {}", context, error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = HttpErrorHandler::handle_registry_error(
            StatusCode::NOT_FOUND,
            r#"{"errors":[{"code":"MANIFEST_UNKNOWN","message":"manifest unknown"}]}"#,
            "manifest fetch",
        );
        assert_eq!(
            err,
            RegistryError::NotFound("manifest fetch: MANIFEST_UNKNOWN: manifest unknown".to_string())
        );
    }

    #[test]
    fn test_unauthorized_maps_to_auth() {
        let err = HttpErrorHandler::handle_registry_error(StatusCode::UNAUTHORIZED, "denied", "blob fetch");
        assert!(matches!(err, RegistryError::Auth(_)));
    }

    #[test]
    fn test_plain_body_is_kept() {
        let err = HttpErrorHandler::handle_registry_error(StatusCode::BAD_GATEWAY, " upstream down\n", "ping");
        assert_eq!(
            err,
            RegistryError::Registry("Registry unavailable for ping: upstream down".to_string())
        );
    }
}
