//! Content digest utilities
//!
//! Computing, validating and verifying the `algorithm:hex` digests that
//! registries use to address manifests and blobs.

use crate::error::{RegistryError, Result};
use sha2::{Digest, Sha256, Sha512};

/// Utilities for working with content digests
pub struct DigestUtils;

impl DigestUtils {
    /// Compute SHA256 digest from byte data
    pub fn compute_sha256(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Compute full digest (with sha256: prefix) from byte data
    pub fn compute_docker_digest(data: &[u8]) -> String {
        format!("sha256:{}", Self::compute_sha256(data))
    }

    /// Validate SHA256 hex string (64 lowercase hex characters)
    pub fn is_valid_sha256_hex(digest: &str) -> bool {
        digest.len() == 64
            && digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    /// Validate full digest format (sha256:xxxxx)
    pub fn is_valid_docker_digest(digest: &str) -> bool {
        digest
            .strip_prefix("sha256:")
            .is_some_and(Self::is_valid_sha256_hex)
    }

    /// Validate an `algorithm:encoded` digest. Known algorithms must carry an
    /// encoded part of the right length.
    pub fn validate_digest(digest: &str) -> Result<()> {
        let (algorithm, encoded) = digest.split_once(':').ok_or_else(|| {
            RegistryError::Validation(format!("Digest missing algorithm prefix: {}", digest))
        })?;

        let algorithm_ok = !algorithm.is_empty()
            && algorithm
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c));
        if !algorithm_ok {
            return Err(RegistryError::Validation(format!(
                "Invalid digest algorithm: {}",
                digest
            )));
        }

        let expected_len = match algorithm {
            "sha256" => Some(64),
            "sha512" => Some(128),
            _ => None,
        };
        let hex_ok = encoded.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        let len_ok = expected_len.map_or(encoded.len() >= 32, |len| encoded.len() == len);

        if !hex_ok || !len_ok {
            return Err(RegistryError::Validation(format!(
                "Invalid {} digest: {}",
                algorithm, digest
            )));
        }

        Ok(())
    }

    /// Verify data matches expected digest
    pub fn verify_data_integrity(data: &[u8], expected_digest: &str) -> Result<()> {
        Self::validate_digest(expected_digest)?;

        let computed = match expected_digest.split_once(':') {
            Some(("sha256", _)) => Self::compute_docker_digest(data),
            Some(("sha512", _)) => format!("sha512:{}", hex::encode(Sha512::digest(data))),
            _ => {
                return Err(RegistryError::Unsupported(format!(
                    "Digest algorithm of {} cannot be verified",
                    expected_digest
                )));
            }
        };

        if computed != expected_digest {
            return Err(RegistryError::DigestMismatch {
                expected: expected_digest.to_string(),
                actual: computed,
            });
        }

        Ok(())
    }

    /// Format digest for display (truncated for readability)
    pub fn format_digest_short(digest: &str) -> String {
        if digest.len() > 19 {
            format!("{}...", &digest[..19])
        } else {
            digest.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_DIGEST: &str =
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_compute_sha256() {
        let digest = DigestUtils::compute_sha256(b"hello world");
        assert_eq!(digest, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }

    #[test]
    fn test_compute_docker_digest() {
        assert_eq!(DigestUtils::compute_docker_digest(b"hello world"), HELLO_DIGEST);
    }

    #[test]
    fn test_validate_digest() {
        assert!(DigestUtils::is_valid_docker_digest(HELLO_DIGEST));
        assert!(!DigestUtils::is_valid_docker_digest("sha256:invalid"));
        assert!(!DigestUtils::is_valid_docker_digest(&HELLO_DIGEST.to_uppercase()));
        assert!(DigestUtils::validate_digest(HELLO_DIGEST).is_ok());
        assert!(DigestUtils::validate_digest("b94d27b9934d3e08").is_err());
        assert!(DigestUtils::validate_digest("sha256:abc").is_err());
        assert!(DigestUtils::validate_digest("Sha256:abc").is_err());
    }

    #[test]
    fn test_verify_data_integrity() {
        assert!(DigestUtils::verify_data_integrity(b"hello world", HELLO_DIGEST).is_ok());

        let wrong = "sha256:0000000000000000000000000000000000000000000000000000000000000000";
        match DigestUtils::verify_data_integrity(b"hello world", wrong) {
            Err(RegistryError::DigestMismatch { expected, actual }) => {
                assert_eq!(expected, wrong);
                assert_eq!(actual, HELLO_DIGEST);
            }
            other => panic!("expected digest mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_format_digest_short() {
        assert_eq!(DigestUtils::format_digest_short(HELLO_DIGEST), "sha256:b94d27b9934d...");
        assert_eq!(DigestUtils::format_digest_short("sha256:ab"), "sha256:ab");
    }
}
