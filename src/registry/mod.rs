//! Registry module for image access
//!
//! This module provides the transport abstraction used by the inspect command
//! and its `docker://` implementation: reference parsing, Docker Registry
//! HTTP API v2 authentication, and manifest/blob retrieval.

pub mod auth;
pub mod docker;
pub mod reference;
pub mod transport;

pub use auth::{Auth, AuthChallenge, Authorization};
pub use docker::{DockerImageSource, DockerTransport, RegistryClientBuilder};
pub use reference::DockerReference;
pub use transport::{BlobInfo, ImageReference, ImageSource, ManifestResponse, Transport};
