//! Image label inspection library
//!
//! Resolves a container image reference, reads the image's manifest and
//! configuration from its registry, and reports image labels. The binary
//! exposes this as `image-label-inspect inspect <imageReference>`.

pub mod cli;
pub mod common;
pub mod config;
pub mod digest;
pub mod error;
pub mod image;
pub mod logging;
pub mod registry;

pub use config::{AuthConfig, SystemContext};
pub use error::{InspectError, RegistryError, Result};
