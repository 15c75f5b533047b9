//! Image module
//!
//! Turns the raw manifest and config documents served by an
//! [`ImageSource`](crate::registry::ImageSource) into structured image
//! metadata. Supports Docker schema1/schema2, OCI manifests, and manifest
//! lists/indexes (resolved to the instance for the requested platform).

pub mod config;
pub mod inspect;
pub mod manifest;

pub use inspect::{from_unparsed_image, Image, ImageInspectInfo, UnparsedImage};
pub use manifest::{ManifestType, ParsedManifest};
