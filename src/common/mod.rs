//! Common module - values shared by the transport, image and command layers

pub mod context;

pub use context::Context;
