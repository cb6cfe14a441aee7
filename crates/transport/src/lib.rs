//! Concrete transports for [`modlink_loader`].
//!
//! Units are TOML manifests (see [`manifest`]) resolved by name either from
//! a directory tree ([`DirTransport`]) or from an in-memory table
//! ([`StaticTransport`]). Both produce `serde_json::Value` exports.

pub mod config;
mod dir;
pub mod error;
pub mod manifest;
mod static_transport;

pub use config::TransportConfig;
pub use dir::DirTransport;
pub use error::{ConfigError, ManifestError};
pub use manifest::{ManifestDeps, UnitManifest};
pub use static_transport::StaticTransport;
