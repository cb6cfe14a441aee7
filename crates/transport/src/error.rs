//! Error types for transport configuration and unit manifests.

use std::path::PathBuf;

use modlink_loader::UnitName;
use thiserror::Error;

/// Errors loading a [`TransportConfig`](crate::TransportConfig) or mapping names onto it.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The configuration is not valid TOML or has unknown keys.
	#[error("failed to parse transport config: {0}")]
	Parse(#[from] toml::de::Error),

	/// A unit name cannot be mapped to a path below the base directory.
	#[error("unit name `{name}` cannot be located: {reason}")]
	InvalidName {
		/// The offending name.
		name: String,
		/// Why it was rejected.
		reason: &'static str,
	},
}

/// Errors turning a fetched unit file into a definition.
#[derive(Debug, Error)]
pub enum ManifestError {
	/// The unit file could not be read.
	#[error("failed to read {path}: {error}")]
	Io {
		/// Path the unit was expected at.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The unit file is not a valid manifest.
	#[error("invalid manifest for `{name}`: {source}")]
	Parse {
		/// Unit whose manifest failed to parse.
		name: UnitName,
		/// The TOML error.
		source: toml::de::Error,
	},

	/// No manifest is registered under the requested name.
	#[error("no manifest registered for `{0}`")]
	Missing(UnitName),

	/// The name could not be mapped to a file.
	#[error(transparent)]
	Location(#[from] ConfigError),
}
