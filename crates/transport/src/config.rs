//! Where unit files live and how fetches behave.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Transport configuration, usually read from `modlink.toml`.
///
/// ```toml
/// base_dir = "modules"
/// extension = "toml"
/// delay_ms = 0
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
	/// Directory unit names are resolved against.
	pub base_dir: PathBuf,
	/// File extension appended to the last name segment. Empty for none.
	pub extension: String,
	/// Simulated latency before each fetch resolves, in milliseconds.
	pub delay_ms: u64,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			base_dir: PathBuf::from("modules"),
			extension: "toml".to_string(),
			delay_ms: 0,
		}
	}
}

impl TransportConfig {
	/// Parses configuration from TOML text. Missing keys keep their defaults.
	pub fn parse(content: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(content)?)
	}

	/// Loads configuration from a file.
	///
	/// A relative `base_dir` is resolved against the file's directory.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		let mut config = Self::parse(&content)?;
		if config.base_dir.is_relative()
			&& let Some(parent) = path.parent()
		{
			config.base_dir = parent.join(&config.base_dir);
		}
		Ok(config)
	}

	/// The configured fetch delay, if any.
	pub fn delay(&self) -> Option<Duration> {
		(self.delay_ms > 0).then(|| Duration::from_millis(self.delay_ms))
	}

	/// Maps a unit name to its file: `<base_dir>/<name>.<extension>`.
	///
	/// `/` in a name selects a subdirectory. Empty, `.` and `..` segments
	/// are rejected so a name can never escape `base_dir`.
	pub fn locate(&self, name: &str) -> Result<PathBuf, ConfigError> {
		let invalid = |reason| ConfigError::InvalidName {
			name: name.to_string(),
			reason,
		};
		if name.is_empty() {
			return Err(invalid("name is empty"));
		}
		if name.contains('\\') {
			return Err(invalid("backslashes are not allowed"));
		}

		let mut path = self.base_dir.clone();
		let mut segments = name.split('/').peekable();
		while let Some(segment) = segments.next() {
			match segment {
				"" => return Err(invalid("empty path segment")),
				"." | ".." => return Err(invalid("relative path segments are not allowed")),
				_ if segments.peek().is_none() && !self.extension.is_empty() => {
					path.push(format!("{segment}.{}", self.extension));
				}
				_ => path.push(segment),
			}
		}
		Ok(path)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn missing_keys_keep_defaults() {
		let config = TransportConfig::parse("delay_ms = 25").unwrap();
		assert_eq!(
			config,
			TransportConfig {
				delay_ms: 25,
				..TransportConfig::default()
			}
		);
		assert_eq!(config.delay(), Some(Duration::from_millis(25)));
		assert_eq!(TransportConfig::default().delay(), None);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = TransportConfig::parse("base_dir = 'x'\nbaseUrl = 'y'").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)), "{err}");
	}

	#[test]
	fn locate_appends_extension_to_the_last_segment() {
		let config = TransportConfig {
			base_dir: PathBuf::from("/srv/units"),
			..TransportConfig::default()
		};
		assert_eq!(config.locate("common").unwrap(), PathBuf::from("/srv/units/common.toml"));
		assert_eq!(config.locate("ui/toolbar").unwrap(), PathBuf::from("/srv/units/ui/toolbar.toml"));

		let bare = TransportConfig {
			extension: String::new(),
			..config
		};
		assert_eq!(bare.locate("ui/toolbar").unwrap(), PathBuf::from("/srv/units/ui/toolbar"));
	}

	#[test]
	fn locate_rejects_names_escaping_the_base_dir() {
		let config = TransportConfig::default();
		for name in ["", "../secret", "a/../b", "/etc/passwd", "a//b", "./a", "a\\b"] {
			assert!(matches!(config.locate(name), Err(ConfigError::InvalidName { .. })), "{name:?} should be rejected");
		}
	}

	#[test]
	fn load_resolves_base_dir_against_the_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("modlink.toml");
		std::fs::write(&path, "base_dir = 'units'\nextension = 'unit'\n").unwrap();

		let config = TransportConfig::load(&path).unwrap();
		assert_eq!(config.base_dir, dir.path().join("units"));
		assert_eq!(config.locate("a").unwrap(), dir.path().join("units").join("a.unit"));
	}

	#[test]
	fn load_reports_the_missing_path() {
		let err = TransportConfig::load("/nonexistent/modlink.toml").unwrap_err();
		assert!(err.to_string().contains("/nonexistent/modlink.toml"), "{err}");
	}
}
