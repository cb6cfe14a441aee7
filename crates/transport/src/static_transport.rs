//! In-memory transport.

use std::collections::HashMap;

use modlink_loader::{FetchRequest, Transport, UnitName};
use serde_json::Value;
use tracing::debug;

use crate::error::ManifestError;
use crate::manifest;

/// Serves manifests from a fixed in-memory table.
///
/// Fetches settle synchronously, inside the require that triggered them.
#[derive(Debug, Clone, Default)]
pub struct StaticTransport {
	units: HashMap<UnitName, String>,
}

impl StaticTransport {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds the manifest text for `name`, replacing any previous one.
	#[must_use]
	pub fn with_unit(mut self, name: impl Into<UnitName>, manifest: impl Into<String>) -> Self {
		self.insert(name, manifest);
		self
	}

	/// Adds the manifest text for `name`, replacing any previous one.
	pub fn insert(&mut self, name: impl Into<UnitName>, manifest: impl Into<String>) {
		self.units.insert(name.into(), manifest.into());
	}

	/// Number of registered manifests.
	pub fn len(&self) -> usize {
		self.units.len()
	}

	/// Whether the table is empty.
	pub fn is_empty(&self) -> bool {
		self.units.is_empty()
	}
}

impl Transport<Value> for StaticTransport {
	fn fetch(&self, request: FetchRequest<Value>) {
		match self.units.get(request.name().as_str()) {
			Some(text) => {
				debug!(unit = %request.name(), "transport.fetch");
				manifest::execute(request, text);
			}
			None => {
				let error = ManifestError::Missing(request.name().clone());
				debug!(%error, "transport.fetch.failed");
				request.fail(error.to_string());
			}
		}
	}
}
