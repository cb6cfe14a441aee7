//! Filesystem transport.

use std::rc::Rc;

use modlink_loader::{FetchRequest, Transport};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::TransportConfig;
use crate::error::ManifestError;
use crate::manifest;

/// Fetches unit manifests from a directory tree.
///
/// Each fetch runs as a [`tokio::task::spawn_local`] task, so the loader
/// using this transport must be driven from inside a `LocalSet`.
#[derive(Debug, Clone)]
pub struct DirTransport {
	config: Rc<TransportConfig>,
}

impl DirTransport {
	/// Creates a transport reading below `config.base_dir`.
	pub fn new(config: TransportConfig) -> Self {
		Self { config: Rc::new(config) }
	}

	/// The configuration this transport resolves names with.
	pub fn config(&self) -> &TransportConfig {
		&self.config
	}
}

impl Transport<Value> for DirTransport {
	fn fetch(&self, request: FetchRequest<Value>) {
		let config = Rc::clone(&self.config);
		tokio::task::spawn_local(async move {
			let name = request.name().clone();
			let path = match config.locate(name.as_str()) {
				Ok(path) => path,
				Err(error) => {
					warn!(unit = %name, %error, "transport.locate.failed");
					request.fail(ManifestError::from(error).to_string());
					return;
				}
			};
			debug!(unit = %name, path = %path.display(), "transport.fetch");

			if let Some(delay) = config.delay() {
				trace!(unit = %name, ?delay, "transport.fetch.delay");
				tokio::time::sleep(delay).await;
			}

			match tokio::fs::read_to_string(&path).await {
				Ok(text) => manifest::execute(request, &text),
				Err(error) => {
					let error = ManifestError::Io { path, error };
					debug!(unit = %name, %error, "transport.fetch.failed");
					request.fail(error.to_string());
				}
			}
		});
	}
}
