//! Loading manifest graphs through the concrete transports.

use std::path::Path;

use modlink_loader::{LoadError, Loader, UnitStatus};
use modlink_transport::{DirTransport, StaticTransport, TransportConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::task::LocalSet;

fn write(root: &Path, name: &str, text: &str) {
	let path = root.join(format!("{name}.toml"));
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap();
	}
	std::fs::write(path, text).unwrap();
}

fn dir_loader(root: &Path, delay_ms: u64) -> Loader<serde_json::Value> {
	Loader::new(DirTransport::new(TransportConfig {
		base_dir: root.to_path_buf(),
		delay_ms,
		..TransportConfig::default()
	}))
}

#[tokio::test]
async fn directory_graph_loads_with_imports() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "common", "export = 'shared'");
	write(dir.path(), "ui/toolbar", "dependencies = 'common'\n[export]\ntitle = 'Toolbar'\n");

	LocalSet::new()
		.run_until(async {
			let loader = dir_loader(dir.path(), 1);
			let exports = loader.load(["ui/toolbar", "common"]).await.unwrap();
			assert_eq!(
				exports,
				vec![
					json!({
						"name": "ui/toolbar",
						"export": {"title": "Toolbar"},
						"imports": {"common": {"name": "common", "export": "shared", "imports": {}}},
					}),
					json!({"name": "common", "export": "shared", "imports": {}}),
				]
			);
			assert_eq!(loader.status("common"), Some(UnitStatus::Ready));
		})
		.await;
}

#[tokio::test]
async fn concurrent_loads_share_the_directory_fetch() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "a", "dependencies = ['c']");
	write(dir.path(), "b", "dependencies = ['c']");
	write(dir.path(), "c", "export = 1");

	LocalSet::new()
		.run_until(async {
			let loader = dir_loader(dir.path(), 5);
			let first = loader.load(["a"]);
			let second = loader.load(["b", "a"]);
			let (first, second) = tokio::join!(first, second);
			assert_eq!(first.unwrap()[0]["imports"]["c"]["export"], json!(1));
			let second = second.unwrap();
			assert_eq!(second[0]["name"], json!("b"));
			assert_eq!(second[1]["name"], json!("a"));
		})
		.await;
}

#[tokio::test]
async fn missing_file_fails_the_unit_and_its_dependents() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "app", "dependencies = 'absent'");

	LocalSet::new()
		.run_until(async {
			let loader = dir_loader(dir.path(), 0);
			let err = loader.load_one("app").await.unwrap_err();
			assert!(matches!(err, LoadError::DependencyFailed { ref dependency, .. } if dependency == "absent"), "{err}");
			match err.root_cause() {
				LoadError::FetchFailure { name, reason } => {
					assert_eq!(name, "absent");
					assert!(reason.contains("absent.toml"), "{reason}");
				}
				other => panic!("unexpected root cause: {other}"),
			}
		})
		.await;
}

#[tokio::test]
async fn escaping_names_are_refused_before_any_io() {
	let dir = tempfile::tempdir().unwrap();
	LocalSet::new()
		.run_until(async {
			let loader = dir_loader(dir.path(), 0);
			let err = loader.load_one("../outside").await.unwrap_err();
			assert!(err.to_string().contains("cannot be located"), "{err}");
		})
		.await;
}

#[tokio::test]
async fn malformed_manifest_is_a_fetch_failure() {
	let dir = tempfile::tempdir().unwrap();
	write(dir.path(), "broken", "dependencies = [");

	LocalSet::new()
		.run_until(async {
			let loader = dir_loader(dir.path(), 0);
			let err = loader.load_one("broken").await.unwrap_err();
			assert!(matches!(&err, LoadError::FetchFailure { reason, .. } if reason.starts_with("invalid manifest for `broken`")), "{err}");
		})
		.await;
}

#[test]
fn static_transport_settles_synchronously() {
	let transport = StaticTransport::new()
		.with_unit("toolbar", "dependencies = 'common'\nexport = 'bar'")
		.with_unit("common", "export = 'c'");
	let loader = Loader::new(transport);

	let seen = std::rc::Rc::new(std::cell::RefCell::new(None));
	let sink = seen.clone();
	loader.require(["toolbar"], move |result| *sink.borrow_mut() = Some(result));

	let exports = seen.borrow_mut().take().unwrap().unwrap();
	assert_eq!(exports[0]["imports"]["common"]["export"], json!("c"));
	assert_eq!(exports[0]["export"], json!("bar"));
}

#[test]
fn static_transport_reports_unknown_units() {
	let loader = Loader::new(StaticTransport::new());
	let seen = std::rc::Rc::new(std::cell::RefCell::new(None));
	let sink = seen.clone();
	loader.require_one("ghost", move |result| *sink.borrow_mut() = Some(result));

	let err = seen.borrow_mut().take().unwrap().unwrap_err();
	assert_eq!(err.to_string(), "failed to fetch `ghost`: no manifest registered for `ghost`");
}
