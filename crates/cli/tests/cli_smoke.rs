use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn run_modlink(cwd: &Path, args: &[&str]) -> Output {
	Command::new(env!("CARGO_BIN_EXE_modlink"))
		.current_dir(cwd)
		.env_remove("MODLINK_LOG")
		.env_remove("RUST_LOG")
		.args(args)
		.output()
		.expect("modlink should execute")
}

fn stdout_json(output: &Output) -> Value {
	assert!(
		output.status.success(),
		"modlink failed with {:?}\nstderr:\n{}",
		output.status.code(),
		String::from_utf8_lossy(&output.stderr)
	);
	serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn fixture() -> tempfile::TempDir {
	let dir = tempfile::tempdir().unwrap();
	let units = dir.path().join("modules");
	std::fs::create_dir_all(&units).unwrap();
	std::fs::write(units.join("common.toml"), "export = 'shared'\n").unwrap();
	std::fs::write(units.join("toolbar.toml"), "dependencies = 'common'\nexport = { title = 'Toolbar' }\n").unwrap();
	std::fs::write(units.join("broken.toml"), "dependencies = 'absent'\n").unwrap();
	dir
}

#[test]
fn prints_exports_in_requested_order() {
	let dir = fixture();
	let output = run_modlink(dir.path(), &["toolbar", "common"]);
	assert_eq!(
		stdout_json(&output),
		json!([
			{
				"name": "toolbar",
				"export": {"title": "Toolbar"},
				"imports": {"common": {"name": "common", "export": "shared", "imports": {}}},
			},
			{"name": "common", "export": "shared", "imports": {}},
		])
	);
}

#[test]
fn graph_lists_every_unit_touched() {
	let dir = fixture();
	let output = run_modlink(dir.path(), &["--graph", "toolbar"]);
	assert_eq!(
		stdout_json(&output),
		json!([
			{"name": "common", "status": "ready", "dependencies": []},
			{"name": "toolbar", "status": "ready", "dependencies": ["common"]},
		])
	);
}

#[test]
fn config_file_in_the_working_directory_is_used() {
	let dir = fixture();
	std::fs::rename(dir.path().join("modules"), dir.path().join("units")).unwrap();
	std::fs::write(dir.path().join("modlink.toml"), "base_dir = 'units'\n").unwrap();

	let output = run_modlink(dir.path(), &["common"]);
	assert_eq!(stdout_json(&output)[0]["export"], json!("shared"));
}

#[test]
fn failures_exit_nonzero_with_the_cause_chain() {
	let dir = fixture();
	let output = run_modlink(dir.path(), &["broken"]);
	assert!(!output.status.success());
	assert!(output.stdout.is_empty());

	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("error: `broken` depends on `absent`, which failed"), "{stderr}");
	assert!(stderr.contains("caused by: failed to fetch `absent`"), "{stderr}");
}
