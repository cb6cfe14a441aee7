//! Unit manifests: the TOML files a transport delivers.
//!
//! ```toml
//! dependencies = ["common", "ui/icons"]   # or a single string
//!
//! [export]
//! title = "Toolbar"
//! ```
//!
//! Executing a manifest defines the unit. Its export is a JSON object
//! carrying the unit's name, the manifest's `export` value and the exports
//! of its dependencies keyed by name.

use modlink_loader::{Definition, Dependencies, FetchRequest, UnitName};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::ManifestError;

/// Parsed unit file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitManifest {
	/// Units that must be ready before this one is instantiated.
	#[serde(default)]
	pub dependencies: ManifestDeps,
	/// Value exposed to dependents.
	#[serde(default)]
	pub export: Option<toml::Value>,
}

/// `dependencies` accepts a bare string as shorthand for a one-element list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ManifestDeps {
	/// `dependencies = "common"`
	One(String),
	/// `dependencies = ["a", "b"]`
	Many(Vec<String>),
}

impl Default for ManifestDeps {
	fn default() -> Self {
		Self::Many(Vec::new())
	}
}

impl ManifestDeps {
	/// Dependency names in declaration order.
	pub fn names(&self) -> Vec<UnitName> {
		match self {
			Self::One(name) => vec![UnitName::from(name)],
			Self::Many(names) => names.iter().map(UnitName::from).collect(),
		}
	}
}

impl UnitManifest {
	/// Parses the manifest delivered for `name`.
	pub fn parse(name: &UnitName, text: &str) -> Result<Self, ManifestError> {
		toml::from_str(text).map_err(|source| ManifestError::Parse {
			name: name.clone(),
			source,
		})
	}

	/// Turns the manifest into the definition of `name`.
	pub fn into_definition(self, name: UnitName) -> Definition<Value> {
		let dependencies = self.dependencies.names();
		let export = self.export.map_or(Value::Null, to_json);
		let keys = dependencies.clone();
		Definition::new(move |exports: Vec<Value>| {
			let imports = keys.iter().map(UnitName::to_string).zip(exports).collect::<Map<_, _>>();
			json!({
				"name": name.as_str(),
				"export": export,
				"imports": imports,
			})
		})
		.with_dependencies(Dependencies::from(dependencies))
	}
}

/// Executes fetched manifest text: defines the unit, then settles the fetch.
pub(crate) fn execute(request: FetchRequest<Value>, text: &str) {
	let name = request.name().clone();
	let manifest = match UnitManifest::parse(&name, text) {
		Ok(manifest) => manifest,
		Err(error) => {
			warn!(unit = %name, %error, "transport.manifest.invalid");
			request.fail(error.to_string());
			return;
		}
	};
	if let Err(error) = request.define(manifest.into_definition(name.clone())) {
		debug!(unit = %name, %error, "transport.define.rejected");
	}
	request.complete();
}

fn to_json(value: toml::Value) -> Value {
	match value {
		toml::Value::String(text) => Value::String(text),
		toml::Value::Integer(number) => Value::from(number),
		toml::Value::Float(number) => serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number),
		toml::Value::Boolean(flag) => Value::Bool(flag),
		toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
		toml::Value::Array(items) => Value::Array(items.into_iter().map(to_json).collect()),
		toml::Value::Table(table) => Value::Object(table.into_iter().map(|(key, value)| (key, to_json(value))).collect()),
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn parse(text: &str) -> UnitManifest {
		UnitManifest::parse(&"unit".into(), text).unwrap()
	}

	#[test]
	fn dependencies_accept_a_string_or_a_list() {
		assert_eq!(parse("").dependencies.names(), Vec::<UnitName>::new());
		assert_eq!(parse("dependencies = 'common'").dependencies.names(), vec![UnitName::from("common")]);
		assert_eq!(
			parse("dependencies = ['a', 'b']").dependencies.names(),
			vec![UnitName::from("a"), UnitName::from("b")]
		);
	}

	#[test]
	fn definition_declares_manifest_dependencies() {
		let definition = parse("dependencies = ['a', 'b']").into_definition("unit".into());
		assert_eq!(definition.dependencies(), &[UnitName::from("a"), UnitName::from("b")]);
	}

	#[test]
	fn rejects_unknown_keys_and_wrong_types() {
		for text in ["deps = ['a']", "dependencies = 3", "dependencies = [1]", "export ="] {
			let err = UnitManifest::parse(&"bad".into(), text).unwrap_err();
			assert!(err.to_string().starts_with("invalid manifest for `bad`"), "{text}: {err}");
		}
	}

	#[test]
	fn exports_convert_to_json() {
		let manifest = parse("[export]\ntitle = 'Toolbar'\nsize = 3\nratio = 0.5\nenabled = true\ntags = ['x']\n");
		assert_eq!(
			manifest.export.map(to_json),
			Some(json!({"title": "Toolbar", "size": 3, "ratio": 0.5, "enabled": true, "tags": ["x"]}))
		);
	}
}
