//! Unit identifiers.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Name of a loadable unit.
///
/// Cheap to clone; compares and hashes like the underlying string so maps
/// keyed by `UnitName` can be queried with `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitName(Arc<str>);

impl UnitName {
	/// Creates a unit name.
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self(name.into())
	}

	/// Returns the name as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns true for the empty name, which no unit may carry.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for UnitName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for UnitName {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for UnitName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<&str> for UnitName {
	fn from(name: &str) -> Self {
		Self(Arc::from(name))
	}
}

impl From<String> for UnitName {
	fn from(name: String) -> Self {
		Self(Arc::from(name))
	}
}

impl From<&String> for UnitName {
	fn from(name: &String) -> Self {
		Self(Arc::from(name.as_str()))
	}
}

impl From<&UnitName> for UnitName {
	fn from(name: &UnitName) -> Self {
		name.clone()
	}
}

impl PartialEq<str> for UnitName {
	fn eq(&self, other: &str) -> bool {
		&*self.0 == other
	}
}

impl PartialEq<&str> for UnitName {
	fn eq(&self, other: &&str) -> bool {
		&*self.0 == *other
	}
}
