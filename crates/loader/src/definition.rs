//! Unit definitions: dependency list plus factory.

use std::fmt;

use crate::name::UnitName;

/// Deferred computation producing a unit's export.
///
/// Receives the exports of the unit's declared dependencies, in declaration
/// order. Runs at most once.
pub type Factory<V> = Box<dyn FnOnce(Vec<V>) -> V>;

/// Ordered dependency list of a unit.
///
/// Converts from a single name (a one-element list) or from any sequence of
/// names, so definitions never dispatch on argument count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies(Vec<UnitName>);

impl Dependencies {
	/// Returns an empty dependency list.
	pub fn none() -> Self {
		Self::default()
	}

	/// Returns the dependency names in declaration order.
	pub fn as_slice(&self) -> &[UnitName] {
		&self.0
	}

	/// Consumes the list.
	pub fn into_vec(self) -> Vec<UnitName> {
		self.0
	}
}

impl From<&str> for Dependencies {
	fn from(name: &str) -> Self {
		Self(vec![name.into()])
	}
}

impl From<String> for Dependencies {
	fn from(name: String) -> Self {
		Self(vec![name.into()])
	}
}

impl From<UnitName> for Dependencies {
	fn from(name: UnitName) -> Self {
		Self(vec![name])
	}
}

impl<T: Into<UnitName>> From<Vec<T>> for Dependencies {
	fn from(names: Vec<T>) -> Self {
		Self(names.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<UnitName>, const N: usize> From<[T; N]> for Dependencies {
	fn from(names: [T; N]) -> Self {
		Self(names.into_iter().map(Into::into).collect())
	}
}

impl<T: Clone + Into<UnitName>> From<&[T]> for Dependencies {
	fn from(names: &[T]) -> Self {
		Self(names.iter().cloned().map(Into::into).collect())
	}
}

impl<T: Into<UnitName>> FromIterator<T> for Dependencies {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		Self(iter.into_iter().map(Into::into).collect())
	}
}

/// Everything a unit declares about itself: dependencies and factory.
///
/// ```
/// use modlink_loader::Definition;
///
/// let toolbar: Definition<String> = Definition::new(|deps: Vec<String>| format!("toolbar+{}", deps[0]))
/// 	.with_dependencies("common");
/// assert_eq!(toolbar.dependencies().len(), 1);
/// ```
pub struct Definition<V> {
	dependencies: Dependencies,
	factory: Factory<V>,
}

impl<V> Definition<V> {
	/// Creates a dependency-free definition around `factory`.
	pub fn new(factory: impl FnOnce(Vec<V>) -> V + 'static) -> Self {
		Self {
			dependencies: Dependencies::none(),
			factory: Box::new(factory),
		}
	}

	/// Creates a dependency-free definition exporting `value`.
	pub fn value(value: V) -> Self
	where
		V: 'static,
	{
		Self::new(move |_| value)
	}

	/// Replaces the dependency list.
	#[must_use]
	pub fn with_dependencies(mut self, dependencies: impl Into<Dependencies>) -> Self {
		self.dependencies = dependencies.into();
		self
	}

	/// Returns the declared dependencies.
	pub fn dependencies(&self) -> &[UnitName] {
		self.dependencies.as_slice()
	}

	pub(crate) fn into_parts(self) -> (Vec<UnitName>, Factory<V>) {
		(self.dependencies.into_vec(), self.factory)
	}
}

impl<V> fmt::Debug for Definition<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Definition")
			.field("dependencies", &self.dependencies)
			.finish_non_exhaustive()
	}
}
