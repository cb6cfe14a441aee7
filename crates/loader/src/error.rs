//! Load failures.

use thiserror::Error;

use crate::name::UnitName;

/// Why a unit could not be defined or loaded.
///
/// Cloneable because one failure fans out to every requester waiting on the
/// failed unit and on everything depending on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
	/// A second definition was registered for an already defined unit.
	#[error("unit `{name}` is already defined")]
	DuplicateDefinition {
		/// The unit defined twice.
		name: UnitName,
	},

	/// The definition was rejected during validation.
	#[error("invalid definition for `{name}`: {reason}")]
	InvalidDefinition {
		/// The unit whose definition was rejected.
		name: UnitName,
		/// What was wrong with it.
		reason: String,
	},

	/// The transport could not deliver the unit.
	#[error("failed to fetch `{name}`: {reason}")]
	FetchFailure {
		/// The unit being fetched.
		name: UnitName,
		/// Transport-provided description.
		reason: String,
	},

	/// The transport reported success but the unit was never defined.
	#[error("`{name}` was fetched but never defined")]
	UndefinedAfterFetch {
		/// The unit that stayed undefined.
		name: UnitName,
	},

	/// Resolving the unit would wait on itself.
	#[error("cyclic dependency: {}", render_cycle(cycle))]
	CyclicDependency {
		/// The cycle, starting and ending with the unit that closed it.
		cycle: Vec<UnitName>,
	},

	/// A dependency of the unit failed.
	#[error("`{name}` depends on `{dependency}`, which failed")]
	DependencyFailed {
		/// The unit that could not be instantiated.
		name: UnitName,
		/// The failed dependency.
		dependency: UnitName,
		/// The dependency's own failure.
		source: Box<LoadError>,
	},

	/// The loader was dropped while the request was still outstanding.
	#[error("loader dropped before the request resolved")]
	Abandoned,
}

impl LoadError {
	/// Returns the unit this failure is about.
	pub fn unit(&self) -> Option<&UnitName> {
		match self {
			Self::DuplicateDefinition { name }
			| Self::InvalidDefinition { name, .. }
			| Self::FetchFailure { name, .. }
			| Self::UndefinedAfterFetch { name }
			| Self::DependencyFailed { name, .. } => Some(name),
			Self::CyclicDependency { cycle } => cycle.first(),
			Self::Abandoned => None,
		}
	}

	/// Follows [`LoadError::DependencyFailed`] links down to the original failure.
	pub fn root_cause(&self) -> &LoadError {
		let mut error = self;
		while let Self::DependencyFailed { source, .. } = error {
			error = &**source;
		}
		error
	}
}

fn render_cycle(cycle: &[UnitName]) -> String {
	cycle.iter().map(UnitName::as_str).collect::<Vec<_>>().join(" -> ")
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;
