//! Transport seam: how a unit name turns into a definition.

use crate::coordinator::{Loader, WeakLoader};
use crate::definition::Definition;
use crate::error::LoadError;
use crate::name::UnitName;

/// Retrieves units on behalf of a [`Loader`].
///
/// The loader calls [`Transport::fetch`] at most once per name. The
/// transport must eventually settle the request: define the unit through
/// [`FetchRequest::define`] and then [`FetchRequest::complete`], or
/// [`FetchRequest::fail`]. Settling may happen synchronously inside
/// `fetch` or later from any task on the loader's thread.
pub trait Transport<V: Clone + 'static> {
	/// Starts fetching `request.name()`.
	fn fetch(&self, request: FetchRequest<V>);
}

impl<V, F> Transport<V> for F
where
	V: Clone + 'static,
	F: Fn(FetchRequest<V>),
{
	fn fetch(&self, request: FetchRequest<V>) {
		self(request)
	}
}

/// One outstanding fetch.
///
/// Settles exactly once: `complete` and `fail` consume the request, and
/// dropping an unsettled request reports a fetch failure so waiters never
/// hang on a transport that lost track of it.
pub struct FetchRequest<V: Clone + 'static> {
	name: UnitName,
	loader: WeakLoader<V>,
	settled: bool,
}

impl<V: Clone + 'static> FetchRequest<V> {
	pub(crate) fn new(name: UnitName, loader: WeakLoader<V>) -> Self {
		Self {
			name,
			loader,
			settled: false,
		}
	}

	/// Name of the unit to fetch.
	pub fn name(&self) -> &UnitName {
		&self.name
	}

	/// Returns the requesting loader, if it is still alive.
	///
	/// Useful when a fetched unit defines additional units besides itself.
	pub fn loader(&self) -> Option<Loader<V>> {
		self.loader.upgrade()
	}

	/// Defines the fetched unit.
	///
	/// A dropped loader makes this a no-op.
	pub fn define(&self, definition: Definition<V>) -> Result<(), LoadError> {
		match self.loader.upgrade() {
			Some(loader) => loader.define(self.name.clone(), definition),
			None => Ok(()),
		}
	}

	/// Reports that the unit's code was delivered and executed.
	///
	/// If that execution never defined the unit, the unit fails with
	/// [`LoadError::UndefinedAfterFetch`].
	pub fn complete(mut self) {
		self.settle(Ok(()));
	}

	/// Reports that the unit could not be delivered.
	pub fn fail(mut self, reason: impl Into<String>) {
		self.settle(Err(reason.into()));
	}

	fn settle(&mut self, outcome: Result<(), String>) {
		self.settled = true;
		if let Some(loader) = self.loader.upgrade() {
			loader.settle_fetch(&self.name, outcome);
		}
	}
}

impl<V: Clone + 'static> Drop for FetchRequest<V> {
	fn drop(&mut self) {
		if !self.settled {
			tracing::debug!(unit = %self.name, "transport.request_dropped");
			self.settle(Err("transport dropped the request".to_string()));
		}
	}
}

impl<V: Clone + 'static> std::fmt::Debug for FetchRequest<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FetchRequest")
			.field("name", &self.name)
			.field("settled", &self.settled)
			.finish_non_exhaustive()
	}
}
