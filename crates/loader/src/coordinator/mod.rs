//! Load coordination: the only place unit state changes.
//!
//! # Lifecycle
//!
//! Each unit moves monotonically through
//! `NotRequested → Fetching → Defined → ResolvingDeps → Ready`, or into the
//! terminal `Failed`. A unit defined before anyone asked for it skips
//! `Fetching`.
//!
//! # Single-flight fetches
//!
//! Only the `NotRequested → Fetching` transition calls the transport. Every
//! other require while the unit is in flight just queues its continuation,
//! which is flushed once, in FIFO order, when the unit settles.
//!
//! # Re-entrancy
//!
//! The registry borrow is always released before factories, continuations
//! or the transport run. Any of them may require or define other units; a
//! factory defining its own name gets [`LoadError::DuplicateDefinition`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::definition::Definition;
use crate::error::LoadError;
use crate::future::LoadFuture;
use crate::name::UnitName;
use crate::registry::{Callback, ModuleRegistry, Registered, UnitSnapshot, UnitState, UnitStatus};
use crate::resolver::{self, Unresolved};
use crate::transport::{FetchRequest, Transport};

struct LoaderInner<V: Clone + 'static> {
	registry: RefCell<ModuleRegistry<V>>,
	transport: Box<dyn Transport<V>>,
}

/// Handle to a unit loader.
///
/// Clones share the same registry. The loader is single-threaded; drive
/// asynchronous transports from a `tokio::task::LocalSet` or another
/// executor on the same thread.
pub struct Loader<V: Clone + 'static> {
	inner: Rc<LoaderInner<V>>,
}

impl<V: Clone + 'static> Clone for Loader<V> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<V: Clone + 'static> std::fmt::Debug for Loader<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Loader")
			.field("units", &self.inner.registry.borrow().snapshot().len())
			.finish_non_exhaustive()
	}
}

/// Non-owning loader handle held by fetches and in-flight resolutions.
pub(crate) struct WeakLoader<V: Clone + 'static>(Weak<LoaderInner<V>>);

impl<V: Clone + 'static> WeakLoader<V> {
	pub(crate) fn upgrade(&self) -> Option<Loader<V>> {
		self.0.upgrade().map(|inner| Loader { inner })
	}
}

/// What a require has to do once the registry borrow is released.
enum Admission<V> {
	Settled(Result<V, LoadError>, Callback<V>),
	Fetch,
	Resolve,
	Queued,
}

impl<V: Clone + 'static> Loader<V> {
	/// Creates a loader fetching undefined units through `transport`.
	pub fn new(transport: impl Transport<V> + 'static) -> Self {
		Self {
			inner: Rc::new(LoaderInner {
				registry: RefCell::new(ModuleRegistry::default()),
				transport: Box::new(transport),
			}),
		}
	}

	/// Registers the definition of `name`.
	///
	/// Fails with [`LoadError::DuplicateDefinition`] if `name` is already
	/// defined; the first definition stays authoritative. If the unit is
	/// being waited on, dependency resolution starts right away.
	pub fn define(&self, name: impl Into<UnitName>, definition: Definition<V>) -> Result<(), LoadError> {
		let name = name.into();
		let registered = self.inner.registry.borrow_mut().register(&name, definition);
		match registered {
			Ok(Registered::Idle) => {
				debug!(unit = %name, "loader.define");
				Ok(())
			}
			Ok(Registered::Awaited) => {
				debug!(unit = %name, "loader.define");
				self.begin_resolution(&name);
				Ok(())
			}
			Err(error @ LoadError::InvalidDefinition { .. }) => {
				warn!(unit = %name, %error, "loader.define.invalid");
				self.fail(&name, error.clone());
				Err(error)
			}
			Err(error) => {
				warn!(unit = %name, %error, "loader.define.rejected");
				Err(error)
			}
		}
	}

	/// Defines a dependency-free unit exporting `value`.
	pub fn define_value(&self, name: impl Into<UnitName>, value: V) -> Result<(), LoadError> {
		self.define(name, Definition::value(value))
	}

	/// Requests several units.
	///
	/// `callback` runs exactly once: with the exports in the order of
	/// `names` (repeated names repeat their export), or with the first
	/// failure among them. If every name is already ready it runs before
	/// this call returns.
	pub fn require<I, N, F>(&self, names: I, callback: F)
	where
		I: IntoIterator<Item = N>,
		N: Into<UnitName>,
		F: FnOnce(Result<Vec<V>, LoadError>) + 'static,
	{
		let names: Vec<UnitName> = names.into_iter().map(Into::into).collect();
		trace!(count = names.len(), "loader.require");
		let continuation = move |result: Result<Vec<V>, Unresolved>| callback(result.map_err(|unresolved| unresolved.error));
		resolver::require_all(self, names, Box::new(continuation));
	}

	/// Requests one unit; `callback` receives its export or its failure.
	pub fn require_one<F>(&self, name: impl Into<UnitName>, callback: F)
	where
		F: FnOnce(Result<V, LoadError>) + 'static,
	{
		self.require_unit(name.into(), Box::new(callback));
	}

	/// Future form of [`Loader::require`].
	///
	/// The request is issued immediately, not on first poll.
	pub fn load<I, N>(&self, names: I) -> LoadFuture<Vec<V>>
	where
		I: IntoIterator<Item = N>,
		N: Into<UnitName>,
	{
		let (sender, receiver) = oneshot::channel();
		self.require(names, move |result| {
			let _ = sender.send(result);
		});
		LoadFuture::new(receiver)
	}

	/// Future form of [`Loader::require_one`].
	pub fn load_one(&self, name: impl Into<UnitName>) -> LoadFuture<V> {
		let (sender, receiver) = oneshot::channel();
		self.require_one(name, move |result| {
			let _ = sender.send(result);
		});
		LoadFuture::new(receiver)
	}

	/// Returns the status of `name`, if the loader has seen it.
	pub fn status(&self, name: &str) -> Option<UnitStatus> {
		self.inner.registry.borrow().get(name).map(|record| record.status())
	}

	/// Whether a definition for `name` has been registered.
	pub fn is_defined(&self, name: &str) -> bool {
		self.inner.registry.borrow().get(name).is_some_and(|record| record.is_defined())
	}

	/// Returns the export of `name` if it is ready.
	pub fn export(&self, name: &str) -> Option<V> {
		match &self.inner.registry.borrow().get(name)?.state {
			UnitState::Ready(export) => Some(export.clone()),
			_ => None,
		}
	}

	/// Returns every known unit, sorted by name.
	pub fn snapshot(&self) -> Vec<UnitSnapshot> {
		self.inner.registry.borrow().snapshot()
	}

	pub(crate) fn downgrade(&self) -> WeakLoader<V> {
		WeakLoader(Rc::downgrade(&self.inner))
	}

	/// Waits for a single unit, driving it forward if nobody else has.
	pub(crate) fn require_unit(&self, name: UnitName, callback: Callback<V>) {
		let admission = {
			let mut registry = self.inner.registry.borrow_mut();
			let record = registry.lookup(&name);
			match record.outcome() {
				Some(outcome) => Admission::Settled(outcome, callback),
				None => {
					record.pending.push(callback);
					match record.status() {
						UnitStatus::NotRequested => {
							record.state = UnitState::Fetching;
							Admission::Fetch
						}
						UnitStatus::Defined => Admission::Resolve,
						_ => Admission::Queued,
					}
				}
			}
		};

		match admission {
			Admission::Settled(outcome, callback) => {
				trace!(unit = %name, ok = outcome.is_ok(), "loader.require.settled");
				callback(outcome);
			}
			Admission::Fetch => {
				debug!(unit = %name, "loader.fetch");
				self.inner.transport.fetch(FetchRequest::new(name, self.downgrade()));
			}
			Admission::Resolve => self.begin_resolution(&name),
			Admission::Queued => trace!(unit = %name, "loader.require.queued"),
		}
	}

	/// `Defined → ResolvingDeps`, or `Failed` if the wait would be circular.
	fn begin_resolution(&self, name: &UnitName) {
		let plan = {
			let mut registry = self.inner.registry.borrow_mut();
			match registry.find_cycle(name) {
				Some(cycle) => Err(LoadError::CyclicDependency { cycle }),
				None => {
					let record = registry.lookup(name);
					if record.status() != UnitStatus::Defined {
						return;
					}
					record.state = UnitState::ResolvingDeps;
					Ok(record.dependencies().to_vec())
				}
			}
		};

		match plan {
			Ok(dependencies) => {
				trace!(unit = %name, dependencies = dependencies.len(), "loader.resolve");
				let loader = self.downgrade();
				let unit = name.clone();
				resolver::require_all(
					self,
					dependencies,
					Box::new(move |result: Result<Vec<V>, Unresolved>| {
						if let Some(loader) = loader.upgrade() {
							loader.instantiate(&unit, result);
						}
					}),
				);
			}
			Err(error) => self.fail(name, error),
		}
	}

	/// `ResolvingDeps → Ready`: runs the factory and flushes waiters.
	fn instantiate(&self, name: &UnitName, dependencies: Result<Vec<V>, Unresolved>) {
		let exports = match dependencies {
			Ok(exports) => exports,
			Err(Unresolved { dependency, error }) => {
				let error = LoadError::DependencyFailed {
					name: name.clone(),
					dependency,
					source: Box::new(error),
				};
				return self.fail(name, error);
			}
		};

		let factory = {
			let mut registry = self.inner.registry.borrow_mut();
			let record = registry.lookup(name);
			if record.status() != UnitStatus::ResolvingDeps {
				return;
			}
			record.take_factory()
		};
		let Some(factory) = factory else {
			warn!(unit = %name, "loader.instantiate.missing_factory");
			return;
		};

		let export = factory(exports);
		let waiters = self.inner.registry.borrow_mut().lookup(name).resolve(export.clone());
		debug!(unit = %name, waiters = waiters.len(), "loader.ready");
		for waiter in waiters {
			waiter(Ok(export.clone()));
		}
	}

	/// Moves an unsettled unit to `Failed` and notifies its waiters.
	fn fail(&self, name: &UnitName, error: LoadError) {
		let waiters = self.inner.registry.borrow_mut().lookup(name).fail(error.clone());
		let Some(waiters) = waiters else {
			return;
		};
		debug!(unit = %name, %error, waiters = waiters.len(), "loader.failed");
		for waiter in waiters {
			waiter(Err(error.clone()));
		}
	}

	/// Applies the transport's verdict on a fetch.
	pub(crate) fn settle_fetch(&self, name: &UnitName, outcome: Result<(), String>) {
		let fetching = self.status(name.as_str()) == Some(UnitStatus::Fetching);
		match (fetching, outcome) {
			(true, Ok(())) => self.fail(name, LoadError::UndefinedAfterFetch { name: name.clone() }),
			(true, Err(reason)) => self.fail(name, LoadError::FetchFailure { name: name.clone(), reason }),
			(false, Ok(())) => trace!(unit = %name, "loader.fetch.complete"),
			(false, Err(reason)) => warn!(unit = %name, %reason, "loader.fetch.late_failure"),
		}
	}
}
