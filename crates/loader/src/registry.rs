//! Per-name unit records.
//!
//! The registry only stores state; every transition is driven by the
//! coordinator, which never calls user code while holding a record.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::definition::{Definition, Factory};
use crate::error::LoadError;
use crate::name::UnitName;

/// Continuation waiting on a single unit.
pub(crate) type Callback<V> = Box<dyn FnOnce(Result<V, LoadError>)>;

/// Lifecycle state of one unit, export included.
pub(crate) enum UnitState<V> {
	NotRequested,
	Fetching,
	Defined,
	ResolvingDeps,
	Ready(V),
	Failed(LoadError),
}

/// Lifecycle state of one unit, without the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
	/// Known by name only.
	NotRequested,
	/// The transport has been asked for the unit.
	Fetching,
	/// The definition is known; dependencies are not being resolved yet.
	Defined,
	/// Waiting for dependencies before running the factory.
	ResolvingDeps,
	/// The factory ran; the export is available.
	Ready,
	/// The unit failed and will never become ready.
	Failed,
}

impl UnitStatus {
	/// Returns true for `Ready` and `Failed`.
	pub const fn is_settled(self) -> bool {
		matches!(self, Self::Ready | Self::Failed)
	}

	/// Returns a stable lowercase label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::NotRequested => "not_requested",
			Self::Fetching => "fetching",
			Self::Defined => "defined",
			Self::ResolvingDeps => "resolving_deps",
			Self::Ready => "ready",
			Self::Failed => "failed",
		}
	}
}

impl fmt::Display for UnitStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Snapshot of one registered unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSnapshot {
	/// Unit name.
	pub name: UnitName,
	/// Current lifecycle status.
	pub status: UnitStatus,
	/// Declared dependencies, or `None` while the unit is undefined.
	pub dependencies: Option<Vec<UnitName>>,
	/// Number of continuations queued on the unit.
	pub pending: usize,
}

pub(crate) struct UnitRecord<V> {
	pub(crate) state: UnitState<V>,
	dependencies: Option<Vec<UnitName>>,
	factory: Option<Factory<V>>,
	pub(crate) pending: Vec<Callback<V>>,
}

impl<V> UnitRecord<V> {
	fn new() -> Self {
		Self {
			state: UnitState::NotRequested,
			dependencies: None,
			factory: None,
			pending: Vec::new(),
		}
	}

	pub(crate) fn status(&self) -> UnitStatus {
		match self.state {
			UnitState::NotRequested => UnitStatus::NotRequested,
			UnitState::Fetching => UnitStatus::Fetching,
			UnitState::Defined => UnitStatus::Defined,
			UnitState::ResolvingDeps => UnitStatus::ResolvingDeps,
			UnitState::Ready(_) => UnitStatus::Ready,
			UnitState::Failed(_) => UnitStatus::Failed,
		}
	}

	pub(crate) fn is_defined(&self) -> bool {
		self.dependencies.is_some()
	}

	pub(crate) fn dependencies(&self) -> &[UnitName] {
		self.dependencies.as_deref().unwrap_or_default()
	}

	/// Outcome of a settled unit; `None` while the unit is still in flight.
	pub(crate) fn outcome(&self) -> Option<Result<V, LoadError>>
	where
		V: Clone,
	{
		match &self.state {
			UnitState::Ready(export) => Some(Ok(export.clone())),
			UnitState::Failed(error) => Some(Err(error.clone())),
			_ => None,
		}
	}

	pub(crate) fn take_factory(&mut self) -> Option<Factory<V>> {
		self.factory.take()
	}

	/// Marks the unit failed and hands back its waiters.
	///
	/// Returns `None` if the unit had already settled.
	pub(crate) fn fail(&mut self, error: LoadError) -> Option<Vec<Callback<V>>> {
		if self.status().is_settled() {
			return None;
		}
		self.state = UnitState::Failed(error);
		self.factory = None;
		Some(std::mem::take(&mut self.pending))
	}

	/// Stores the export and hands back the waiters.
	pub(crate) fn resolve(&mut self, export: V) -> Vec<Callback<V>> {
		self.state = UnitState::Ready(export);
		std::mem::take(&mut self.pending)
	}

	/// Dependencies this unit is still blocked on, if its definition is known.
	fn waiting_on(&self) -> Option<&[UnitName]> {
		match self.state {
			UnitState::Defined | UnitState::ResolvingDeps => self.dependencies.as_deref(),
			_ => None,
		}
	}
}

/// What registering a definition did to the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registered {
	/// Nobody has requested the unit yet.
	Idle,
	/// The unit was being fetched; its waiters can now be served.
	Awaited,
}

/// Per-name unit records, created on first mention and never evicted.
pub(crate) struct ModuleRegistry<V> {
	units: FxHashMap<UnitName, UnitRecord<V>>,
}

impl<V> Default for ModuleRegistry<V> {
	fn default() -> Self {
		Self {
			units: FxHashMap::default(),
		}
	}
}

impl<V> ModuleRegistry<V> {
	/// Returns the record for `name`, creating it as `NotRequested`.
	pub(crate) fn lookup(&mut self, name: &UnitName) -> &mut UnitRecord<V> {
		self.units.entry(name.clone()).or_insert_with(UnitRecord::new)
	}

	pub(crate) fn get(&self, name: &str) -> Option<&UnitRecord<V>> {
		self.units.get(name)
	}

	/// Stores a definition for `name`.
	///
	/// The first definition is authoritative: later ones are rejected without
	/// touching it. A unit that already failed reports its stored failure.
	/// Validation failures are returned for the coordinator to settle.
	pub(crate) fn register(&mut self, name: &UnitName, definition: Definition<V>) -> Result<Registered, LoadError> {
		let record = self.lookup(name);
		if record.is_defined() {
			return Err(LoadError::DuplicateDefinition { name: name.clone() });
		}
		if let UnitState::Failed(error) = &record.state {
			return Err(error.clone());
		}

		let (dependencies, factory) = definition.into_parts();
		if name.is_empty() {
			return Err(LoadError::InvalidDefinition {
				name: name.clone(),
				reason: "unit name is empty".to_string(),
			});
		}
		if let Some(position) = dependencies.iter().position(UnitName::is_empty) {
			return Err(LoadError::InvalidDefinition {
				name: name.clone(),
				reason: format!("dependency #{position} has an empty name"),
			});
		}

		let registered = match record.state {
			UnitState::Fetching => Registered::Awaited,
			_ => Registered::Idle,
		};
		record.dependencies = Some(dependencies);
		record.factory = Some(factory);
		record.state = UnitState::Defined;
		Ok(registered)
	}

	/// Looks for a path from `start`'s dependencies back to `start`.
	///
	/// Only units whose definitions are known and which have not settled
	/// are followed, so the search sees exactly the waits that could never
	/// finish. Returns the cycle as `start -> … -> start`.
	pub(crate) fn find_cycle(&self, start: &UnitName) -> Option<Vec<UnitName>> {
		let mut path = vec![start.clone()];
		let mut visited = FxHashSet::default();
		self.walk_cycle(start, start, &mut path, &mut visited).then_some(path)
	}

	fn walk_cycle(&self, target: &UnitName, node: &UnitName, path: &mut Vec<UnitName>, visited: &mut FxHashSet<UnitName>) -> bool {
		let Some(dependencies) = self.units.get(node).and_then(UnitRecord::waiting_on) else {
			return false;
		};
		for dependency in dependencies {
			if dependency == target {
				path.push(dependency.clone());
				return true;
			}
			if !visited.insert(dependency.clone()) {
				continue;
			}
			path.push(dependency.clone());
			if self.walk_cycle(target, dependency, path, visited) {
				return true;
			}
			path.pop();
		}
		false
	}

	/// Returns every record, sorted by name.
	pub(crate) fn snapshot(&self) -> Vec<UnitSnapshot> {
		let mut snapshots: Vec<_> = self
			.units
			.iter()
			.map(|(name, record)| UnitSnapshot {
				name: name.clone(),
				status: record.status(),
				dependencies: record.dependencies.clone(),
				pending: record.pending.len(),
			})
			.collect();
		snapshots.sort_by(|a, b| a.name.cmp(&b.name));
		snapshots
	}
}
