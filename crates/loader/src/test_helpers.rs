//! Deterministic transport for exercising interleavings in tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::definition::Definition;
use crate::error::LoadError;
use crate::name::UnitName;
use crate::transport::{FetchRequest, Transport};

struct Queue<V: Clone + 'static> {
	outstanding: VecDeque<FetchRequest<V>>,
	fetched: Vec<UnitName>,
}

/// Transport that parks every fetch until the test settles it.
///
/// Clones share the same queue, so a test keeps one clone while the loader
/// owns another.
pub struct QueuedTransport<V: Clone + 'static> {
	queue: Rc<RefCell<Queue<V>>>,
}

impl<V: Clone + 'static> Clone for QueuedTransport<V> {
	fn clone(&self) -> Self {
		Self {
			queue: Rc::clone(&self.queue),
		}
	}
}

impl<V: Clone + 'static> Default for QueuedTransport<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V: Clone + 'static> Transport<V> for QueuedTransport<V> {
	fn fetch(&self, request: FetchRequest<V>) {
		let mut queue = self.queue.borrow_mut();
		queue.fetched.push(request.name().clone());
		queue.outstanding.push_back(request);
	}
}

impl<V: Clone + 'static> QueuedTransport<V> {
	/// Creates an empty transport.
	pub fn new() -> Self {
		Self {
			queue: Rc::new(RefCell::new(Queue {
				outstanding: VecDeque::new(),
				fetched: Vec::new(),
			})),
		}
	}

	/// Every fetch ever issued, in order.
	pub fn fetched(&self) -> Vec<UnitName> {
		self.queue.borrow().fetched.clone()
	}

	/// How many times `name` was fetched.
	pub fn fetch_count(&self, name: &str) -> usize {
		self.queue.borrow().fetched.iter().filter(|fetched| *fetched == name).count()
	}

	/// Names of fetches not yet settled, oldest first.
	pub fn outstanding(&self) -> Vec<UnitName> {
		self.queue.borrow().outstanding.iter().map(|request| request.name().clone()).collect()
	}

	/// Removes the outstanding fetch for `name`.
	pub fn take(&self, name: &str) -> Option<FetchRequest<V>> {
		let mut queue = self.queue.borrow_mut();
		let position = queue.outstanding.iter().position(|request| request.name() == name)?;
		queue.outstanding.remove(position)
	}

	/// Removes the outstanding fetch at `index` (oldest is 0).
	pub fn take_at(&self, index: usize) -> Option<FetchRequest<V>> {
		self.queue.borrow_mut().outstanding.remove(index)
	}

	/// Settles the fetch for `name` by defining it and completing.
	///
	/// Returns `false` if no fetch for `name` was outstanding.
	pub fn deliver(&self, name: &str, definition: Definition<V>) -> bool {
		let Some(request) = self.take(name) else {
			return false;
		};
		let _ = request.define(definition);
		request.complete();
		true
	}

	/// Settles the fetch for `name` as failed.
	pub fn reject(&self, name: &str, reason: &str) -> bool {
		match self.take(name) {
			Some(request) => {
				request.fail(reason);
				true
			}
			None => false,
		}
	}
}

/// Shared log of observed events, for asserting exactly-once behaviour.
#[derive(Clone, Default)]
pub struct Recorder {
	events: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
	/// Creates an empty recorder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends one event.
	pub fn record(&self, event: impl Into<String>) {
		self.events.borrow_mut().push(event.into());
	}

	/// All events so far, in order.
	pub fn events(&self) -> Vec<String> {
		self.events.borrow().clone()
	}

	/// How many times `event` was recorded.
	pub fn count(&self, event: &str) -> usize {
		self.events.borrow().iter().filter(|recorded| *recorded == event).count()
	}

	/// Returns a callback recording `label` with the outcome rendered.
	pub fn callback<V: std::fmt::Debug + 'static>(&self, label: &str) -> Box<dyn FnOnce(Result<V, LoadError>)> {
		let recorder = self.clone();
		let label = label.to_string();
		Box::new(move |outcome: Result<V, LoadError>| match outcome {
			Ok(value) => recorder.record(format!("{label}:ok:{value:?}")),
			Err(error) => recorder.record(format!("{label}:err:{error}")),
		})
	}
}
