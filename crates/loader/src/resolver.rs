//! Multi-unit waits.
//!
//! A wait is counted per distinct name, never per dependency edge or per
//! completion: every distinct name owns one slot, the countdown drops the
//! first time a slot fills, and the continuation is taken out of the join
//! the moment it fires so nothing can fire it again.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::coordinator::Loader;
use crate::error::LoadError;
use crate::name::UnitName;

/// The first dependency that failed while a wait was open.
#[derive(Debug)]
pub(crate) struct Unresolved {
	pub(crate) dependency: UnitName,
	pub(crate) error: LoadError,
}

pub(crate) type Continuation<V> = Box<dyn FnOnce(Result<Vec<V>, Unresolved>)>;

struct Join<V> {
	remaining: usize,
	slots: Vec<Option<V>>,
	/// Slot index for each requested position, duplicates included.
	order: Vec<usize>,
	continuation: Option<Continuation<V>>,
}

impl<V: Clone> Join<V> {
	/// Fills a slot; returns the continuation and its argument once the wait is over.
	fn settle(&mut self, slot: usize, name: UnitName, outcome: Result<V, LoadError>) -> Option<(Continuation<V>, Result<Vec<V>, Unresolved>)> {
		self.continuation.as_ref()?;
		match outcome {
			Ok(export) => {
				if self.slots[slot].is_some() {
					return None;
				}
				self.slots[slot] = Some(export);
				self.remaining -= 1;
				if self.remaining > 0 {
					return None;
				}
				let exports = self.order.iter().map(|&slot| self.slots[slot].clone()).collect::<Option<Vec<_>>>()?;
				Some((self.continuation.take()?, Ok(exports)))
			}
			Err(error) => Some((self.continuation.take()?, Err(Unresolved { dependency: name, error }))),
		}
	}
}

/// Waits for every unit in `names`, then calls `continuation` once.
///
/// Duplicate names collapse into one wait and are expanded back in the
/// result. An empty list completes immediately. The first failure completes
/// the wait with that failure; every distinct name is still required, so
/// units outside the failed subtree keep loading.
pub(crate) fn require_all<V: Clone + 'static>(loader: &Loader<V>, names: Vec<UnitName>, continuation: Continuation<V>) {
	let distinct: IndexSet<UnitName> = names.iter().cloned().collect();
	if distinct.is_empty() {
		continuation(Ok(Vec::new()));
		return;
	}

	let order = names.iter().filter_map(|name| distinct.get_index_of(name)).collect();
	let join = Rc::new(RefCell::new(Join {
		remaining: distinct.len(),
		slots: distinct.iter().map(|_| None).collect(),
		order,
		continuation: Some(continuation),
	}));

	for (slot, name) in distinct.into_iter().enumerate() {
		let waiter = Rc::clone(&join);
		let reported = name.clone();
		loader.require_unit(
			name,
			Box::new(move |outcome: Result<V, LoadError>| {
				let fired = waiter.borrow_mut().settle(slot, reported, outcome);
				if let Some((continuation, result)) = fired {
					continuation(result);
				}
			}),
		);
	}
}
