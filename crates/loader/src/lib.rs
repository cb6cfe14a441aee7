//! Asynchronous unit loader.
//!
//! Units are named pieces of code with an optional list of dependencies and
//! a factory producing the unit's export. Callers [`Loader::require`] one or
//! more names and are called back exactly once, after the whole transitive
//! dependency graph has been fetched and instantiated.
//!
//! # Architecture
//!
//! ```text
//! Loader::require(names, cb)
//!   └── resolver: one wait per distinct name, countdown to zero
//!         └── coordinator: per-name state machine
//!               NotRequested → Fetching → Defined → ResolvingDeps → Ready
//!                     │            │                      │
//!                     └────────────┴────── Failed ────────┘
//!               └── Transport::fetch (once per name) ──▶ define + complete
//! ```
//!
//! The loader is single-threaded: all state lives behind `Rc<RefCell<_>>`
//! and no user code (factories, callbacks, transports) runs while that state
//! is borrowed, so factories and callbacks may freely call back into the
//! loader.

#![warn(missing_docs)]

mod coordinator;
pub mod definition;
pub mod error;
mod future;
pub mod name;
mod registry;
mod resolver;
pub mod test_helpers;
pub mod transport;

pub use coordinator::Loader;
pub use definition::{Definition, Dependencies, Factory};
pub use error::{LoadError, Result};
pub use future::LoadFuture;
pub use name::UnitName;
pub use registry::{UnitSnapshot, UnitStatus};
pub use transport::{FetchRequest, Transport};
