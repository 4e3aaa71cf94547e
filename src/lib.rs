// src/lib.rs

//! Declare tasks, wire them into flows, and persist them.
//!
//! - [`runtime`] holds the task and flow model, triggers, retry policy,
//!   serialization and the task stores.
//! - [`actions`] defines the handlers a task delegates to.
//! - [`dsl`] and [`compiler`] turn YAML flow definitions into live flows.

pub mod actions;
pub mod compiler;
pub mod dsl;
pub mod errors;
pub mod logging;
pub mod runtime;

pub use errors::{Result, TaskflowError};
pub use runtime::codec::{Serialized, TaskCodec};
pub use runtime::context::FlowGuard;
pub use runtime::flow::{Edge, Flow};
pub use runtime::retry::{Retries, RetryPolicy};
pub use runtime::storage::{InMemoryTaskStore, TaskRecord, TaskStore};
pub use runtime::task::{Task, TaskBuilder};
pub use runtime::triggers::{TaskState, Trigger};
