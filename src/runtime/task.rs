//! Tasks: the nodes of a flow graph.

use std::fmt;
use std::ops::{BitOr, Shl, Shr};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::actions::TaskHandler;
use crate::errors::{Result, TaskflowError};
use crate::runtime::codec::{self, Serialized, TaskCodec};
use crate::runtime::flow::Flow;
use crate::runtime::retry::{Retries, RetryPolicy};
use crate::runtime::storage::{TaskRecord, TaskStore};
use crate::runtime::triggers::Trigger;

/// Immutable task definition, shared between a [`Task`] handle and its flow.
pub(crate) struct TaskDef {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) handler: Option<Arc<dyn TaskHandler>>,
    pub(crate) params: Option<Map<String, Value>>,
    pub(crate) retry: RetryPolicy,
    pub(crate) trigger: Trigger,
}

impl TaskDef {
    pub(crate) fn new(
        flow_id: &str,
        name: String,
        handler: Option<Arc<dyn TaskHandler>>,
        params: Option<Map<String, Value>>,
        retry: RetryPolicy,
        trigger: Trigger,
    ) -> Self {
        Self {
            // Identity is fixed here; tasks cannot be renamed or moved.
            id: format!("{flow_id}/{name}"),
            name,
            handler,
            params,
            retry,
            trigger,
        }
    }
}

/// A unit of work registered in exactly one [`Flow`].
///
/// `Task` is a cheap handle: clones refer to the same definition. Two tasks
/// compare equal when every piece of their state matches (name, flow id,
/// handler name, params, retry policy, trigger).
#[derive(Clone)]
pub struct Task {
    flow: Flow,
    def: Arc<TaskDef>,
}

impl Task {
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }

    /// Create a task from a handler in the active flow, named after the
    /// handler.
    pub fn from_handler(handler: Arc<dyn TaskHandler>) -> Result<Task> {
        Task::builder().handler(handler).build()
    }

    pub(crate) fn from_parts(flow: Flow, def: Arc<TaskDef>) -> Self {
        Self { flow, def }
    }

    pub(crate) fn def(&self) -> &Arc<TaskDef> {
        &self.def
    }

    /// `"{flow id}/{name}"`.
    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn handler(&self) -> Option<&Arc<dyn TaskHandler>> {
        self.def.handler.as_ref()
    }

    pub fn handler_name(&self) -> Option<&str> {
        self.def.handler.as_ref().map(|h| h.name())
    }

    pub fn params(&self) -> Option<&Map<String, Value>> {
        self.def.params.as_ref()
    }

    pub fn retries(&self) -> Retries {
        self.def.retry.retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.def.retry.retry_delay
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.def.retry
    }

    pub fn trigger(&self) -> Trigger {
        self.def.trigger
    }

    /// True when both handles point at the same registered definition.
    pub fn same_task(&self, other: &Task) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }

    // Relationships ------------------------------------------------

    /// Ask the flow to run this task before each of `tasks`.
    pub fn run_before<'a, I>(&self, tasks: I)
    where
        I: IntoIterator<Item = &'a Task>,
    {
        for t in tasks {
            self.flow.add_task_relationship(self, t);
        }
    }

    /// Ask the flow to run this task after each of `tasks`.
    pub fn run_after<'a, I>(&self, tasks: I)
    where
        I: IntoIterator<Item = &'a Task>,
    {
        for t in tasks {
            self.flow.add_task_relationship(t, self);
        }
    }

    // Execution ----------------------------------------------------

    /// Invoke the handler, or do nothing when the task has none.
    pub async fn run(&self, input: Value) -> Result<Option<Value>> {
        let Some(handler) = self.def.handler.clone() else {
            debug!(task = %self.id(), "no handler; nothing to run");
            return Ok(None);
        };
        handler
            .run(input)
            .await
            .map(Some)
            .map_err(TaskflowError::Handler)
    }

    // Serialization ------------------------------------------------

    pub fn serialize(&self) -> Result<Serialized> {
        codec::encode_task(self)
    }

    pub fn from_serialized(serialized: &Serialized, codec: &TaskCodec) -> Result<Task> {
        codec.decode_task(serialized)
    }

    // Persistence --------------------------------------------------

    pub fn to_model(&self) -> Result<TaskRecord> {
        Ok(TaskRecord {
            id: self.id().to_string(),
            name: self.name().to_string(),
            flow_id: self.flow.id().to_string(),
            serialized: self.serialize()?,
        })
    }

    pub fn from_model(record: &TaskRecord, codec: &TaskCodec) -> Result<Task> {
        Task::from_serialized(&record.serialized, codec)
    }

    /// Write this task's record to `store`, replacing any record with the
    /// same id.
    pub async fn save<S>(&self, store: &S) -> Result<TaskRecord>
    where
        S: TaskStore + ?Sized,
    {
        let record = self.to_model()?;
        store.save(&record).await?;
        info!(task = %self.id(), "saved task");
        Ok(record)
    }

    /// Load a task by id. A missing record yields `Ok(None)`; a record that
    /// decodes to a different id is a [`TaskflowError::Decode`].
    pub async fn from_id<S>(task_id: &str, store: &S, codec: &TaskCodec) -> Result<Option<Task>>
    where
        S: TaskStore + ?Sized,
    {
        match store.get(task_id).await {
            Ok(record) => {
                let task = Task::from_model(&record, codec)?;
                if task.id() != task_id {
                    return Err(TaskflowError::Decode(format!(
                        "record stored under '{task_id}' holds task '{}'",
                        task.id()
                    )));
                }
                Ok(Some(task))
            }
            Err(e) if e.is_not_found() => {
                debug!(task = %task_id, "no stored record");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
            && self.name() == other.name()
            && self.flow.id() == other.flow.id()
            && self.handler_name() == other.handler_name()
            && self.params() == other.params()
            && self.retry_policy() == other.retry_policy()
            && self.trigger() == other.trigger()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("handler", &self.handler_name())
            .field("retries", &self.retries())
            .field("retry_delay", &self.retry_delay())
            .field("trigger", &self.trigger())
            .field("params", &self.params())
            .finish()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.id())
    }
}

// Sugar ----------------------------------------------------------
//
// Each operator returns its right-hand side, so `&a >> &b >> &c` chains.

/// `&a >> &b` is `a.run_before([&b])`.
impl<'b> Shr<&'b Task> for &Task {
    type Output = &'b Task;

    fn shr(self, rhs: &'b Task) -> &'b Task {
        self.run_before([rhs]);
        rhs
    }
}

/// `&a | &b` is `a.run_before([&b])`.
impl<'b> BitOr<&'b Task> for &Task {
    type Output = &'b Task;

    fn bitor(self, rhs: &'b Task) -> &'b Task {
        self.run_before([rhs]);
        rhs
    }
}

/// `&a << &b` is `a.run_after([&b])`.
impl<'b> Shl<&'b Task> for &Task {
    type Output = &'b Task;

    fn shl(self, rhs: &'b Task) -> &'b Task {
        self.run_after([rhs]);
        rhs
    }
}

/// Builds and registers a [`Task`].
#[derive(Default)]
pub struct TaskBuilder {
    name: Option<String>,
    flow: Option<Flow>,
    handler: Option<Arc<dyn TaskHandler>>,
    params: Option<Map<String, Value>>,
    retry: RetryPolicy,
    trigger: Option<Trigger>,
}

impl TaskBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Register into this flow instead of the active one.
    pub fn flow(mut self, flow: &Flow) -> Self {
        self.flow = Some(flow.clone());
        self
    }

    pub fn handler(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn retries(mut self, retries: impl Into<Retries>) -> Self {
        self.retry.retries = retries.into();
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry.retry_delay = delay;
        self
    }

    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Resolve the flow and name, then register the task with its flow.
    ///
    /// Nothing is registered when resolution fails.
    pub fn build(self) -> Result<Task> {
        let flow = match self.flow {
            Some(flow) => flow,
            None => Flow::active().ok_or_else(|| {
                TaskflowError::Config(
                    "Tasks must be created with a Flow or inside a Flow context".to_string(),
                )
            })?,
        };

        let name = match (self.name, &self.handler) {
            (Some(name), _) => name,
            (None, Some(handler)) => handler.name().to_string(),
            (None, None) => {
                return Err(TaskflowError::Type(
                    "Name must be a string; received none (no name and no handler)".to_string(),
                ));
            }
        };
        if name.is_empty() {
            return Err(TaskflowError::Config("task name must not be empty".to_string()));
        }

        let def = TaskDef::new(
            flow.id(),
            name,
            self.handler,
            self.params,
            self.retry,
            self.trigger.unwrap_or_default(),
        );
        let task = Task::from_parts(flow, Arc::new(def));
        task.flow.add_task(&task)?;
        Ok(task)
    }
}
