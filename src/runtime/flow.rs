//! The flow graph: the set of tasks registered under one flow id and the
//! relationships requested between them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{Result, TaskflowError};
use crate::runtime::codec::{self, Serialized};
use crate::runtime::storage::{TaskRecord, TaskStore};
use crate::runtime::task::{Task, TaskDef};
use crate::runtime::triggers::TaskState;
use crate::runtime::validate;

/// Directed "before must finish before after may run" link, by task id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub before: String,
    pub after: String,
}

impl Edge {
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.before, self.after)
    }
}

/// Shared handle to a flow. Clones point at the same graph.
///
/// Flows compare by id.
#[derive(Clone)]
pub struct Flow {
    inner: Arc<FlowInner>,
}

struct FlowInner {
    id: String,
    // Keyed by task name; the flow id is implied.
    tasks: RwLock<BTreeMap<String, Arc<TaskDef>>>,
    // Insertion order, no duplicates.
    edges: RwLock<Vec<Edge>>,
}

impl Flow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(FlowInner {
                id: id.into(),
                tasks: RwLock::new(BTreeMap::new()),
                edges: RwLock::new(Vec::new()),
            }),
        }
    }

    /// A flow with a fresh `flow-<uuid>` id.
    pub fn with_generated_id() -> Self {
        Self::new(format!("flow-{}", Uuid::new_v4()))
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// True when both handles share one graph. `==` only compares ids.
    pub fn ptr_eq(&self, other: &Flow) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn tasks_read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<TaskDef>>> {
        self.inner.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks_write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<TaskDef>>> {
        self.inner.tasks.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn edges_read(&self) -> RwLockReadGuard<'_, Vec<Edge>> {
        self.inner.edges.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn edges_write(&self) -> RwLockWriteGuard<'_, Vec<Edge>> {
        self.inner.edges.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a task with this flow.
    ///
    /// Registering the same task twice is a no-op; a different task with an
    /// already registered name is rejected.
    pub fn add_task(&self, task: &Task) -> Result<()> {
        if task.flow().id() != self.id() {
            return Err(TaskflowError::Config(format!(
                "task '{}' belongs to flow '{}', not '{}'",
                task.name(),
                task.flow().id(),
                self.id()
            )));
        }

        let mut tasks = self.tasks_write();
        match tasks.get(task.name()) {
            Some(existing) if Arc::ptr_eq(existing, task.def()) => Ok(()),
            Some(_) => Err(TaskflowError::Config(format!(
                "a task named '{}' already exists in flow '{}'",
                task.name(),
                self.id()
            ))),
            None => {
                tasks.insert(task.name().to_string(), task.def().clone());
                debug!(flow = %self.id(), task = %task.id(), "registered task");
                Ok(())
            }
        }
    }

    /// Record that `before` has to run before `after`.
    ///
    /// No self-loop or cycle checks happen here; see [`Flow::validate`].
    pub fn add_task_relationship(&self, before: &Task, after: &Task) {
        self.record_edge(Edge::new(before.id(), after.id()));
    }

    pub(crate) fn record_edge(&self, edge: Edge) {
        let mut edges = self.edges_write();
        if edges.contains(&edge) {
            debug!(flow = %self.id(), %edge, "relationship already recorded");
            return;
        }
        debug!(flow = %self.id(), %edge, "recorded task relationship");
        edges.push(edge);
    }

    pub fn len(&self) -> usize {
        self.tasks_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks_read().is_empty()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.task_by_id(task_id).is_some()
    }

    /// Look a task up by its name within this flow.
    pub fn task(&self, name: &str) -> Option<Task> {
        self.tasks_read()
            .get(name)
            .map(|def| Task::from_parts(self.clone(), def.clone()))
    }

    /// Look a task up by its full `flow/name` id.
    pub fn task_by_id(&self, task_id: &str) -> Option<Task> {
        let name = task_id
            .strip_prefix(self.id())
            .and_then(|rest| rest.strip_prefix('/'))?;
        self.task(name)
    }

    /// All tasks, ordered by name.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks_read()
            .values()
            .map(|def| Task::from_parts(self.clone(), def.clone()))
            .collect()
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.tasks_read().values().map(|def| def.id.clone()).collect()
    }

    /// All relationships, in the order they were first requested.
    pub fn edges(&self) -> Vec<Edge> {
        self.edges_read().clone()
    }

    /// Ids of the tasks that must run before `task_id`.
    pub fn upstream_ids(&self, task_id: &str) -> Vec<String> {
        self.edges_read()
            .iter()
            .filter(|e| e.after == task_id)
            .map(|e| e.before.clone())
            .collect()
    }

    /// Ids of the tasks that wait on `task_id`.
    pub fn downstream_ids(&self, task_id: &str) -> Vec<String> {
        self.edges_read()
            .iter()
            .filter(|e| e.before == task_id)
            .map(|e| e.after.clone())
            .collect()
    }

    /// Evaluate `task`'s trigger against the states of its upstream tasks.
    ///
    /// Upstream tasks missing from `states` count as [`TaskState::Pending`].
    pub fn is_ready(&self, task: &Task, states: &HashMap<String, TaskState>) -> bool {
        let upstream: Vec<TaskState> = self
            .upstream_ids(task.id())
            .iter()
            .map(|id| states.get(id).copied().unwrap_or_default())
            .collect();
        task.trigger().evaluate(&upstream)
    }

    /// Tasks that have not finished yet and whose trigger currently passes.
    pub fn ready_tasks(&self, states: &HashMap<String, TaskState>) -> Vec<Task> {
        self.tasks()
            .into_iter()
            .filter(|task| {
                let finished = states
                    .get(task.id())
                    .is_some_and(|state| state.is_finished());
                !finished && self.is_ready(task, states)
            })
            .collect()
    }

    /// Check that every edge joins two tasks of this flow and that the graph
    /// has no cycles (self-loops included).
    pub fn validate(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Tasks ordered so that every task comes after its upstream tasks.
    pub fn topological_order(&self) -> Result<Vec<Task>> {
        let order = validate::topological_ids(self.id(), &self.task_ids(), &self.edges())?;
        Ok(order
            .iter()
            .filter_map(|id| self.task_by_id(id))
            .collect())
    }

    /// Serialize the whole flow: tasks and relationships.
    pub fn serialize(&self) -> Result<Serialized> {
        codec::encode_flow(self)
    }

    /// Save every task of the flow to `store`.
    pub async fn save<S>(&self, store: &S) -> Result<Vec<TaskRecord>>
    where
        S: TaskStore + ?Sized,
    {
        let mut records = Vec::with_capacity(self.len());
        for task in self.tasks() {
            records.push(task.save(store).await?);
        }
        info!(flow = %self.id(), tasks = records.len(), "saved flow");
        Ok(records)
    }
}

impl PartialEq for Flow {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Flow {}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.tasks_read().keys().cloned().collect();
        f.debug_struct("Flow")
            .field("id", &self.id())
            .field("tasks", &names)
            .field("edges", &self.edges_read().len())
            .finish()
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flow({})", self.id())
    }
}
