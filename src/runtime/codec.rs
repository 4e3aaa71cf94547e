//! Serialized form of tasks and flows.
//!
//! Every document is a JSON envelope `{"kind": ..., "version": ..., "body":
//! ...}`. The kind and version are read first, so a flow document handed to
//! the task decoder is rejected before its body is looked at.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::actions::HandlerRegistry;
use crate::errors::{Result, TaskflowError};
use crate::runtime::flow::{Edge, Flow};
use crate::runtime::retry::{Retries, RetryPolicy};
use crate::runtime::task::{Task, TaskDef};
use crate::runtime::triggers::Trigger;

pub const FORMAT_VERSION: u32 = 1;

const KIND_TASK: &str = "task";
const KIND_FLOW: &str = "flow";

/// Opaque serialized document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Serialized(String);

impl Serialized {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Serialized {
    fn from(s: String) -> Self {
        Serialized(s)
    }
}

impl fmt::Display for Serialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
struct Header {
    kind: String,
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    kind: String,
    version: u32,
    body: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TaskDocument {
    name: String,
    flow_id: String,
    handler: Option<String>,
    #[serde(default)]
    params: Option<Map<String, Value>>,
    retries: Retries,
    retry_delay: Duration,
    trigger: Trigger,
}

impl TaskDocument {
    fn from_task(task: &Task) -> Self {
        Self {
            name: task.name().to_string(),
            flow_id: task.flow().id().to_string(),
            handler: task.handler_name().map(str::to_string),
            params: task.params().cloned(),
            retries: task.retries(),
            retry_delay: task.retry_delay(),
            trigger: task.trigger(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FlowDocument {
    id: String,
    tasks: Vec<TaskDocument>,
    edges: Vec<Edge>,
}

fn encode<T: Serialize>(kind: &str, body: T) -> Result<Serialized> {
    let envelope = Envelope {
        kind: kind.to_string(),
        version: FORMAT_VERSION,
        body,
    };
    Ok(Serialized(serde_json::to_string(&envelope)?))
}

pub(crate) fn encode_task(task: &Task) -> Result<Serialized> {
    encode(KIND_TASK, TaskDocument::from_task(task))
}

pub(crate) fn encode_flow(flow: &Flow) -> Result<Serialized> {
    let document = FlowDocument {
        id: flow.id().to_string(),
        tasks: flow.tasks().iter().map(TaskDocument::from_task).collect(),
        edges: flow.edges(),
    };
    encode(KIND_FLOW, document)
}

/// Check the envelope header and decode the body as `T`.
fn decode_body<T>(serialized: &Serialized, expected: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let header: Header = serde_json::from_str(serialized.as_str())
        .map_err(|e| TaskflowError::Decode(format!("not a serialized document: {e}")))?;

    if header.version != FORMAT_VERSION {
        return Err(TaskflowError::Decode(format!(
            "unsupported format version {} (expected {FORMAT_VERSION})",
            header.version
        )));
    }
    match header.kind.as_str() {
        kind if kind == expected => {}
        KIND_TASK | KIND_FLOW => {
            return Err(TaskflowError::Type(format!(
                "Deserialized object is not a {expected}; found a {}",
                header.kind
            )));
        }
        other => {
            return Err(TaskflowError::Decode(format!("unknown document kind '{other}'")));
        }
    }

    let envelope: Envelope<T> = serde_json::from_str(serialized.as_str())
        .map_err(|e| TaskflowError::Decode(format!("malformed {expected} document: {e}")))?;
    Ok(envelope.body)
}

/// Turns serialized documents back into live tasks and flows.
///
/// Handlers are looked up by name in the registry. Flows are looked up by id
/// among the flows registered with [`TaskCodec::add_flow`]; an unknown id gets
/// a new, detached flow that the codec does not keep.
#[derive(Debug, Clone, Default)]
pub struct TaskCodec {
    handlers: HandlerRegistry,
    flows: Arc<DashMap<String, Flow>>,
}

impl TaskCodec {
    pub fn new(handlers: HandlerRegistry) -> Self {
        Self {
            handlers,
            flows: Arc::new(DashMap::new()),
        }
    }

    pub fn with_flow(self, flow: &Flow) -> Self {
        self.add_flow(flow);
        self
    }

    /// Attach decoded tasks with this flow's id to `flow`.
    pub fn add_flow(&self, flow: &Flow) {
        self.flows.insert(flow.id().to_string(), flow.clone());
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    fn flow_for(&self, flow_id: &str) -> Flow {
        match self.flows.get(flow_id) {
            Some(flow) => flow.value().clone(),
            None => Flow::new(flow_id),
        }
    }

    fn task_from_document(&self, document: TaskDocument, flow: &Flow) -> Result<Task> {
        if document.flow_id != flow.id() {
            return Err(TaskflowError::Decode(format!(
                "task '{}' claims flow '{}' inside flow '{}'",
                document.name,
                document.flow_id,
                flow.id()
            )));
        }
        let handler = document
            .handler
            .as_deref()
            .map(|name| self.handlers.resolve(name))
            .transpose()?;

        let def = TaskDef::new(
            flow.id(),
            document.name,
            handler,
            document.params,
            RetryPolicy {
                retries: document.retries,
                retry_delay: document.retry_delay,
            },
            document.trigger,
        );
        Ok(Task::from_parts(flow.clone(), Arc::new(def)))
    }

    /// Decode a task document. The task is not registered with its flow.
    pub fn decode_task(&self, serialized: &Serialized) -> Result<Task> {
        let document: TaskDocument = decode_body(serialized, KIND_TASK)?;
        let flow = self.flow_for(&document.flow_id);
        self.task_from_document(document, &flow)
    }

    /// Decode a flow document into a new flow with its tasks and
    /// relationships registered. Pass the result to [`TaskCodec::add_flow`]
    /// to attach later task decodes to it.
    pub fn decode_flow(&self, serialized: &Serialized) -> Result<Flow> {
        let document: FlowDocument = decode_body(serialized, KIND_FLOW)?;
        let flow = Flow::new(document.id);
        for task_document in document.tasks {
            let task = self.task_from_document(task_document, &flow)?;
            flow.add_task(&task)?;
        }
        for edge in document.edges {
            flow.record_edge(edge);
        }
        Ok(flow)
    }
}
