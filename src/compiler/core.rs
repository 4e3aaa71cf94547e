use crate::actions::HandlerRegistry;
use crate::dsl::{FlowDefinition, TaskDefinition};
use crate::errors::{Result, TaskflowError};
use crate::runtime::flow::Flow;
use crate::runtime::retry::{parse_duration, Retries};
use crate::runtime::task::Task;
use crate::runtime::triggers::Trigger;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

/// Turns a [`FlowDefinition`] into a live, validated [`Flow`].
///
/// Tasks are created through the normal builder path with the new flow
/// active, so each one is type-checked before it is registered.
pub struct Compiler {
    handlers: HandlerRegistry,
}

impl Compiler {
    pub fn new(handlers: HandlerRegistry) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn compile(&self, definition: FlowDefinition) -> Result<Flow> {
        let flow = match &definition.id {
            Some(id) => Flow::new(id.clone()),
            None => Flow::with_generated_id(),
        };
        self.compile_into(&definition, &flow)?;
        Ok(flow)
    }

    /// Add the tasks and relationships of `definition` to an existing flow,
    /// then validate the flow. The definition's own id is ignored.
    ///
    /// Tasks created before a failing one stay registered.
    pub fn compile_into(&self, definition: &FlowDefinition, flow: &Flow) -> Result<()> {
        {
            let _active = flow.enter();

            // 1. Tasks
            let mut by_name: HashMap<String, Task> = HashMap::new();
            let mut ordered = Vec::with_capacity(definition.tasks.len());
            for task_def in &definition.tasks {
                let task = self.build_task(task_def)?;
                by_name.insert(task.name().to_string(), task.clone());
                ordered.push((task, &task_def.after));
            }

            // 2. Relationships
            let lookup = |name: &str| {
                by_name
                    .get(name)
                    .cloned()
                    .or_else(|| flow.task(name))
                    .ok_or_else(|| {
                        TaskflowError::Config(format!(
                            "unknown task '{}' referenced in flow '{}'",
                            name,
                            flow.id()
                        ))
                    })
            };
            for (task, upstream) in &ordered {
                for name in upstream.iter() {
                    task.run_after([&lookup(name)?]);
                }
            }
            for edge in &definition.edges {
                lookup(&edge.before)?.run_before([&lookup(&edge.after)?]);
            }
        }

        // 3. Structure
        flow.validate()?;

        info!(
            flow = %flow.id(),
            tasks = flow.len(),
            edges = flow.edges().len(),
            "compiled flow"
        );
        Ok(())
    }

    fn build_task(&self, def: &TaskDefinition) -> Result<Task> {
        let mut builder = Task::builder();

        if let Some(name) = &def.name {
            builder = builder.name(expect_name(name)?);
        }
        if let Some(handler) = &def.handler {
            builder = builder.handler(self.handlers.resolve(handler)?);
        }
        if let Some(params) = &def.params {
            builder = builder.params(params.clone());
        }
        if let Some(retries) = &def.retries {
            builder = builder.retries(expect_retries(retries)?);
        }
        if let Some(delay) = &def.retry_delay {
            builder = builder.retry_delay(expect_duration(delay)?);
        }
        if let Some(trigger) = &def.trigger {
            builder = builder.trigger(trigger.parse::<Trigger>()?);
        }

        builder.build()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_name(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(TaskflowError::Type(format!(
            "Name must be a string; received {}",
            type_name(other)
        ))),
    }
}

fn expect_retries(value: &Value) -> Result<Retries> {
    match value.as_i64() {
        Some(n) => Retries::try_from(n),
        None => Err(TaskflowError::Type(format!(
            "Retries must be an int; received {} {}",
            type_name(value),
            value
        ))),
    }
}

fn expect_duration(value: &Value) -> Result<std::time::Duration> {
    match value {
        Value::String(s) => parse_duration(s)
            .map_err(|e| TaskflowError::Type(format!("Retry delay must be a duration; {e}"))),
        other => Err(TaskflowError::Type(format!(
            "Retry delay must be a duration string like \"5m\"; received {}",
            type_name(other)
        ))),
    }
}
