use crate::dsl::{FlowDefinition, TaskDefinition, EdgeDefinition};
use serde_json::{Map, Value};

pub struct FlowDefinitionBuilder {
    id: Option<String>,
    tasks: Vec<TaskDefinition>,
    edges: Vec<EdgeDefinition>,
}

impl FlowDefinitionBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            tasks: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Builder whose flow gets a generated id at compile time.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            tasks: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn task(self, name: &str) -> TaskDefinitionBuilder {
        TaskDefinitionBuilder {
            flow_builder: self,
            definition: TaskDefinition {
                name: Some(Value::String(name.to_string())),
                ..TaskDefinition::default()
            },
        }
    }

    /// Task named after its handler.
    pub fn handler_task(self, handler: &str) -> TaskDefinitionBuilder {
        TaskDefinitionBuilder {
            flow_builder: self,
            definition: TaskDefinition {
                handler: Some(handler.to_string()),
                ..TaskDefinition::default()
            },
        }
    }

    pub fn connect(mut self, before: &str, after: &str) -> Self {
        self.edges.push(EdgeDefinition {
            before: before.to_string(),
            after: after.to_string(),
        });
        self
    }

    pub fn build(self) -> FlowDefinition {
        FlowDefinition {
            id: self.id,
            tasks: self.tasks,
            edges: self.edges,
        }
    }
}

pub struct TaskDefinitionBuilder {
    flow_builder: FlowDefinitionBuilder,
    definition: TaskDefinition,
}

impl TaskDefinitionBuilder {
    /// Overrides the name with an arbitrary value (it is type-checked when
    /// the flow is compiled).
    pub fn name(mut self, name: impl Into<Value>) -> Self {
        self.definition.name = Some(name.into());
        self
    }

    pub fn handler(mut self, handler: &str) -> Self {
        self.definition.handler = Some(handler.to_string());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.definition
            .params
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn retries(mut self, retries: impl Into<Value>) -> Self {
        self.definition.retries = Some(retries.into());
        self
    }

    pub fn retry_delay(mut self, delay: impl Into<Value>) -> Self {
        self.definition.retry_delay = Some(delay.into());
        self
    }

    pub fn trigger(mut self, trigger: &str) -> Self {
        self.definition.trigger = Some(trigger.to_string());
        self
    }

    pub fn after(mut self, upstream: &str) -> Self {
        self.definition.after.push(upstream.to_string());
        self
    }

    pub fn build(mut self) -> FlowDefinitionBuilder {
        self.flow_builder.tasks.push(self.definition);
        self.flow_builder
    }
}
