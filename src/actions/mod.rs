use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use anyhow::Result;
use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::errors::TaskflowError;

pub mod builtin;

/// The unit of work a task delegates to when it runs.
///
/// Handlers are referenced by name once a task is serialized, so the name has
/// to be stable and unique within a [`HandlerRegistry`].
#[async_trait]
pub trait TaskHandler: Send + Sync + Debug {
    fn name(&self) -> &str;
    async fn run(&self, input: Value) -> Result<Value>;
}

type HandlerFn = dyn Fn(Value) -> Result<Value> + Send + Sync;

/// Wraps a plain closure as a [`TaskHandler`].
#[derive(Clone)]
pub struct FnHandler {
    name: String,
    f: Arc<HandlerFn>,
}

impl FnHandler {
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            f: Arc::new(f),
        }
    }
}

impl Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}

#[async_trait]
impl TaskHandler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: Value) -> Result<Value> {
        (self.f)(input)
    }
}

/// Name -> handler lookup used when compiling definitions and decoding tasks.
///
/// Cloning is cheap; clones share the same table.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<DashMap<String, Arc<dyn TaskHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the handlers from [`builtin`].
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(builtin::LogAction));
        registry.register(Arc::new(builtin::EchoAction));
        registry
    }

    /// Register a handler, replacing any previous one with the same name.
    pub fn register(&self, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(name).map(|h| h.value().clone())
    }

    pub fn resolve(&self, name: &str) -> crate::errors::Result<Arc<dyn TaskHandler>> {
        self.get(name)
            .ok_or_else(|| TaskflowError::UnknownHandler(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
