use async_trait::async_trait;
use serde_json::Value;
use crate::actions::TaskHandler;
use anyhow::Result;
use tracing::info;

/// Logs its input and returns nothing.
#[derive(Debug)]
pub struct LogAction;

#[async_trait]
impl TaskHandler for LogAction {
    fn name(&self) -> &str {
        "log"
    }

    async fn run(&self, input: Value) -> Result<Value> {
        if let Some(msg) = input.get("msg").and_then(|v| v.as_str()) {
            info!("[LOG] {}", msg);
        } else {
            info!("[LOG] {:?}", input);
        }
        Ok(Value::Null)
    }
}

/// Returns its input unchanged.
#[derive(Debug)]
pub struct EchoAction;

#[async_trait]
impl TaskHandler for EchoAction {
    fn name(&self) -> &str {
        "echo"
    }

    async fn run(&self, input: Value) -> Result<Value> {
        Ok(input)
    }
}
