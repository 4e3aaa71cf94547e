use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use crate::errors::{Result, TaskflowError};
use crate::runtime::storage::{TaskRecord, TaskStore};

pub const DEFAULT_KEY_PREFIX: &str = "taskflow";

/// Task records stored as JSON strings, plus one set of task ids per flow.
pub struct RedisTaskStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisTaskStore {
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    /// Open a client for `url` with the default key prefix.
    pub fn open(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self::new(client, DEFAULT_KEY_PREFIX))
    }

    fn record_key(&self, id: &str) -> String {
        format!("{}:task:{}", self.key_prefix, id)
    }

    fn flow_key(&self, flow_id: &str) -> String {
        format!("{}:flow:{}:tasks", self.key_prefix, flow_id)
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn save(&self, record: &TaskRecord) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(record)?;

        let _: () = redis::pipe()
            .atomic()
            .set(self.record_key(&record.id), serialized)
            .ignore()
            .sadd(self.flow_key(&record.flow_id), &record.id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        debug!(task = %record.id, "wrote record to redis");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<TaskRecord> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(self.record_key(id)).await?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(TaskflowError::NotFound(id.to_string())),
        }
    }

    async fn list_flow(&self, flow_id: &str) -> Result<Vec<TaskRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut ids: Vec<String> = conn.smembers(self.flow_key(flow_id)).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ids.sort();

        let keys: Vec<String> = ids.iter().map(|id| self.record_key(id)).collect();
        // Explicit MGET: the typed helper sends GET for a single key.
        let raws: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let mut records = Vec::with_capacity(raws.len());
        for (id, raw) in ids.iter().zip(raws) {
            match raw {
                Some(json) => records.push(serde_json::from_str(&json)?),
                None => debug!(task = %id, "flow index points at a missing record"),
            }
        }
        Ok(records)
    }
}
