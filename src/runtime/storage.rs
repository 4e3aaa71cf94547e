use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TaskflowError};
use crate::runtime::codec::Serialized;

/// Persisted form of a task, keyed by the task id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub flow_id: String,
    pub serialized: Serialized,
}

// --- Interfaces ---

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert or overwrite the record stored under `record.id`.
    async fn save(&self, record: &TaskRecord) -> Result<()>;

    /// Fetch a record. A missing id is [`TaskflowError::NotFound`].
    async fn get(&self, id: &str) -> Result<TaskRecord>;

    /// All records whose `flow_id` matches, ordered by id.
    async fn list_flow(&self, flow_id: &str) -> Result<Vec<TaskRecord>>;
}

// --- In-Memory Implementation ---

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    // Map<TaskId, Record>
    records: DashMap<String, TaskRecord>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, record: &TaskRecord) -> Result<()> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<TaskRecord> {
        self.records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| TaskflowError::NotFound(id.to_string()))
    }

    async fn list_flow(&self, flow_id: &str) -> Result<Vec<TaskRecord>> {
        let mut records: Vec<TaskRecord> = self
            .records
            .iter()
            .filter(|r| r.value().flow_id == flow_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}
