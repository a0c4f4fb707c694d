use crate::models::ProducerId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// What a provenance record accounts for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ProvenanceScope {
    /// Lineage accrued while building one bundle
    Bundle { index: usize },
    /// Everything the task read, persisted once at task end
    Task,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub task_id: i64,
    pub scope: ProvenanceScope,
    pub producers: BTreeSet<ProducerId>,
    pub recorded_at: DateTime<Utc>,
}

impl ProvenanceRecord {
    pub fn for_bundle(task_id: i64, index: usize, producers: BTreeSet<ProducerId>) -> Self {
        Self {
            task_id,
            scope: ProvenanceScope::Bundle { index },
            producers,
            recorded_at: Utc::now(),
        }
    }

    pub fn for_task(task_id: i64, producers: BTreeSet<ProducerId>) -> Self {
        Self {
            task_id,
            scope: ProvenanceScope::Task,
            producers,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProvenanceError {
    #[error("Failed to persist provenance for task {task_id}: {message}")]
    PersistFailed { task_id: i64, message: String },
}

impl ProvenanceError {
    pub fn persist_failed(task_id: i64, message: impl Into<String>) -> Self {
        Self::PersistFailed {
            task_id,
            message: message.into(),
        }
    }
}

pub type ProvenanceResult<T> = Result<T, ProvenanceError>;

/// Durable accountability trail for the producers a task read from.
#[async_trait]
pub trait ProvenanceSink: Send + Sync {
    async fn persist(&self, record: ProvenanceRecord) -> ProvenanceResult<()>;
}

/// Sink that keeps records in memory, in arrival order
#[derive(Debug, Default)]
pub struct InMemoryProvenanceSink {
    records: Mutex<Vec<ProvenanceRecord>>,
}

impl InMemoryProvenanceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ProvenanceRecord> {
        self.records.lock().clone()
    }

    /// Records persisted for individual bundles of `task_id`
    pub fn bundle_records(&self, task_id: i64) -> Vec<ProvenanceRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.task_id == task_id && matches!(r.scope, ProvenanceScope::Bundle { .. }))
            .cloned()
            .collect()
    }

    pub fn task_record(&self, task_id: i64) -> Option<ProvenanceRecord> {
        self.records
            .lock()
            .iter()
            .find(|r| r.task_id == task_id && r.scope == ProvenanceScope::Task)
            .cloned()
    }
}

#[async_trait]
impl ProvenanceSink for InMemoryProvenanceSink {
    async fn persist(&self, record: ProvenanceRecord) -> ProvenanceResult<()> {
        self.records.lock().push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_sink_separates_scopes() {
        let sink = InMemoryProvenanceSink::new();
        sink.persist(ProvenanceRecord::for_bundle(1, 0, BTreeSet::from([ProducerId(4)])))
            .await
            .unwrap();
        sink.persist(ProvenanceRecord::for_task(1, BTreeSet::from([ProducerId(4)])))
            .await
            .unwrap();
        sink.persist(ProvenanceRecord::for_bundle(2, 0, BTreeSet::new()))
            .await
            .unwrap();

        assert_eq!(sink.bundle_records(1).len(), 1);
        assert!(sink.task_record(1).is_some());
        assert!(sink.task_record(2).is_none());
    }

    #[test]
    fn test_scope_serializes_tagged() {
        let json = serde_json::to_value(ProvenanceScope::Bundle { index: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"scope": "bundle", "index": 3}));
    }
}
