//! Persistence boundary: one CRUD contract over task and category records,
//! implemented by the HTTP record service client and by an in-memory store.

pub mod memory;
pub mod remote;

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub use memory::MemoryStore;
pub use remote::RemoteStore;

/// A record in wire field names (`title_c`, `Id`, ...).
pub type Record = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Task,
    Category,
}

impl EntityKind {
    /// Table name on the record service.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Task => "task_c",
            EntityKind::Category => "category_c",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Task => f.write_str("task"),
            EntityKind::Category => f.write_str("category"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Which fields to fetch and how to order the result by id.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub fields: Vec<&'static str>,
    pub order: SortOrder,
}

impl FieldSpec {
    pub fn new(fields: Vec<&'static str>, order: SortOrder) -> Self {
        FieldSpec { fields, order }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "fieldLabel")]
    pub field_label: String,
    pub message: String,
}

/// Per-record result of a batch write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl RecordOutcome {
    pub fn ok(data: Option<Record>) -> Self {
        RecordOutcome {
            success: true,
            data,
            message: None,
            errors: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        RecordOutcome {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: Vec::new(),
        }
    }

    /// Message for a failed record: the first field error if any, else the record message.
    pub fn failure_message(&self) -> Option<String> {
        if self.success {
            return None;
        }
        if let Some(err) = self.errors.first() {
            return Some(format!("{}: {}", err.field_label, err.message));
        }
        Some(
            self.message
                .clone()
                .unwrap_or_else(|| "record rejected".to_string()),
        )
    }
}

/// Outcome of a batch write. Successful records are applied even when others fail.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<RecordOutcome>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn first_failure(&self) -> Option<String> {
        self.failed().find_map(RecordOutcome::failure_message)
    }

    /// First successfully written record, or the first failure as an error.
    pub fn into_first_record(self) -> Result<Option<Record>, StoreError> {
        if let Some(message) = self.first_failure() {
            let failed = self.failed().count();
            tracing::error!(failed, %message, "batch write partially rejected");
            return Err(StoreError::Rejected(message));
        }
        Ok(self
            .results
            .into_iter()
            .find(|r| r.success)
            .and_then(|r| r.data))
    }

    /// Checks that every record in the batch was written.
    pub fn into_result(self) -> Result<(), StoreError> {
        self.into_first_record().map(|_| ())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_all(&self, kind: EntityKind, spec: &FieldSpec) -> Result<Vec<Record>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when no record has `id`.
    async fn fetch_one(&self, kind: EntityKind, id: u64) -> Result<Record, StoreError>;

    async fn create(&self, kind: EntityKind, records: Vec<Record>) -> Result<BatchOutcome, StoreError>;

    /// Each record must carry its `Id`; only the other fields it contains are changed.
    async fn update(&self, kind: EntityKind, records: Vec<Record>) -> Result<BatchOutcome, StoreError>;

    async fn delete(&self, kind: EntityKind, ids: &[u64]) -> Result<BatchOutcome, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_take_precedence_over_message() {
        let outcome = RecordOutcome {
            success: false,
            data: None,
            message: Some("generic".into()),
            errors: vec![FieldError {
                field_label: "Title".into(),
                message: "is required".into(),
            }],
        };
        assert_eq!(outcome.failure_message().as_deref(), Some("Title: is required"));
    }

    #[test]
    fn test_partial_batch_reports_first_failure() {
        let batch = BatchOutcome {
            results: vec![
                RecordOutcome::ok(None),
                RecordOutcome::failed("first"),
                RecordOutcome::failed("second"),
            ],
        };
        assert_eq!(batch.succeeded().count(), 1);
        match batch.into_result() {
            Err(StoreError::Rejected(message)) => assert_eq!(message, "first"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_empty_batch_is_ok() {
        assert_eq!(BatchOutcome::default().into_first_record().unwrap(), None);
    }
}
