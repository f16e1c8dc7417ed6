use super::{BatchOutcome, EntityKind, FieldSpec, Record, RecordOutcome, RecordStore, SortOrder};
use crate::error::StoreError;
use crate::fields::ID_FIELD;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;

#[derive(Debug)]
struct Table {
    next_id: u64,
    rows: Vec<Record>,
}

impl Default for Table {
    fn default() -> Self {
        Table::from_rows(Vec::new())
    }
}

impl Table {
    fn from_rows(rows: Vec<Record>) -> Self {
        let next_id = rows.iter().filter_map(record_id).max().unwrap_or(0) + 1;
        Table { next_id, rows }
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.rows.iter().position(|row| record_id(row) == Some(id))
    }
}

#[derive(Debug, Default, Deserialize)]
struct Seed {
    #[serde(default)]
    task_c: Vec<Record>,
    #[serde(default)]
    category_c: Vec<Record>,
}

/// Record store over in-process vectors. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<EntityKind, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(kind: EntityKind, rows: Vec<Record>) -> Self {
        let mut tables = HashMap::new();
        tables.insert(kind, Table::from_rows(rows));
        MemoryStore {
            tables: Mutex::new(tables),
        }
    }

    /// Loads wire records from a JSON file of the form
    /// `{"task_c": [...], "category_c": [...]}`.
    pub async fn from_seed_file(path: &Path) -> Result<Self, StoreError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: Seed = serde_json::from_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            tasks = seed.task_c.len(),
            categories = seed.category_c.len(),
            "seeded in-memory store"
        );

        let mut tables = HashMap::new();
        tables.insert(EntityKind::Task, Table::from_rows(seed.task_c));
        tables.insert(EntityKind::Category, Table::from_rows(seed.category_c));
        Ok(MemoryStore {
            tables: Mutex::new(tables),
        })
    }
}

fn record_id(record: &Record) -> Option<u64> {
    record.get(ID_FIELD).and_then(Value::as_u64)
}

fn project(row: &Record, spec: &FieldSpec) -> Record {
    row.iter()
        .filter(|(key, _)| {
            key.as_str() == ID_FIELD || spec.fields.iter().any(|field| *field == key.as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all(&self, kind: EntityKind, spec: &FieldSpec) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Record> = match tables.get(&kind) {
            Some(table) => table.rows.iter().map(|row| project(row, spec)).collect(),
            None => Vec::new(),
        };
        rows.sort_by_key(|row| record_id(row).unwrap_or(0));
        if spec.order == SortOrder::Desc {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn fetch_one(&self, kind: EntityKind, id: u64) -> Result<Record, StoreError> {
        let tables = self.tables.lock().await;
        tables
            .get(&kind)
            .and_then(|table| table.position(id).map(|pos| table.rows[pos].clone()))
            .ok_or(StoreError::NotFound { kind, id })
    }

    async fn create(&self, kind: EntityKind, records: Vec<Record>) -> Result<BatchOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        let table = tables.entry(kind).or_default();

        let mut results = Vec::with_capacity(records.len());
        for mut record in records {
            let id = table.next_id;
            table.next_id += 1;
            record.insert(ID_FIELD.to_string(), Value::from(id));
            table.rows.push(record.clone());
            tracing::debug!(%kind, id, "created record");
            results.push(RecordOutcome::ok(Some(record)));
        }
        Ok(BatchOutcome { results })
    }

    async fn update(&self, kind: EntityKind, records: Vec<Record>) -> Result<BatchOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        let table = tables.entry(kind).or_default();

        // Reject the whole call before touching anything if a target is missing.
        for record in &records {
            if let Some(id) = record_id(record) {
                if table.position(id).is_none() {
                    return Err(StoreError::NotFound { kind, id });
                }
            }
        }

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let Some(pos) = record_id(&record).and_then(|id| table.position(id)) else {
                results.push(RecordOutcome::failed(format!("{} record is missing {}", kind, ID_FIELD)));
                continue;
            };
            let row = &mut table.rows[pos];
            for (key, value) in record {
                row.insert(key, value);
            }
            results.push(RecordOutcome::ok(Some(row.clone())));
        }
        Ok(BatchOutcome { results })
    }

    async fn delete(&self, kind: EntityKind, ids: &[u64]) -> Result<BatchOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        let table = tables.entry(kind).or_default();

        if let Some(&missing) = ids.iter().find(|&&id| table.position(id).is_none()) {
            return Err(StoreError::NotFound { kind, id: missing });
        }

        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(pos) = table.position(id) {
                table.rows.remove(pos);
                tracing::debug!(%kind, id, "deleted record");
            }
            results.push(RecordOutcome::ok(None));
        }
        Ok(BatchOutcome { results })
    }
}
