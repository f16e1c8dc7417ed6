use crate::clock::Clock;
use crate::error::RepoError;
use crate::fields;
use crate::models::{NewTask, Priority, Task, TaskPatch};
use crate::stats::{compute_statistics, Statistics};
use crate::store::{EntityKind, FieldSpec, Record, RecordStore, SortOrder};
use crate::view::{self, View};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const KIND: EntityKind = EntityKind::Task;

/// Whole hours between creation and completion, rounded to nearest.
pub fn actual_hours(created_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> i64 {
    let millis = (completed_at - created_at).num_milliseconds() as f64;
    (millis / 3_600_000.0).round() as i64
}

/// Estimated over actual time as a rounded percentage. Sub-hour completions
/// (actual of 0) are measured against one hour.
pub fn productivity(estimated_hours: f64, actual_hours: i64) -> i64 {
    let actual = actual_hours.max(1) as f64;
    (estimated_hours / actual * 100.0).round() as i64
}

/// Tasks of the current view plus the load state shown alongside them.
///
/// The cache only changes after the store has confirmed a write, and only
/// holds tasks that match the loaded view.
pub struct TaskRepository {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    view: View,
    tasks: Vec<Task>,
    loading: bool,
    error: Option<String>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, view: View) -> Self {
        TaskRepository {
            store,
            clock,
            view,
            tasks: Vec::new(),
            loading: false,
            error: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn find(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn statistics(&self) -> Statistics {
        compute_statistics(&self.tasks, self.clock.today())
    }

    /// Every task in the store, newest first.
    pub async fn get_all(&self) -> Result<Vec<Task>, RepoError> {
        let spec = FieldSpec::new(fields::wire_fields(KIND), SortOrder::Desc);
        let rows = self.store.fetch_all(KIND, &spec).await.map_err(|err| {
            tracing::error!(error = %err, "error fetching tasks");
            RepoError::from_load(err)
        })?;
        rows.into_iter()
            .map(|row| fields::decode_task(row).map_err(RepoError::on_read))
            .collect()
    }

    pub async fn get_by_id(&self, id: u64) -> Result<Task, RepoError> {
        let row = self.store.fetch_one(KIND, id).await.map_err(|err| {
            tracing::error!(id, error = %err, "error fetching task");
            RepoError::from_load(err)
        })?;
        fields::decode_task(row).map_err(RepoError::on_read)
    }

    pub async fn load_by_view(&self, view: View) -> Result<Vec<Task>, RepoError> {
        let all = self.get_all().await?;
        Ok(view.select(all, self.clock.today()))
    }

    pub async fn search_tasks(&self, query: &str) -> Result<Vec<Task>, RepoError> {
        let all = self.get_all().await?;
        if query.trim().is_empty() {
            return Ok(all);
        }
        Ok(view::search(&all, query))
    }

    pub async fn tasks_by_category(&self, category: &str) -> Result<Vec<Task>, RepoError> {
        let all = self.get_all().await?;
        Ok(all.into_iter().filter(|t| t.category == category).collect())
    }

    pub async fn tasks_by_priority(&self, priority: Priority) -> Result<Vec<Task>, RepoError> {
        let all = self.get_all().await?;
        Ok(all.into_iter().filter(|t| t.priority == priority).collect())
    }

    /// Reloads the current view into the cache. On failure the error message
    /// is kept for display and the previous tasks are left in place.
    pub async fn load(&mut self) -> Result<(), RepoError> {
        self.loading = true;
        self.error = None;
        let result = self.load_by_view(self.view).await;
        self.loading = false;

        match result {
            Ok(tasks) => {
                tracing::debug!(view = %self.view, count = tasks.len(), "loaded tasks");
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(view = %self.view, error = %err, "failed to load tasks");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn refetch(&mut self) -> Result<(), RepoError> {
        self.load().await
    }

    pub async fn set_view(&mut self, view: View) -> Result<(), RepoError> {
        self.view = view;
        self.load().await
    }

    /// Replaces the cache with tasks matching `query`.
    pub async fn search(&mut self, query: &str) -> Result<(), RepoError> {
        self.loading = true;
        self.error = None;
        let result = self.search_tasks(query).await;
        self.loading = false;

        match result {
            Ok(tasks) => {
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(query, error = %err, "failed to search tasks");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn create(&mut self, new_task: NewTask) -> Result<Task, RepoError> {
        let mut ui = object(serde_json::to_value(&new_task))?;
        ui.insert("completed".into(), json!(false));
        ui.insert("createdAt".into(), json!(self.clock.now()));
        ui.insert("completedAt".into(), Value::Null);
        ui.insert("actualTime".into(), Value::Null);
        ui.insert("productivity".into(), Value::Null);
        let wire = fields::to_wire(KIND, ui)?;

        let created = self
            .store
            .create(KIND, vec![wire])
            .await
            .and_then(|batch| batch.into_first_record())
            .map_err(|err| {
                tracing::error!(error = %err, "failed to create task");
                RepoError::from_write(err)
            })?
            .ok_or_else(|| RepoError::Write("store returned no task".into()))?;
        let task = fields::decode_task(created)?;

        tracing::info!(id = task.id, title = %task.title, "task created");
        if self.view.matches(&task, self.clock.today()) {
            self.tasks.insert(0, task.clone());
        }
        Ok(task)
    }

    /// Applies the keys present in `patch`. Setting `completed` stamps or
    /// clears `completedAt`; an open → done transition also records
    /// `actualTime` and, when an estimate exists, `productivity`.
    pub async fn update(&mut self, id: u64, patch: TaskPatch) -> Result<Task, RepoError> {
        let current = self.get_by_id(id).await?;
        let wire = self.patch_record(&current, &patch)?;

        let written = self
            .store
            .update(KIND, vec![wire])
            .await
            .and_then(|batch| batch.into_first_record())
            .map_err(|err| {
                tracing::error!(id, error = %err, "failed to update task");
                RepoError::from_write(err)
            })?;
        let updated = match written {
            Some(row) => fields::decode_task(row)?,
            None => self.get_by_id(id).await?,
        };

        match patch.completed {
            Some(true) => tracing::info!(id, "task completed"),
            Some(false) => tracing::info!(id, "task marked as incomplete"),
            None => tracing::info!(id, "task updated"),
        }

        if self.view.matches(&updated, self.clock.today()) {
            if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == id) {
                *slot = updated.clone();
            }
        } else {
            self.tasks.retain(|t| t.id != id);
        }
        Ok(updated)
    }

    fn patch_record(&self, current: &Task, patch: &TaskPatch) -> Result<Record, RepoError> {
        let mut ui = object(serde_json::to_value(patch))?;
        ui.insert("id".into(), json!(current.id));

        if let Some(done) = patch.completed {
            let now = self.clock.now();
            let stamp = if done { json!(now) } else { Value::Null };
            ui.insert("completedAt".into(), stamp);

            if done && !current.completed {
                if let Some(created_at) = current.created_at {
                    let actual = actual_hours(created_at, now);
                    ui.insert("actualTime".into(), json!(actual));

                    let estimated = patch.estimated_time.unwrap_or(current.estimated_time);
                    if let Some(estimated) = estimated.filter(|e| *e > 0.0) {
                        ui.insert("productivity".into(), json!(productivity(estimated, actual)));
                    }
                }
            }
        }

        fields::to_wire(KIND, ui)
    }

    pub async fn delete(&mut self, id: u64) -> Result<(), RepoError> {
        self.store
            .delete(KIND, &[id])
            .await
            .and_then(|batch| batch.into_result())
            .map_err(|err| {
                tracing::error!(id, error = %err, "failed to delete task");
                RepoError::from_write(err)
            })?;

        tracing::info!(id, "task deleted");
        self.tasks.retain(|t| t.id != id);
        Ok(())
    }

    /// Flips completion of a cached task. Ids not in the cache are ignored.
    pub async fn toggle_complete(&mut self, id: u64) -> Result<Option<Task>, RepoError> {
        let Some(done) = self.find(id).map(|t| t.completed) else {
            return Ok(None);
        };
        self.update(id, TaskPatch::completed(!done)).await.map(Some)
    }
}

fn object(value: Result<Value, serde_json::Error>) -> Result<Map<String, Value>, RepoError> {
    match value.map_err(|e| RepoError::Mapping(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(RepoError::Mapping(format!("expected an object, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_actual_hours_rounds_to_nearest() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        assert_eq!(actual_hours(created, created + chrono::Duration::minutes(89)), 1);
        assert_eq!(actual_hours(created, created + chrono::Duration::minutes(90)), 2);
        assert_eq!(actual_hours(created, created + chrono::Duration::minutes(20)), 0);
    }

    #[test]
    fn test_productivity_guards_zero_hours() {
        assert_eq!(productivity(2.0, 4), 50);
        assert_eq!(productivity(3.0, 0), 300);
        assert_eq!(productivity(1.0, 3), 33);
    }
}
