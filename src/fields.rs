//! UI ↔ wire field mapping.
//!
//! The record service names fields with a `_c` suffix in snake case while the
//! rest of the crate uses the camelCase shape of [`Task`] and [`Category`].
//! Each entity has a single table; both directions are driven from it.

use crate::error::RepoError;
use crate::models::{Category, Task};
use crate::store::{EntityKind, Record};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub const ID_FIELD: &str = "Id";
pub const NAME_FIELD: &str = "Name";

pub const TASK_FIELDS: &[(&str, &str)] = &[
    ("id", ID_FIELD),
    ("title", "title_c"),
    ("description", "description_c"),
    ("priority", "priority_c"),
    ("category", "category_c"),
    ("dueDate", "due_date_c"),
    ("completed", "completed_c"),
    ("createdAt", "created_at_c"),
    ("completedAt", "completed_at_c"),
    ("isRecurring", "is_recurring_c"),
    ("recurrencePattern", "recurrence_pattern_c"),
    ("recurrenceInterval", "recurrence_interval_c"),
    ("recurrenceEndType", "recurrence_end_type_c"),
    ("recurrenceEndDate", "recurrence_end_date_c"),
    ("recurrenceEndAfter", "recurrence_end_after_c"),
    ("parentRecurringTaskId", "parent_recurring_task_id_c"),
    ("estimatedTime", "estimated_time_c"),
    ("actualTime", "actual_time_c"),
    ("productivity", "productivity_c"),
];

pub const CATEGORY_FIELDS: &[(&str, &str)] = &[
    ("id", ID_FIELD),
    ("name", NAME_FIELD),
    ("color", "color_c"),
    ("icon", "icon_c"),
];

pub fn table(kind: EntityKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        EntityKind::Task => TASK_FIELDS,
        EntityKind::Category => CATEGORY_FIELDS,
    }
}

/// Wire fields requested when fetching records of `kind`.
///
/// Tasks also carry the record's display `Name`, which mirrors the title.
pub fn wire_fields(kind: EntityKind) -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = table(kind).iter().map(|(_, wire)| *wire).collect();
    if kind == EntityKind::Task {
        fields.insert(1, NAME_FIELD);
    }
    fields
}

pub fn wire_name(kind: EntityKind, ui: &str) -> Option<&'static str> {
    table(kind)
        .iter()
        .find(|(name, _)| *name == ui)
        .map(|(_, wire)| *wire)
}

pub fn ui_name(kind: EntityKind, wire: &str) -> Option<&'static str> {
    table(kind)
        .iter()
        .find(|(_, name)| *name == wire)
        .map(|(ui, _)| *ui)
}

/// Renames a UI-shaped map to wire names.
///
/// A UI key without a table entry is a programming error and fails loudly
/// rather than being dropped.
pub fn to_wire(kind: EntityKind, ui: Map<String, Value>) -> Result<Record, RepoError> {
    let mut wire = Map::with_capacity(ui.len() + 1);
    for (key, value) in ui {
        let name = wire_name(kind, &key).ok_or_else(|| {
            RepoError::Mapping(format!("{} field '{}' has no wire name", kind, key))
        })?;
        wire.insert(name.to_string(), value);
    }

    if kind == EntityKind::Task {
        if let Some(title) = wire.get("title_c").cloned() {
            wire.insert(NAME_FIELD.to_string(), title);
        }
    }
    Ok(wire)
}

/// Renames a wire record to UI names. System fields outside the table are
/// skipped and reported at trace level.
pub fn from_wire(kind: EntityKind, wire: Record) -> Map<String, Value> {
    let mut ui = Map::with_capacity(wire.len());
    for (key, value) in wire {
        match ui_name(kind, &key) {
            Some(name) => {
                ui.insert(name.to_string(), value);
            }
            None if kind == EntityKind::Task && key == NAME_FIELD => {}
            None => tracing::trace!(%kind, field = %key, "skipping unmapped wire field"),
        }
    }
    ui
}

pub fn encode<T: Serialize>(kind: EntityKind, value: &T) -> Result<Record, RepoError> {
    match serde_json::to_value(value).map_err(|e| RepoError::Mapping(e.to_string()))? {
        Value::Object(map) => to_wire(kind, map),
        other => Err(RepoError::Mapping(format!(
            "expected an object for {}, got {}",
            kind, other
        ))),
    }
}

pub fn decode<T: DeserializeOwned>(kind: EntityKind, wire: Record) -> Result<T, RepoError> {
    serde_json::from_value(Value::Object(from_wire(kind, wire)))
        .map_err(|e| RepoError::Mapping(format!("{}: {}", kind, e)))
}

pub fn decode_task(wire: Record) -> Result<Task, RepoError> {
    decode(EntityKind::Task, wire)
}

pub fn decode_category(wire: Record) -> Result<Category, RepoError> {
    decode(EntityKind::Category, wire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTask, Priority, TaskPatch};
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashSet;

    fn full_task() -> Task {
        Task {
            id: 3,
            title: "Write report".into(),
            description: "quarterly".into(),
            priority: Priority::High,
            category: "work".into(),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            completed: true,
            created_at: Some(Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()),
            completed_at: Some(Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap()),
            is_recurring: true,
            recurrence_pattern: Some(crate::models::RecurrencePattern::Weekly),
            recurrence_interval: Some(2),
            recurrence_end_type: Some(crate::models::RecurrenceEndType::After),
            recurrence_end_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            recurrence_end_after: Some(10),
            parent_recurring_task_id: Some(1),
            estimated_time: Some(4.0),
            actual_time: Some(24),
            productivity: Some(17),
        }
    }

    #[test]
    fn test_every_task_field_has_a_wire_name() {
        let value = serde_json::to_value(full_task()).unwrap();
        let keys: HashSet<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        let mapped: HashSet<&str> = TASK_FIELDS.iter().map(|(ui, _)| *ui).collect();
        assert_eq!(keys, mapped);
    }

    #[test]
    fn test_every_category_field_has_a_wire_name() {
        let category = Category {
            id: 1,
            name: "Home".into(),
            color: "#FF6B6B".into(),
            icon: "Home".into(),
        };
        let value = serde_json::to_value(category).unwrap();
        let keys: HashSet<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        let mapped: HashSet<&str> = CATEGORY_FIELDS.iter().map(|(ui, _)| *ui).collect();
        assert_eq!(keys, mapped);
    }

    #[test]
    fn test_wire_names_are_unique() {
        for kind in [EntityKind::Task, EntityKind::Category] {
            let fields = wire_fields(kind);
            let unique: HashSet<&str> = fields.iter().copied().collect();
            assert_eq!(unique.len(), fields.len(), "{}", kind);
        }
    }

    #[test]
    fn test_task_survives_wire_trip() {
        let task = full_task();
        let wire = encode(EntityKind::Task, &task).unwrap();
        assert_eq!(wire.get("title_c"), Some(&json!("Write report")));
        assert_eq!(wire.get(NAME_FIELD), Some(&json!("Write report")));
        assert_eq!(wire.get("due_date_c"), Some(&json!("2024-05-01")));
        assert_eq!(decode_task(wire).unwrap(), task);
    }

    #[test]
    fn test_patch_maps_only_present_keys() {
        let patch = TaskPatch {
            priority: Some(Priority::Low),
            estimated_time: Some(None),
            ..Default::default()
        };
        let wire = encode(EntityKind::Task, &patch).unwrap();
        assert_eq!(
            Value::Object(wire),
            json!({ "priority_c": "low", "estimated_time_c": null })
        );
    }

    #[test]
    fn test_new_task_has_no_unmapped_fields() {
        assert!(encode(EntityKind::Task, &NewTask::new("x")).is_ok());
    }

    #[test]
    fn test_unknown_ui_field_is_rejected() {
        let mut map = Map::new();
        map.insert("colour".into(), json!("red"));
        assert!(matches!(
            to_wire(EntityKind::Category, map),
            Err(RepoError::Mapping(_))
        ));
    }

    #[test]
    fn test_system_fields_are_skipped_on_read() {
        let wire: Record = serde_json::from_value(json!({
            "Id": 5,
            "Name": "Errands",
            "color_c": "#34D399",
            "icon_c": "ShoppingBag",
            "CreatedOn": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let category = decode_category(wire).unwrap();
        assert_eq!(category.id, 5);
        assert_eq!(category.name, "Errands");
        assert_eq!(category.icon, "ShoppingBag");
    }
}
