use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CATEGORY: &str = "work";
pub const DEFAULT_CATEGORY_COLOR: &str = "#5B4FE9";
pub const DEFAULT_CATEGORY_ICON: &str = "Tag";

// Priority levels, ordered low < medium < high
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Sort weight used by the task list: high(3) > medium(2) > low(1).
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "1" => Ok(Priority::Low),
            "medium" | "2" => Ok(Priority::Medium),
            "high" | "3" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceEndType {
    Never,
    On,
    After,
}

// Task as the UI sees it. Wire names live in `fields`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "priority_or_default")]
    pub priority: Priority,
    #[serde(default = "default_category", deserialize_with = "category_or_default")]
    pub category: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default)]
    pub recurrence_interval: Option<u32>,
    #[serde(default)]
    pub recurrence_end_type: Option<RecurrenceEndType>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub recurrence_end_after: Option<u32>,
    #[serde(default)]
    pub parent_recurring_task_id: Option<u64>,
    #[serde(default)]
    pub estimated_time: Option<f64>,
    #[serde(default)]
    pub actual_time: Option<i64>,
    #[serde(default)]
    pub productivity: Option<i64>,
}

// Input for creating a task. Id, timestamps and derived fields are assigned on create.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default)]
    pub recurrence_interval: Option<u32>,
    #[serde(default)]
    pub recurrence_end_type: Option<RecurrenceEndType>,
    #[serde(default)]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub recurrence_end_after: Option<u32>,
    #[serde(default)]
    pub parent_recurring_task_id: Option<u64>,
    #[serde(default)]
    pub estimated_time: Option<f64>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            category: default_category(),
            due_date: None,
            is_recurring: false,
            recurrence_pattern: None,
            recurrence_interval: None,
            recurrence_end_type: None,
            recurrence_end_date: None,
            recurrence_end_after: None,
            parent_recurring_task_id: None,
            estimated_time: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn estimated(mut self, hours: f64) -> Self {
        self.estimated_time = Some(hours);
        self
    }
}

/// Partial update of a task. `None` leaves a field unchanged; for nullable
/// fields `Some(None)` clears it.
///
/// `completedAt`, `actualTime` and `productivity` are derived by the
/// repository from `completed` and are not part of the patch.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<Option<RecurrencePattern>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_interval: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_end_type: Option<Option<RecurrenceEndType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_end_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_end_after: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_recurring_task_id: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<Option<f64>>,
}

impl TaskPatch {
    pub fn completed(done: bool) -> Self {
        TaskPatch {
            completed: Some(done),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default = "default_color", deserialize_with = "color_or_default")]
    pub color: String,
    #[serde(default = "default_icon", deserialize_with = "icon_or_default")]
    pub icon: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_icon")]
    pub icon: String,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        NewCategory {
            name: name.into(),
            color: default_color(),
            icon: default_icon(),
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

fn default_icon() -> String {
    DEFAULT_CATEGORY_ICON.to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_blank_or(value: Option<String>, fallback: fn() -> String) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => fallback(),
    }
}

// Blank, null or unrecognised priorities read as medium rather than
// failing the whole record.
fn priority_or_default<'de, D>(deserializer: D) -> Result<Priority, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Ok(Priority::default()),
    };
    if raw.trim().is_empty() {
        return Ok(Priority::default());
    }
    Ok(raw.parse().unwrap_or_else(|err: String| {
        tracing::warn!(error = %err, "falling back to default priority");
        Priority::default()
    }))
}

fn category_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_blank_or(Option::deserialize(deserializer)?, default_category))
}

fn color_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_blank_or(Option::deserialize(deserializer)?, default_color))
}

fn icon_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_blank_or(Option::deserialize(deserializer)?, default_icon))
}

// Empty strings on the wire stand for "no value"
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
