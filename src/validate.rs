use crate::error::RepoError;
use crate::models::{CategoryPatch, NewCategory, NewTask};
use regex::Regex;
use std::sync::OnceLock;

fn hex_color() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("static regex"))
}

fn invalid(field: &'static str, message: &str) -> RepoError {
    RepoError::Validation {
        field,
        message: message.to_string(),
    }
}

// Form checks before a task is submitted
pub fn validate_task(task: &NewTask) -> Result<(), RepoError> {
    if task.title.trim().is_empty() {
        return Err(invalid("title", "Task title is required"));
    }
    if task.due_date.is_none() {
        return Err(invalid("dueDate", "Due date is required"));
    }
    if task.recurrence_interval == Some(0) {
        return Err(invalid("recurrenceInterval", "Interval must be at least 1"));
    }
    Ok(())
}

fn check_category_name(name: &str) -> Result<(), RepoError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("name", "Category name is required"));
    }
    if name.chars().count() < 2 {
        return Err(invalid("name", "Category name must be at least 2 characters"));
    }
    Ok(())
}

fn check_color(color: &str) -> Result<(), RepoError> {
    if !hex_color().is_match(color) {
        return Err(invalid("color", "Color must be a hex value like #5B4FE9"));
    }
    Ok(())
}

pub fn validate_category(category: &NewCategory) -> Result<(), RepoError> {
    check_category_name(&category.name)?;
    check_color(&category.color)
}

/// Checks only the fields the patch sets.
pub fn validate_category_patch(patch: &CategoryPatch) -> Result<(), RepoError> {
    if let Some(name) = &patch.name {
        check_category_name(name)?;
    }
    if let Some(color) = &patch.color {
        check_color(color)?;
    }
    Ok(())
}
