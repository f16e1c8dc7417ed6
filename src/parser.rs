use crate::models::{NewTask, Priority};
use chrono::NaiveDate;
use regex::Regex;

#[derive(Debug, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl ParsedTask {
    /// Builds a draft, using `default_due` when no `@date` was given.
    pub fn into_new_task(self, default_due: NaiveDate) -> NewTask {
        let mut task = NewTask::new(self.title).due(self.due_date.unwrap_or(default_due));
        if let Some(priority) = self.priority {
            task = task.priority(priority);
        }
        if let Some(category) = self.category {
            task = task.category(category);
        }
        task
    }
}

/// Parses a quick-add line: `!high` (or `!1`..`!3`) for priority, `#name`
/// for category and `@YYYY-MM-DD` for the due date. The first valid marker
/// of each kind wins; markers are removed from the title.
pub fn parse_task_input(input: &str) -> ParsedTask {
    let priority_re = Regex::new(r"!(\w+)\s*").unwrap();
    let category_re = Regex::new(r"#([\w-]+)\s*").unwrap();
    let due_re = Regex::new(r"@(\d{4}-\d{2}-\d{2})\s*").unwrap();

    // Priority
    let priority = priority_re
        .captures_iter(input)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| m.as_str().parse::<Priority>().ok());

    // Category
    let category = category_re
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    // Due date
    let due_date = due_re
        .captures_iter(input)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok());

    let title = priority_re.replace_all(input, "");
    let title = category_re.replace_all(&title, "");
    let title = due_re.replace_all(&title, "");

    let title = Regex::new(r"\s+")
        .unwrap()
        .replace_all(&title, " ")
        .trim()
        .to_string();

    ParsedTask {
        title,
        priority,
        category,
        due_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_priority_in_middle() {
        let input = "Update !high software documentation";
        let result = parse_task_input(input);
        assert_eq!(result.title, "Update software documentation");
        assert_eq!(result.priority, Some(Priority::High));
    }

    #[test]
    fn test_parse_with_numeric_priority_and_extra_spaces() {
        let input = "Fix bugs !1    in the code";
        let result = parse_task_input(input);
        assert_eq!(result.title, "Fix bugs in the code");
        assert_eq!(result.priority, Some(Priority::Low));
    }

    #[test]
    fn test_parse_with_category_and_due_date() {
        let input = "Buy   milk #shopping @2024-05-02";
        let expected = ParsedTask {
            title: "Buy milk".to_string(),
            priority: None,
            category: Some("shopping".to_string()),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 2),
        };
        assert_eq!(parse_task_input(input), expected);
    }

    #[test]
    fn test_parse_with_multiple_priorities_first_valid_wins() {
        let input = "  !urgent !medium Organize team building !high event ";
        let result = parse_task_input(input);
        assert_eq!(result.title, "Organize team building event");
        assert_eq!(result.priority, Some(Priority::Medium));
    }

    #[test]
    fn test_parse_with_invalid_priority_and_date() {
        let input = "Check logs !8 @2024-13-40   immediately";
        let result = parse_task_input(input);
        assert_eq!(result.title, "Check logs immediately");
        assert_eq!(result.priority, None);
        assert_eq!(result.due_date, None);
    }

    #[test]
    fn test_into_new_task_applies_defaults() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let task = parse_task_input("Water plants").into_new_task(today);
        assert_eq!(task.due_date, Some(today));
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, "work");
    }
}
