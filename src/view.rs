use crate::models::{Priority, Task};
use chrono::{Duration, NaiveDate};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Named task subsets selected by due date and completion state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    All,
    Today,
    Upcoming,
    Completed,
    /// Any unrecognised view name: every incomplete task.
    #[default]
    Active,
}

impl View {
    pub const TABS: [View; 4] = [View::All, View::Today, View::Upcoming, View::Completed];

    pub fn parse(name: Option<&str>) -> View {
        name.and_then(|n| n.parse().ok()).unwrap_or(View::Active)
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Today => "Today's Tasks",
            View::Upcoming => "Upcoming Tasks",
            View::Completed => "Completed Tasks",
            View::All | View::Active => "All Tasks",
        }
    }

    pub fn matches(self, task: &Task, today: NaiveDate) -> bool {
        match self {
            View::All => true,
            View::Today => !task.completed && task.due_date == Some(today),
            View::Upcoming => {
                let horizon = today + Duration::days(7);
                !task.completed
                    && task
                        .due_date
                        .map_or(false, |due| due > today && due <= horizon)
            }
            View::Completed => task.completed,
            View::Active => !task.completed,
        }
    }

    pub fn select(self, tasks: Vec<Task>, today: NaiveDate) -> Vec<Task> {
        tasks
            .into_iter()
            .filter(|task| self.matches(task, today))
            .collect()
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(View::All),
            "today" => Ok(View::Today),
            "upcoming" => Ok(View::Upcoming),
            "completed" => Ok(View::Completed),
            other => Err(format!("unknown view '{}'", other)),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::All => "all",
            View::Today => "today",
            View::Upcoming => "upcoming",
            View::Completed => "completed",
            View::Active => "active",
        };
        f.write_str(name)
    }
}

/// Case-insensitive substring match on title, description or category.
pub fn matches_query(task: &Task, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(&needle)
        || task.description.to_lowercase().contains(&needle)
        || task.category.to_lowercase().contains(&needle)
}

pub fn search(tasks: &[Task], query: &str) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| matches_query(task, query))
        .cloned()
        .collect()
}

/// Display order: open before done, then priority high → low, then due date
/// ascending with undated tasks last.
pub fn display_order(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Search, narrow by category and priority (an empty selection keeps
/// everything), then sort with [`display_order`]. The sort is stable.
pub fn filter_and_sort(
    tasks: &[Task],
    query: &str,
    categories: &[String],
    priorities: &[Priority],
) -> Vec<Task> {
    let mut filtered: Vec<Task> = tasks
        .iter()
        .filter(|task| matches_query(task, query))
        .filter(|task| categories.is_empty() || categories.contains(&task.category))
        .filter(|task| priorities.is_empty() || priorities.contains(&task.priority))
        .cloned()
        .collect();
    filtered.sort_by(display_order);
    filtered
}

// Query and selections driving the visible task list
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterState {
    pub query: String,
    pub categories: Vec<String>,
    pub priorities: Vec<Priority>,
}

impl FilterState {
    pub fn toggle_category(&mut self, name: &str) {
        if let Some(pos) = self.categories.iter().position(|c| c == name) {
            self.categories.remove(pos);
        } else {
            self.categories.push(name.to_string());
        }
    }

    pub fn toggle_priority(&mut self, priority: Priority) {
        if let Some(pos) = self.priorities.iter().position(|p| *p == priority) {
            self.priorities.remove(pos);
        } else {
            self.priorities.push(priority);
        }
    }

    pub fn clear(&mut self) {
        *self = FilterState::default();
    }

    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        filter_and_sort(tasks, &self.query, &self.categories, &self.priorities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn task(id: u64, priority: Priority, completed: bool, due: &str) -> Task {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("task {}", id),
            "priority": priority,
            "completed": completed,
            "dueDate": due,
        }))
        .unwrap()
    }

    #[test]
    fn test_sort_order_scenario() {
        let tasks = vec![
            task(3, Priority::High, true, "2024-01-01"),
            task(2, Priority::Low, false, "2024-01-01"),
            task(1, Priority::High, false, "2024-01-01"),
        ];
        let ids: Vec<u64> = filter_and_sort(&tasks, "", &[], &[])
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_due_date_breaks_ties_and_undated_go_last() {
        let tasks = vec![
            task(1, Priority::Medium, false, ""),
            task(2, Priority::Medium, false, "2024-02-10"),
            task(3, Priority::Medium, false, "2024-02-01"),
        ];
        let ids: Vec<u64> = filter_and_sort(&tasks, "", &[], &[])
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_upcoming_window_includes_seventh_day_only() {
        let today = date("2024-03-10");
        let on_day_seven = task(1, Priority::Low, false, "2024-03-17");
        let on_day_eight = task(2, Priority::Low, false, "2024-03-18");
        let due_today = task(3, Priority::Low, false, "2024-03-10");
        assert!(View::Upcoming.matches(&on_day_seven, today));
        assert!(!View::Upcoming.matches(&on_day_eight, today));
        assert!(!View::Upcoming.matches(&due_today, today));
        assert!(View::Today.matches(&due_today, today));
    }

    #[test]
    fn test_unknown_view_means_active() {
        assert_eq!(View::parse(Some("someday")), View::Active);
        assert_eq!(View::parse(None), View::Active);
        assert_eq!(View::parse(Some("today")), View::Today);

        let today = date("2024-03-10");
        assert!(View::Active.matches(&task(1, Priority::Low, false, ""), today));
        assert!(!View::Active.matches(&task(2, Priority::Low, true, ""), today));
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let mut t = task(1, Priority::Low, false, "");
        t.description = "Call the PLUMBER".into();
        t.category = "Home".into();
        assert!(matches_query(&t, "plumber"));
        assert!(matches_query(&t, "HOME"));
        assert!(matches_query(&t, "   "));
        assert!(!matches_query(&t, "office"));
    }

    #[test]
    fn test_filter_toggles() {
        let mut state = FilterState::default();
        state.toggle_category("work");
        state.toggle_priority(Priority::High);
        state.toggle_category("work");
        assert!(state.categories.is_empty());
        assert_eq!(state.priorities, vec![Priority::High]);
        state.clear();
        assert_eq!(state, FilterState::default());
    }
}
