use crate::category_repo::CategoryRepository;
use crate::models::{Priority, Task};
use crate::parser::parse_task_input;
use crate::task_repo::TaskRepository;
use crate::validate::validate_task;
use crate::view::{FilterState, View};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;
use std::io;

pub struct App {
    pub tasks: TaskRepository,
    pub categories: CategoryRepository,
    pub filter: FilterState,
    pub visible: Vec<Task>,
    pub state: ListState,
    pub input_mode: InputMode,
    pub new_task_input: String,
    pub status: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputMode {
    Normal,
    Adding,
    Searching,
}

impl App {
    pub fn new(tasks: TaskRepository, categories: CategoryRepository) -> App {
        let mut app = App {
            tasks,
            categories,
            filter: FilterState::default(),
            visible: Vec::new(),
            state: ListState::default(),
            input_mode: InputMode::Normal,
            new_task_input: String::new(),
            status: None,
        };
        app.refresh_visible();
        app
    }

    /// Recomputes the visible list from the cache and keeps the selection in range.
    pub fn refresh_visible(&mut self) {
        self.visible = self.filter.apply(self.tasks.tasks());
        let selected = match (self.state.selected(), self.visible.len()) {
            (_, 0) => None,
            (Some(i), len) if i >= len => Some(len - 1),
            (Some(i), _) => Some(i),
            (None, _) => Some(0),
        };
        self.state.select(selected);
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.visible.get(i))
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub async fn load(&mut self) {
        if let Err(err) = self.categories.load().await {
            self.notify(format!("Failed to load categories: {}", err));
        }
        if let Err(err) = self.tasks.load().await {
            self.notify(format!("Failed to load tasks: {} (press r to retry)", err));
        }
        self.refresh_visible();
    }

    pub async fn switch_view(&mut self, view: View) {
        if let Err(err) = self.tasks.set_view(view).await {
            self.notify(format!("Failed to load tasks: {} (press r to retry)", err));
        }
        self.state.select(Some(0));
        self.refresh_visible();
    }

    pub fn next(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.visible.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.visible.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    async fn toggle_selected(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id) else {
            return;
        };
        match self.tasks.toggle_complete(id).await {
            Ok(Some(task)) if task.completed => self.notify("Task completed! Great job!"),
            Ok(Some(_)) => self.notify("Task marked as incomplete"),
            Ok(None) => {}
            Err(err) => self.notify(format!("Failed to update task: {}", err)),
        }
        self.refresh_visible();
    }

    async fn delete_selected(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id) else {
            return;
        };
        match self.tasks.delete(id).await {
            Ok(()) => self.notify("Task deleted successfully"),
            Err(err) => self.notify(format!("Failed to delete task: {}", err)),
        }
        self.refresh_visible();
    }

    async fn submit_new_task(&mut self) {
        let draft = parse_task_input(&self.new_task_input).into_new_task(self.tasks.today());
        if let Err(err) = validate_task(&draft) {
            self.notify(err.to_string());
            return;
        }
        match self.tasks.create(draft).await {
            Ok(_) => self.notify("Task created successfully!"),
            Err(err) => self.notify(format!("Failed to create task: {}", err)),
        }
        self.new_task_input.clear();
        self.input_mode = InputMode::Normal;
        self.refresh_visible();
    }

    fn toggle_priority(&mut self, priority: Priority) {
        self.filter.toggle_priority(priority);
        self.refresh_visible();
    }

    fn toggle_selected_category(&mut self) {
        if let Some(category) = self.selected_task().map(|t| t.category.clone()) {
            self.filter.toggle_category(&category);
            self.refresh_visible();
        }
    }

    pub async fn handle_input(&mut self, key: KeyEvent) -> io::Result<bool> {
        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(true),
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Char('1') => self.switch_view(View::All).await,
                KeyCode::Char('2') => self.switch_view(View::Today).await,
                KeyCode::Char('3') => self.switch_view(View::Upcoming).await,
                KeyCode::Char('4') => self.switch_view(View::Completed).await,
                KeyCode::Char(' ') => self.toggle_selected().await,
                KeyCode::Char('d') => self.delete_selected().await,
                KeyCode::Char('r') => {
                    self.status = None;
                    self.load().await;
                }
                KeyCode::Char('a') => {
                    self.new_task_input.clear();
                    self.input_mode = InputMode::Adding;
                }
                KeyCode::Char('/') => self.input_mode = InputMode::Searching,
                KeyCode::Char('c') => self.toggle_selected_category(),
                KeyCode::Char('h') => self.toggle_priority(Priority::High),
                KeyCode::Char('m') => self.toggle_priority(Priority::Medium),
                KeyCode::Char('l') => self.toggle_priority(Priority::Low),
                KeyCode::Char('x') => {
                    self.filter.clear();
                    self.refresh_visible();
                }
                _ => {}
            },

            InputMode::Adding => match key.code {
                KeyCode::Enter => {
                    if self.new_task_input.trim().is_empty() {
                        self.notify("Task title is required");
                    } else {
                        self.submit_new_task().await;
                    }
                }
                KeyCode::Char(c) => self.new_task_input.push(c),
                KeyCode::Backspace => {
                    self.new_task_input.pop();
                }
                KeyCode::Esc => {
                    self.new_task_input.clear();
                    self.input_mode = InputMode::Normal;
                }
                _ => {}
            },

            InputMode::Searching => {
                match key.code {
                    KeyCode::Enter => self.input_mode = InputMode::Normal,
                    KeyCode::Esc => {
                        self.filter.query.clear();
                        self.input_mode = InputMode::Normal;
                    }
                    KeyCode::Char(c) => self.filter.query.push(c),
                    KeyCode::Backspace => {
                        self.filter.query.pop();
                    }
                    _ => {}
                }
                self.refresh_visible();
            }
        }
        Ok(false)
    }
}
