use crate::app::{App, InputMode};
use crate::models::{Priority, Task};
use crate::stats::Statistics;
use crate::view::View;
use crossterm::event::{self, Event as CEvent};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((r.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((r.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// `#RRGGBB` to a terminal color; anything else renders uncolored.
pub fn hex_to_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Color::Reset;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Reset,
    }
}

// 60% of the terminal, less the border
fn input_width(total: u16) -> u16 {
    ((u32::from(total) * 60 / 100) as u16).saturating_sub(2)
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn bold(label: &'static str) -> Span<'static> {
    Span::styled(label, Style::default().add_modifier(Modifier::BOLD))
}

fn key_hint(key: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Red)),
        Span::raw(action),
    ]
}

fn get_legend(input_mode: InputMode) -> Text<'static> {
    let hints: Vec<[Span<'static>; 2]> = match input_mode {
        InputMode::Normal => vec![
            key_hint(" q ", ": Quit "),
            key_hint(" j/k ", ": Move "),
            key_hint(" 1-4 ", ": View "),
            key_hint(" Space ", ": Toggle Done "),
            key_hint(" a ", ": Add "),
            key_hint(" d ", ": Delete "),
            key_hint(" / ", ": Search "),
            key_hint(" c ", ": Filter Category "),
            key_hint(" h/m/l ", ": Filter Priority "),
            key_hint(" x ", ": Clear Filters "),
            key_hint(" r ", ": Reload "),
        ],
        InputMode::Adding | InputMode::Searching => vec![
            key_hint(" Enter ", ": Submit "),
            key_hint(" Esc ", ": Cancel "),
        ],
    };
    Text::from(Line::from(hints.into_iter().flatten().collect::<Vec<_>>()))
}

fn task_item<'a>(task: &'a Task, app: &App) -> ListItem<'a> {
    let (color, _) = app.categories.appearance(&task.category);
    let mut spans = vec![Span::styled(
        "● ",
        Style::default().fg(priority_color(task.priority)),
    )];
    if task.completed {
        spans.push(Span::styled("DONE ", Style::default().fg(Color::Green)));
    }
    spans.push(Span::raw(task.title.as_str()));
    spans.push(Span::styled(
        format!("  [{}]", task.category),
        Style::default().fg(hex_to_color(color)),
    ));
    if let Some(due) = task.due_date {
        spans.push(Span::styled(
            format!("  {}", due.format("%b %d")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn stats_lines(stats: &Statistics) -> Vec<Line<'static>> {
    let week = stats
        .weekly_completion
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    vec![
        Line::from(vec![bold("Total: "), Span::raw(stats.total.to_string())]),
        Line::from(vec![bold("Completed: "), Span::raw(stats.completed.to_string())]),
        Line::from(vec![bold("In Progress: "), Span::raw(stats.pending.to_string())]),
        Line::from(vec![
            bold("High Priority: "),
            Span::raw(format!(
                "{} open / {} done",
                stats.high_priority, stats.high_priority_completed
            )),
        ]),
        Line::from(vec![bold("Progress: "), Span::raw(format!("{}%", stats.completion_rate))]),
        Line::from(vec![bold("Last 7 days: "), Span::raw(week)]),
        Line::from(vec![bold("Velocity: "), Span::raw(format!("{:.1}/day", stats.velocity))]),
    ]
}

fn detail_lines(task: &Task) -> Vec<Line<'static>> {
    let due = task
        .due_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "No due date".to_string());
    let mut lines = vec![
        Line::from(vec![bold("Title: "), Span::raw(task.title.clone())]),
        Line::from(vec![bold("Due Date: "), Span::raw(due)]),
        Line::from(vec![
            bold("Priority: "),
            Span::styled(
                task.priority.to_string(),
                Style::default().fg(priority_color(task.priority)),
            ),
        ]),
        Line::from(vec![bold("Category: "), Span::raw(task.category.clone())]),
    ];
    if let Some(pattern) = task.recurrence_pattern.filter(|_| task.is_recurring) {
        lines.push(Line::from(vec![
            bold("Repeats: "),
            Span::raw(format!(
                "{:?} every {}",
                pattern,
                task.recurrence_interval.unwrap_or(1)
            )),
        ]));
    }
    if let Some(productivity) = task.productivity {
        lines.push(Line::from(vec![
            bold("Productivity: "),
            Span::raw(format!("{}%", productivity)),
        ]));
    }
    lines.push(Line::from(bold("Description: ")));
    if task.description.trim().is_empty() {
        lines.push(Line::from(Span::raw("No description")));
    } else {
        lines.extend(
            task.description
                .lines()
                .map(|line| Line::from(Span::raw(line.to_string()))),
        );
    }
    lines
}

fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(size);

    let current = View::TABS
        .iter()
        .position(|v| *v == app.tasks.view())
        .unwrap_or(0);
    let tabs = Tabs::new(View::TABS.iter().map(|v| v.title()).collect::<Vec<_>>())
        .block(Block::default().borders(Borders::ALL).title("taskdeck"))
        .select(current)
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);

    let list_title = format!("{} ({})", app.tasks.view().title(), app.visible.len());
    let list_block = Block::default().borders(Borders::ALL).title(list_title);
    if let Some(err) = app.tasks.error() {
        let paragraph = Paragraph::new(format!("{}\n\nPress r to retry", err))
            .style(Style::default().fg(Color::Red))
            .block(list_block)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, body[0]);
    } else if app.visible.is_empty() {
        let paragraph = Paragraph::new("No tasks found").block(list_block);
        f.render_widget(paragraph, body[0]);
    } else {
        let items: Vec<ListItem> = app.visible.iter().map(|t| task_item(t, app)).collect();
        let list = List::new(items)
            .block(list_block)
            .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            .highlight_symbol(">> ");
        f.render_stateful_widget(list, body[0], &mut app.state);
    }

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(body[1]);

    let stats = Paragraph::new(stats_lines(&app.tasks.statistics()))
        .block(Block::default().borders(Borders::ALL).title("Progress"));
    f.render_widget(stats, side[0]);

    let detail_block = Block::default().borders(Borders::ALL).title("Task Details");
    let detail = match app.selected_task() {
        Some(task) => Paragraph::new(detail_lines(task)),
        None => Paragraph::new("Select a task to view details"),
    };
    f.render_widget(detail.block(detail_block).wrap(Wrap { trim: true }), side[1]);

    let mut filters = Vec::new();
    if !app.filter.query.is_empty() {
        filters.push(format!("search \"{}\"", app.filter.query));
    }
    if !app.filter.categories.is_empty() {
        filters.push(format!("categories: {}", app.filter.categories.join(", ")));
    }
    if !app.filter.priorities.is_empty() {
        let names: Vec<&str> = app.filter.priorities.iter().map(|p| p.as_str()).collect();
        filters.push(format!("priorities: {}", names.join(", ")));
    }
    let status = match &app.status {
        Some(message) => message.clone(),
        None => filters.join(" | "),
    };
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Cyan)),
        chunks[2],
    );

    let legend = Paragraph::new(get_legend(app.input_mode))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(legend, chunks[3]);

    let (title, text) = match app.input_mode {
        InputMode::Normal => return,
        InputMode::Adding => (
            "New Task (!priority #category @YYYY-MM-DD)",
            app.new_task_input.as_str(),
        ),
        InputMode::Searching => ("Search", app.filter.query.as_str()),
    };
    let popup_width = input_width(size.width);
    let popup_area = centered_rect_absolute(popup_width + 2, 3, chunks[1]);
    let input = Paragraph::new(text)
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Green)),
        );
    f.render_widget(Clear, popup_area);
    f.render_widget(input, popup_area);
}

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                let should_quit = app.handle_input(key).await?;
                if should_quit {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_color() {
        assert_eq!(hex_to_color("#5B4FE9"), Color::Rgb(0x5B, 0x4F, 0xE9));
        assert_eq!(hex_to_color("#5B4"), Color::Reset);
        assert_eq!(hex_to_color("#GGGGGG"), Color::Reset);
        assert_eq!(hex_to_color("#a\u{e9}\u{20ac}"), Color::Reset);
        assert_eq!(hex_to_color("\u{e9}\u{e9}\u{e9}"), Color::Reset);
    }

    #[test]
    fn test_input_width_on_wide_terminals() {
        assert_eq!(input_width(100), 58);
        assert_eq!(input_width(2000), 1198);
        assert_eq!(input_width(u16::MAX), 39319);
        assert_eq!(input_width(0), 0);
    }
}
