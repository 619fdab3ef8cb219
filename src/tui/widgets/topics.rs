use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::difficulty_color;
use crate::display::{progress_bar, round_percent, truncate};
use crate::tui::{App, Pane};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    draw_topic_list(f, app, chunks[0]);
    draw_topic_panel(f, app, chunks[1]);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_topic_list(f: &mut Frame, app: &App, area: Rect) {
    let selected_id = app.dashboard.selected_topic_id();

    let items: Vec<ListItem> = app
        .dashboard
        .topics()
        .iter()
        .map(|topic| {
            let marker = if Some(topic.id.as_str()) == selected_id {
                "● "
            } else {
                "  "
            };
            let (done, color) = if topic.is_completed() {
                (" ✓", Color::Green)
            } else {
                ("", Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("{:<18}", truncate(&topic.name, 18)),
                    Style::default().fg(color),
                ),
                Span::styled(
                    format!(" {}/{}", topic.completed_problems, topic.total_problems),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    format!(" {}%", round_percent(topic.completion_percentage)),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(done, Style::default().fg(Color::Green)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Topics ")
        .title_style(Style::default().fg(Color::Cyan))
        .border_style(border_style(app.pane == Pane::Topics));

    if items.is_empty() {
        let empty = Paragraph::new("No topics yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        return f.render_widget(empty, area);
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.topic_cursor.selected);

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_topic_panel(f: &mut Frame, app: &App, area: Rect) {
    let Some(topic) = app.dashboard.selected_topic() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Problems ")
            .title_style(Style::default().fg(Color::Cyan))
            .border_style(border_style(false));
        let hint = Paragraph::new("Select a topic to see its problems")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        return f.render_widget(hint, area);
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Header
            Constraint::Min(0),    // Problems
            Constraint::Length(4), // Links of the highlighted problem
        ])
        .split(area);

    let mut header = vec![Line::from(vec![
        Span::styled(
            progress_bar(topic.completion_percentage, 20),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            format!(
                " {}% ({}/{})",
                round_percent(topic.completion_percentage),
                topic.completed_problems,
                topic.total_problems
            ),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            if topic.is_completed() { "  Completed!" } else { "" },
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    ])];
    if let Some(description) = topic.description.as_deref().filter(|d| !d.is_empty()) {
        header.push(Line::from(Span::styled(
            description,
            Style::default().fg(Color::Gray),
        )));
    }

    let header_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", topic.name))
        .title_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(
        Paragraph::new(header)
            .block(header_block)
            .wrap(Wrap { trim: true }),
        chunks[0],
    );

    draw_problem_list(f, app, chunks[1]);
    draw_links(f, app, chunks[2]);
}

fn draw_problem_list(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Problems ")
        .title_style(Style::default().fg(Color::Cyan))
        .border_style(border_style(app.pane == Pane::Problems));

    let problems = app.dashboard.problems();
    if problems.is_empty() {
        let empty = Paragraph::new("No problems in this topic")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        return f.render_widget(empty, area);
    }

    let items: Vec<ListItem> = problems
        .iter()
        .map(|problem| {
            let (checkbox, style) = if app.dashboard.is_toggling(&problem.id) {
                ("[~] ", Style::default().fg(Color::DarkGray))
            } else if app.dashboard.is_completed(&problem.id) {
                ("[x] ", Style::default().fg(Color::Green))
            } else {
                ("[ ] ", Style::default().fg(Color::White))
            };
            let links: Vec<&str> = problem.links().into_iter().map(|(label, _)| label).collect();
            ListItem::new(Line::from(vec![
                Span::styled(checkbox, style),
                Span::styled(format!("{:<36}", truncate(&problem.title, 36)), style),
                Span::styled(
                    format!(" {:<7}", problem.difficulty.label()),
                    Style::default().fg(difficulty_color(problem.difficulty)),
                ),
                Span::styled(
                    format!(" {}", links.join(" ")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if app.pane == Pane::Problems {
        state.select(app.problem_cursor.selected);
    }

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_links(f: &mut Frame, app: &App, area: Rect) {
    let problem = app
        .problem_cursor
        .selected
        .and_then(|i| app.dashboard.problems().get(i));

    let lines: Vec<Line> = match problem {
        Some(problem) if !problem.links().is_empty() => problem
            .links()
            .into_iter()
            .map(|(label, url)| {
                Line::from(vec![
                    Span::styled(format!("{:<11}", label), Style::default().fg(Color::Gray)),
                    Span::styled(url.to_string(), Style::default().fg(Color::Blue)),
                ])
            })
            .collect(),
        Some(_) => vec![Line::from(Span::styled(
            "No links",
            Style::default().fg(Color::DarkGray),
        ))],
        None => Vec::new(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Links ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::fake_api::FakeApi;
    use crate::session::{SessionContext, SessionStore};
    use crate::workflow::{fetch_snapshot, TopicRefresh};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::runtime::Handle;

    async fn loaded_app(api: Arc<FakeApi>) -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let session = SessionContext::new(None);
        let mut app = App::new(Handle::current(), api.clone(), session, store, None);
        let snapshot = fetch_snapshot(api.as_ref(), None, TopicRefresh::Initial).await;
        app.dashboard.apply_snapshot(snapshot, TopicRefresh::Initial);
        (app, dir)
    }

    fn render_lines(app: &App) -> Vec<String> {
        let backend = TestBackend::new(120, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                draw(f, app, area)
            })
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(120)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    fn row_for<'a>(lines: &'a [String], title: &str) -> &'a str {
        lines
            .iter()
            .find(|line| line.contains(title))
            .map(String::as_str)
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn checklist_marks_done_pending_and_in_flight_rows() {
        let (mut app, _dir) = loaded_app(Arc::new(FakeApi::arrays_sheet())).await;
        let _pending = app.dashboard.begin_toggle("p4").unwrap();

        let lines = render_lines(&app);

        assert!(row_for(&lines, "Problem p1").contains("[x] Problem p1"));
        assert!(row_for(&lines, "Problem p4").contains("[~] Problem p4"));
        assert!(row_for(&lines, "Problem p5").contains("[ ] Problem p5"));
    }

    #[tokio::test]
    async fn settled_row_drops_in_flight_marker() {
        let api = Arc::new(FakeApi::arrays_sheet());
        let (mut app, _dir) = loaded_app(Arc::clone(&api)).await;
        assert!(app.dashboard.toggle(api.as_ref(), "p4").await.is_some());

        let lines = render_lines(&app);

        assert!(row_for(&lines, "Problem p4").contains("[x] Problem p4"));
        assert!(!lines.iter().any(|line| line.contains("[~]")));
        assert!(lines.concat().contains("80% (4/5)"));
    }

    #[tokio::test]
    async fn no_selection_shows_hint() {
        let (mut app, _dir) = loaded_app(Arc::new(FakeApi::arrays_sheet())).await;
        app.dashboard.clear_selection();

        let screen = render_lines(&app).concat();

        assert!(screen.contains("Select a topic to see its problems"));
        assert!(!screen.contains("[ ]"));
    }
}
