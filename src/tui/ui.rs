use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{login, profile, progress, topics};
use super::{App, Pane, View};
use crate::session::{gate, Gate};

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();
    match gate(app.auth) {
        Gate::Loading => draw_loading(f, area, "Checking session..."),
        Gate::RedirectToLogin => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(area);
            login::draw(f, &app.login, chunks[0]);
            draw_help_bar(f, app, chunks[1]);
        }
        Gate::Render => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Tab bar
                    Constraint::Min(0),    // Content
                    Constraint::Length(1), // Help bar
                ])
                .split(area);

            draw_tabs(f, app, chunks[0]);
            draw_content(f, app, chunks[1]);
            draw_help_bar(f, app, chunks[2]);
        }
    }
}

fn draw_loading(f: &mut Frame, area: Rect, message: &str) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let middle = Rect {
        y: inner.y + inner.height / 2,
        height: inner.height.min(1),
        ..inner
    };
    let text = Paragraph::new(message)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(text, middle);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Topics", "Progress", "Profile"];
    let selected = match app.view {
        View::Topics => 0,
        View::Progress => 1,
        View::Profile => 2,
    };

    let title = match &app.user {
        Some(user) => format!(" DSA Tracker · {} ", user.name),
        None => " DSA Tracker ".to_string(),
    };

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    if app.dashboard.is_loading() {
        return draw_loading(f, area, "Loading...");
    }
    match app.view {
        View::Topics => topics::draw(f, app, area),
        View::Progress => progress::draw(f, &app.dashboard, area),
        View::Profile => profile::draw(f, app.user.as_ref(), app.dashboard.progress(), area),
    }
}

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    if gate(app.auth) == Gate::RedirectToLogin {
        spans.extend(vec![
            key("<Tab>"),
            Span::raw(" Next field  "),
            key("<CR>"),
            Span::raw(" Submit  "),
            key("^r"),
            Span::raw(if app.login.register {
                " Have an account? Login  "
            } else {
                " Need an account? Register  "
            }),
            key("<Esc>"),
            Span::raw(" Quit"),
        ]);
    } else {
        spans.extend(vec![key("<Tab>"), Span::raw(" Views  ")]);

        if app.view == View::Topics {
            spans.extend(vec![key("j/k"), Span::raw(" Nav  ")]);
            match app.pane {
                Pane::Topics => spans.extend(vec![key("l/<CR>"), Span::raw(" Open  ")]),
                Pane::Problems => spans.extend(vec![
                    key("<Space>"),
                    Span::raw(" Toggle  "),
                    key("h"),
                    Span::raw(" Topics  "),
                ]),
            }
        }

        spans.extend(vec![
            key("^r"),
            Span::raw(" Refresh  "),
            key("X"),
            Span::raw(" Logout  "),
            key("q"),
            Span::raw(" Quit"),
        ]);

        if app.refreshing || app.dashboard.has_pending_toggles() {
            spans.push(Span::styled(
                "  syncing...",
                Style::default().fg(Color::Gray),
            ));
        }
        if let Some(status) = &app.status {
            spans.push(Span::styled(
                format!("  {}", status),
                Style::default().fg(Color::Yellow),
            ));
        } else if app.dashboard.is_stale() {
            spans.push(Span::styled(
                "  counts may be stale, ^r to refresh",
                Style::default().fg(Color::Yellow),
            ));
        }
    }

    let help = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
