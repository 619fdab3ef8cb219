use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::tui::{LoginField, LoginForm};

pub fn draw(f: &mut Frame, form: &LoginForm, area: Rect) {
    let height = if form.register { 13 } else { 11 };
    let area = centered(area, 50, height);

    let title = if form.register {
        " Create Account "
    } else {
        " Welcome Back "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    let mut lines = vec![Line::from("")];
    for field in form.fields() {
        let (label, value) = match field {
            LoginField::Name => ("Name", form.name.clone()),
            LoginField::Email => ("Email", form.email.clone()),
            LoginField::Password => ("Password", "*".repeat(form.password.chars().count())),
        };
        let active = *field == form.field;
        let label_style = if active {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let mut spans = vec![
            Span::styled(format!("{:>10}: ", label), label_style),
            Span::styled(value, Style::default().fg(Color::White)),
        ];
        if active {
            spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }

    if form.submitting {
        let msg = if form.register {
            "Creating account..."
        } else {
            "Logging in..."
        };
        lines.push(Line::from(Span::styled(
            msg,
            Style::default().fg(Color::DarkGray),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Left);

    f.render_widget(paragraph, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1])[1]
}
