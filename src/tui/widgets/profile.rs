use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::display::{format_date, motivation, progress_bar, round_percent};
use crate::models::{ProgressSummary, User};

pub fn draw(f: &mut Frame, user: Option<&User>, progress: &ProgressSummary, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Profile ")
        .title_style(Style::default().fg(Color::Cyan));

    let Some(user) = user else {
        let loading = Paragraph::new("Loading profile...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        return f.render_widget(loading, area);
    };

    let member_since = user
        .created_at
        .as_deref()
        .map(format_date)
        .unwrap_or_else(|| "-".to_string());

    let text = vec![
        Line::from(Span::styled(
            user.name.as_str(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            user.email.as_str(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Member since: ", Style::default().fg(Color::Gray)),
            Span::styled(member_since, Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Problems solved: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}/{}", progress.completed_count, progress.total_problems),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled(
                progress_bar(progress.progress_percentage, 20),
                Style::default().fg(Color::Green),
            ),
            Span::styled(
                format!(" {}%", round_percent(progress.progress_percentage)),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            motivation(progress),
            Style::default().fg(Color::Cyan),
        )),
    ];

    f.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
