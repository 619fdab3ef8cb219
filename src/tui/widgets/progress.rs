use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::difficulty_color;
use crate::display::{progress_bar, round_percent, truncate};
use crate::models::Difficulty;
use crate::workflow::Dashboard;

pub fn draw(f: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Overall + by difficulty
            Constraint::Min(0),    // Topic-wise
        ])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    draw_overall(f, dashboard, top[0]);
    draw_by_difficulty(f, dashboard, top[1]);
    draw_topic_progress(f, dashboard, chunks[1]);
}

fn draw_overall(f: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let progress = dashboard.progress();
    let topics = dashboard.topics();
    let topics_done = topics.iter().filter(|t| t.is_completed()).count();

    let text = vec![
        Line::from(vec![
            Span::styled("Solved: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}/{}", progress.completed_count, progress.total_problems),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
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
        Line::from(vec![
            Span::styled("Topics completed: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}/{}", topics_done, topics.len()),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Overall ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_by_difficulty(f: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let by_difficulty = &dashboard.progress().by_difficulty;

    let text: Vec<Line> = Difficulty::ALL
        .iter()
        .map(|&difficulty| {
            let stats = by_difficulty.get(difficulty);
            Line::from(vec![
                Span::styled(
                    format!("{:<7}", difficulty.label()),
                    Style::default().fg(difficulty_color(difficulty)),
                ),
                Span::styled(
                    progress_bar(stats.percentage, 12),
                    Style::default().fg(difficulty_color(difficulty)),
                ),
                Span::styled(
                    format!(
                        " {}/{} ({}%)",
                        stats.completed,
                        stats.total,
                        round_percent(stats.percentage)
                    ),
                    Style::default().fg(Color::White),
                ),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" By Difficulty ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_topic_progress(f: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let items: Vec<ListItem> = dashboard
        .topics()
        .iter()
        .map(|topic| {
            let color = if topic.is_completed() {
                Color::Green
            } else {
                Color::White
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<26}", truncate(&topic.name, 24)),
                    Style::default().fg(color),
                ),
                Span::styled(
                    progress_bar(topic.completion_percentage, 15),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    format!(
                        " {:>3}% {}/{}",
                        round_percent(topic.completion_percentage),
                        topic.completed_problems,
                        topic.total_problems
                    ),
                    Style::default().fg(Color::Yellow),
                ),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Topic-wise Progress ")
        .title_style(Style::default().fg(Color::Cyan));

    if items.is_empty() {
        let empty = Paragraph::new("No topics yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
    } else {
        f.render_widget(List::new(items).block(block), area);
    }
}
