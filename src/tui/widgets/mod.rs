pub mod login;
pub mod profile;
pub mod progress;
pub mod topics;

use ratatui::style::Color;

use crate::models::Difficulty;

pub fn difficulty_color(difficulty: Difficulty) -> Color {
    match difficulty {
        Difficulty::Easy => Color::Green,
        Difficulty::Medium => Color::Yellow,
        Difficulty::Hard => Color::Red,
    }
}
