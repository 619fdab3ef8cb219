//! Pure formatting helpers. Aggregates come pre-computed from the server;
//! nothing here derives a count or a percentage from raw data.

use chrono::DateTime;

use crate::models::ProgressSummary;

/// Round a server-provided percentage to the nearest whole percent.
pub fn round_percent(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u32
}

/// Fallback completion rule, used only when the server omits `isCompleted`.
pub fn is_topic_completed(completed: u32, total: u32) -> bool {
    total > 0 && completed == total
}

pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = (round_percent(percent) as usize * width) / 100;
    let empty = width - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn format_date(date_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        dt.format("%b %d, %Y").to_string()
    } else {
        date_str.chars().take(10).collect()
    }
}

pub fn motivation(progress: &ProgressSummary) -> String {
    if progress.total_problems > 0 && round_percent(progress.progress_percentage) >= 100 {
        "You've completed all problems! You're a DSA master!".to_string()
    } else {
        let remaining = progress
            .total_problems
            .saturating_sub(progress.completed_count);
        format!(
            "You're doing great! {} more problems to complete your DSA journey.",
            remaining
        )
    }
}
