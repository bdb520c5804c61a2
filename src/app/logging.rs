//! Activity-log entries and secret masking.

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

/// Severity of an activity-log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn tag(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERR ",
        }
    }

    fn color(self) -> Color {
        match self {
            LogLevel::Info => Color::Gray,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }
}

/// One timestamped line in the activity panel.
#[derive(Clone, Debug)]
pub struct LogLine {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn render(&self) -> Line<'static> {
        Line::from(vec![
            Span::styled(
                format!("{} ", self.timestamp),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!("{} ", self.level.tag()),
                Style::default().fg(self.level.color()),
            ),
            Span::raw(self.message.clone()),
        ])
    }
}

/// Show only the first and last four characters of a secret.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_hides_the_middle() {
        assert_eq!(mask_key("sk-1234567890abcd"), "sk-1…abcd");
        assert_eq!(mask_key("short"), "****");
    }
}
