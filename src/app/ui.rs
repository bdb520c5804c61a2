//! Terminal UI rendering — sidebar, status bar, transcript, activity, input.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::constants::APP_NAME;
use crate::history::Role;
use crate::persona::Persona;

use super::App;

impl App {
    /// Render the full TUI frame.
    pub fn draw(&mut self, frame: &mut Frame<'_>) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(20), Constraint::Min(1)])
            .split(frame.area());

        self.draw_sidebar(frame, columns[0]);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(8),
                Constraint::Length(3),
            ])
            .split(columns[1]);

        // ── Status bar ───────────────────────────────────────────────
        frame.render_widget(Paragraph::new(self.header_line()), chunks[0]);

        // ── Transcript ───────────────────────────────────────────────
        self.draw_transcript(frame, chunks[1]);

        // ── Activity log ─────────────────────────────────────────────
        let log_lines: Vec<Line> = self.logs.iter().map(|l| l.render()).collect();
        let log_paragraph = Paragraph::new(Text::from(log_lines)).wrap(Wrap { trim: true });
        let inner_width = chunks[2].width.saturating_sub(2);
        let inner_height = chunks[2].height.saturating_sub(2) as usize;
        let top_row = log_paragraph
            .line_count(inner_width)
            .saturating_sub(inner_height) as u16;
        let log_panel = log_paragraph
            .block(Block::default().borders(Borders::ALL).title(" Activity "))
            .scroll((top_row, 0));
        frame.render_widget(log_panel, chunks[2]);

        // ── Input prompt ─────────────────────────────────────────────
        self.draw_input(frame, chunks[3]);
    }

    fn draw_sidebar(&self, frame: &mut Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = Persona::ALL
            .iter()
            .map(|persona| ListItem::new(persona.label()))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Choose Emotion "),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(persona_color(self.selected()))
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut state = ListState::default().with_selected(Some(self.selected().index()));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_transcript(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let mut lines = Vec::new();
        for turn in &self.transcript.turns {
            let color = match turn.role {
                Role::User => Color::Cyan,
                Role::Assistant => persona_color(self.transcript.persona),
            };
            lines.push(Line::from(Span::styled(
                turn.role.label(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            for text in turn.content.lines() {
                lines.push(Line::raw(text.to_string()));
            }
            lines.push(Line::default());
        }

        let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
        let inner_width = area.width.saturating_sub(2);
        let inner_height = area.height.saturating_sub(2) as usize;
        let total_visual = paragraph.line_count(inner_width);
        let max_scroll = total_visual.saturating_sub(inner_height);

        // Clamp scroll_offset (lines from the bottom) to valid range.
        if (self.scroll_offset as usize) > max_scroll {
            self.scroll_offset = max_scroll as u16;
        }
        let top_row = max_scroll.saturating_sub(self.scroll_offset as usize) as u16;

        let title = if self.scroll_offset > 0 {
            format!(" {} [↑{}] ", self.selected().title(), self.scroll_offset)
        } else {
            format!(" {} ", self.selected().title())
        };
        let panel = paragraph
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled(
                        title,
                        Style::default()
                            .fg(persona_color(self.selected()))
                            .add_modifier(Modifier::BOLD),
                    )),
            )
            .scroll((top_row, 0));
        frame.render_widget(panel, area);
    }

    fn draw_input(&self, frame: &mut Frame<'_>, area: Rect) {
        let (title, border) = if self.pending.is_some() {
            (" AI is responding... ", Color::Yellow)
        } else {
            (" Message ", Color::Reset)
        };
        let body = if self.input.is_empty() && self.pending.is_none() {
            Line::from(Span::styled(
                self.selected().opener(),
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            Line::raw(self.input.clone())
        };
        let input_panel = Paragraph::new(body).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(title),
        );
        frame.render_widget(input_panel, area);

        let input_width = area.width.saturating_sub(2) as usize;
        let cursor = Span::raw(&self.input[..self.cursor])
            .width()
            .min(input_width);
        frame.set_cursor_position(Position::new(area.x + 1 + cursor as u16, area.y + 1));
    }

    // ── Status-bar helpers ───────────────────────────────────────────

    fn header_line(&self) -> Line<'static> {
        let active = self
            .session
            .active_agent()
            .map(|agent| agent.persona().id().to_string())
            .unwrap_or_else(|| "none".to_string());
        Line::from(vec![
            Span::styled(
                format!("{APP_NAME}  "),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled("Agent: ", Style::default().fg(Color::DarkGray)),
            Span::styled(active, Style::default().fg(persona_color(self.selected()))),
            Span::styled(
                format!("  ({} built)", self.session.agent_count()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled("  History: ", Style::default().fg(Color::DarkGray)),
            Span::styled(self.history.label(), Style::default().fg(Color::Green)),
            Span::styled("  OpenAI: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                self.openai_status_label(),
                Style::default().fg(self.openai_status_color()),
            ),
            Span::styled("  Search: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                if self.search_ready { "on" } else { "off" },
                Style::default().fg(if self.search_ready {
                    Color::Green
                } else {
                    Color::DarkGray
                }),
            ),
        ])
    }

    fn openai_status_label(&self) -> String {
        match &self.openai_key_hint {
            Some(hint) => hint.clone(),
            None => "unset".to_string(),
        }
    }

    fn openai_status_color(&self) -> Color {
        if self.openai_key_hint.is_some() {
            Color::Green
        } else {
            Color::DarkGray
        }
    }
}

fn persona_color(persona: Persona) -> Color {
    match persona {
        Persona::Default => Color::White,
        Persona::Angry => Color::Red,
        Persona::Happy => Color::Yellow,
        Persona::Sad => Color::Blue,
        Persona::Fear => Color::Magenta,
    }
}
