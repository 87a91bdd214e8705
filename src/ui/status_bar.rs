use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

pub struct StatusBar<'a> {
    pub hints: &'a [(String, &'static str)],
    pub message: Option<&'a str>,
    pub quiz_open: bool,
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans = Vec::new();
        if self.quiz_open {
            spans.push(Span::styled(
                " QUIZ ",
                Style::default().fg(Color::Black).bg(Color::Magenta),
            ));
        }

        if let Some(msg) = self.message {
            spans.push(Span::styled(
                format!(" {} ", msg),
                Style::default().fg(Color::Yellow),
            ));
            Line::from(spans).render(area, buf);
            return;
        }

        spans.push(Span::raw(" "));
        for (i, (key, action)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", Style::default().fg(Color::DarkGray)));
            }
            spans.push(Span::styled(
                format!("[{}]", key),
                Style::default().fg(Color::Cyan),
            ));
            spans.push(Span::styled(
                action.to_string(),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM),
            ));
        }

        Line::from(spans).render(area, buf);
    }
}
