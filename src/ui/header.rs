use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

use guided_study::study::StudyMode;

pub struct Header<'a> {
    pub title: &'a str,
    pub mode: StudyMode,
    pub read_only: bool,
    /// `(completed, total)` while study mode is on.
    pub progress: Option<(usize, usize)>,
}

impl<'a> Widget for Header<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = Style::default().bg(Color::DarkGray);

        let app = Span::styled(
            " study ",
            Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );
        let title = Span::styled(
            format!(" {} ", self.title),
            Style::default().fg(Color::Cyan).bg(Color::DarkGray),
        );

        let mut right = vec![Span::styled(
            format!("[{}] ", self.mode),
            Style::default().fg(Color::Gray).bg(Color::DarkGray),
        )];
        if self.read_only {
            right.push(Span::styled(
                "[read-only] ",
                Style::default().fg(Color::Yellow).bg(Color::DarkGray),
            ));
        }
        if let Some((done, total)) = self.progress {
            right.push(Span::styled(
                format!("{}/{} ", done, total),
                Style::default()
                    .fg(Color::Green)
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let used = app.width() + title.width() + right.iter().map(Span::width).sum::<usize>();
        let spacer = Span::styled(
            " ".repeat((area.width as usize).saturating_sub(used)),
            bg,
        );

        let mut spans = vec![app, title, spacer];
        spans.extend(right);
        Line::from(spans).render(area, buf);
    }
}
