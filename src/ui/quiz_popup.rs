use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block as WidgetBlock, BorderType, Borders, Clear, Paragraph, Widget, Wrap};

use guided_study::questions::QuestionType;
use guided_study::quiz::QuizGate;

use crate::app::QuizInput;

/// Modal quiz for the section just completed.
pub struct QuizPopup<'a> {
    pub gate: &'a QuizGate,
    pub input: &'a QuizInput,
}

impl<'a> QuizPopup<'a> {
    fn lines(&self) -> Vec<Line<'static>> {
        let Some(question) = self.gate.current_question() else {
            return vec![];
        };
        let (n, total) = self.gate.progress();
        let mut lines = vec![
            Line::styled(
                format!("Question {} of {} · {} pts", n, total, question.points),
                Style::default().fg(Color::DarkGray),
            ),
            Line::raw(""),
            Line::styled(
                question.prompt.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Line::raw(""),
        ];

        let feedback = self.gate.feedback();
        let choices: Vec<String> = match question.kind {
            QuestionType::Multiple => question.options.clone(),
            QuestionType::Boolean => vec!["True".into(), "False".into()],
            QuestionType::Text => vec![],
        };
        if choices.is_empty() {
            lines.push(Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::Yellow)),
                Span::raw(self.input.text.clone()),
                Span::styled(
                    if feedback.is_none() { "▏" } else { "" },
                    Style::default().fg(Color::Yellow),
                ),
            ]));
        }
        for (i, choice) in choices.iter().enumerate() {
            let selected = i == self.input.selected;
            let style = if selected {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Gray)
            };
            let marker = if selected { "● " } else { "○ " };
            lines.push(Line::from(Span::styled(format!("{}{}", marker, choice), style)));
        }

        if let Some(feedback) = feedback {
            lines.push(Line::raw(""));
            if feedback.is_correct {
                lines.push(Line::styled(
                    "✓ Correct",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ));
            } else {
                lines.push(Line::styled(
                    "✗ Incorrect",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ));
                if let Some(answer) = &feedback.correct_answer {
                    lines.push(Line::styled(
                        format!("Answer: {}", answer),
                        Style::default().fg(Color::Gray),
                    ));
                }
            }
            if let Some(explanation) = &feedback.explanation {
                lines.push(Line::styled(
                    explanation.clone(),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        lines
    }
}

impl<'a> Widget for QuizPopup<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = self.lines();
        let popup_width = (area.width * 70 / 100).max(30).min(area.width);
        let popup_height = (lines.len() as u16 + 4).min(area.height);
        let x = area.x + area.width.saturating_sub(popup_width) / 2;
        let y = area.y + area.height.saturating_sub(popup_height) / 2;
        let popup_area = Rect::new(x, y, popup_width, popup_height);

        Clear.render(popup_area, buf);

        let block = WidgetBlock::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Magenta))
            .title(format!(" Quiz: {} ", self.gate.section_title()));
        let inner = block.inner(popup_area);
        block.render(popup_area, buf);

        let content = Rect::new(
            inner.x + 1,
            inner.y + 1,
            inner.width.saturating_sub(2),
            inner.height.saturating_sub(1),
        );
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(content, buf);
    }
}
