pub mod document_view;
pub mod header;
pub mod quiz_popup;
pub mod status_bar;

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block as WidgetBlock, BorderType, Borders, Clear};
use ratatui::Frame;

use crate::app::AppState;
use crate::error::ErrorPopup;

use document_view::DocumentView;
use header::Header;
use quiz_popup::QuizPopup;
use status_bar::StatusBar;

pub fn render(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .split(frame.area());

    let snapshot = state.snapshot();
    let study = state.study.as_ref();

    let header = Header {
        title: study.map(|s| s.document().title()).unwrap_or("loading"),
        mode: state.mode(),
        read_only: state.read_only(),
        progress: snapshot
            .as_ref()
            .filter(|s| s.enabled)
            .map(|s| (s.completed_sections.len(), s.total_sections)),
    };
    frame.render_widget(header, chunks[0]);

    let view = DocumentView {
        rendered: study.map(|s| s.rendered()),
        scroll: state.scroll,
        loading: state.loading,
    };
    frame.render_widget(view, chunks[1]);

    if snapshot.as_ref().is_some_and(|s| s.show_completion_toast) {
        render_toast(frame, "All sections complete!", chunks[1]);
    }

    if let Some(gate) = study.and_then(|s| s.quiz()) {
        frame.render_widget(
            QuizPopup {
                gate,
                input: &state.quiz_input,
            },
            chunks[1],
        );
    }

    if state.show_help {
        render_help_popup(frame, &state.hints, &state.quiz_hints, chunks[1]);
    }

    if let Some(err) = &state.error_popup {
        render_error_popup(frame, err, chunks[1]);
    }

    let quiz_open = state.quiz_open();
    let status = StatusBar {
        hints: if quiz_open { &state.quiz_hints } else { &state.hints },
        message: state.status_message.as_deref(),
        quiz_open,
    };
    frame.render_widget(status, chunks[2]);
}

fn render_toast(frame: &mut Frame, message: &str, area: Rect) {
    let width = (message.chars().count() as u16 + 4).min(area.width);
    let height = 3.min(area.height);
    let x = area.x + area.width.saturating_sub(width + 1);
    let toast_area = Rect::new(x, area.y, width, height);
    frame.render_widget(Clear, toast_area);

    let block = WidgetBlock::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Green));
    let inner = block.inner(toast_area);
    frame.render_widget(block, toast_area);
    frame.render_widget(
        Line::styled(
            format!(" {}", message),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        inner,
    );
}

fn render_help_popup(
    frame: &mut Frame,
    hints: &[(String, &'static str)],
    quiz_hints: &[(String, &'static str)],
    area: Rect,
) {
    // +1 quiz heading, +2 borders, +1 footer
    let line_count = hints.len() + quiz_hints.len() + 1;
    let popup_height = (line_count + 3).min(area.height as usize) as u16;
    let popup_width = (area.width * 60 / 100).max(30).min(area.width);
    let x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(x, y, popup_width, popup_height);
    frame.render_widget(Clear, popup_area);

    let block = WidgetBlock::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Help ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let hint_line = |key_str: &str, action_name: &'static str| {
        Line::from(vec![
            Span::styled(format!("{:>12}", key_str), Style::default().fg(Color::Yellow)),
            Span::raw("  "),
            Span::styled(action_name, Style::default().fg(Color::White)),
        ])
    };
    let mut lines: Vec<Line> = hints.iter().map(|(k, a)| hint_line(k.as_str(), *a)).collect();
    lines.push(Line::styled(
        format!("{:>12}", "in quiz"),
        Style::default().fg(Color::Magenta),
    ));
    lines.extend(quiz_hints.iter().map(|(k, a)| hint_line(k.as_str(), *a)));

    for (i, line) in lines.into_iter().enumerate() {
        if i as u16 >= inner.height.saturating_sub(1) {
            break;
        }
        let line_area = Rect::new(inner.x, inner.y + i as u16, inner.width, 1);
        frame.render_widget(line, line_area);
    }

    if inner.height > 0 {
        let footer_y = inner.y + inner.height - 1;
        let footer = Line::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        );
        let footer_area = Rect::new(inner.x, footer_y, inner.width, 1);
        frame.render_widget(footer, footer_area);
    }
}

fn render_error_popup(frame: &mut Frame, popup: &ErrorPopup, area: Rect) {
    let popup_width = (area.width * 50 / 100).max(30).min(area.width);
    let inner_width = popup_width.saturating_sub(2) as usize;

    let msg_lines = wrap_text(&popup.message, inner_width);
    // blank, message, blank, hint, blank, footer
    let content_height = 1 + msg_lines.len() + 1 + 1 + 1 + 1;
    let popup_height = (content_height + 2).min(area.height as usize) as u16;

    let x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(x, y, popup_width, popup_height);
    frame.render_widget(Clear, popup_area);

    let block = WidgetBlock::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Red))
        .title(format!(" ! {} ", popup.title));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut rows: Vec<Line> = vec![Line::raw("")];
    rows.extend(
        msg_lines
            .into_iter()
            .map(|l| Line::styled(l, Style::default().fg(Color::White))),
    );
    rows.push(Line::raw(""));
    rows.push(Line::styled(
        popup.hint.clone(),
        Style::default().fg(Color::DarkGray),
    ));
    rows.push(Line::raw(""));
    rows.push(Line::styled(
        "Press any key to close",
        Style::default().fg(Color::DarkGray),
    ));

    for (row, line) in rows.into_iter().enumerate() {
        if row as u16 >= inner.height {
            break;
        }
        let line_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        frame.render_widget(line, line_area);
    }
}

fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
