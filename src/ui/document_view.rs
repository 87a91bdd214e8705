use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget, Wrap};

use guided_study::render::{Element, RenderedDocument};

/// Visible elements of the rendered document, one block per element.
pub struct DocumentView<'a> {
    pub rendered: Option<&'a RenderedDocument>,
    pub scroll: usize,
    pub loading: bool,
}

impl<'a> Widget for DocumentView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(rendered) = self.rendered else {
            let text = if self.loading { " Loading..." } else { " No document" };
            Line::styled(text, Style::default().fg(Color::DarkGray)).render(area, buf);
            return;
        };

        let lines = document_lines(rendered);
        let max_scroll = lines.len().saturating_sub(1);
        let scroll = self.scroll.min(max_scroll) as u16;
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .render(area, buf);
    }
}

pub fn document_lines(rendered: &RenderedDocument) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for element in rendered.visible_elements() {
        if element.parent.is_none() && !element.decorator {
            // editor root
            continue;
        }
        let before = lines.len();
        element_lines(element, &mut lines);
        if lines.len() > before && is_block_end(element) {
            lines.push(Line::raw(""));
        }
    }
    lines
}

fn is_block_end(element: &Element) -> bool {
    !matches!(element.tag, "li" | "tr" | "td" | "ul")
}

fn element_lines(element: &Element, out: &mut Vec<Line<'static>>) {
    let indent = "  ".repeat(element.depth);
    match element.tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = element.tag[1..].parse::<usize>().unwrap_or(1);
            let style = match level {
                1 => Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                _ => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            };
            out.push(Line::from(Span::styled(
                format!("{}{} {}", indent, "#".repeat(level), element.text),
                style,
            )));
        }
        "li" => push_text(out, &format!("{}• ", indent), &element.text, Style::default()),
        "blockquote" => push_text(
            out,
            &format!("{}│ ", indent),
            &element.text,
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        ),
        "pre" => push_text(out, &indent, &element.text, Style::default().fg(Color::Green)),
        "hr" => out.push(Line::styled(
            format!("{}{}", indent, "─".repeat(40)),
            Style::default().fg(Color::DarkGray),
        )),
        "figure" => out.push(Line::styled(
            format!("{}· · · page break · · ·", indent),
            Style::default().fg(Color::DarkGray),
        )),
        "iframe" => out.push(Line::styled(
            format!(
                "{}▶ video {}",
                indent,
                element.attributes.get("src").map(String::as_str).unwrap_or("")
            ),
            Style::default().fg(Color::Magenta),
        )),
        "img" => {
            let label = element
                .attributes
                .get("alt")
                .filter(|alt| !alt.is_empty())
                .or_else(|| element.attributes.get("src"))
                .map(String::as_str)
                .unwrap_or("");
            out.push(Line::styled(
                format!("{}▣ image {}", indent, label),
                Style::default().fg(Color::Magenta),
            ));
        }
        _ if element.text.is_empty() => {}
        _ => push_text(out, &indent, &element.text, Style::default()),
    }
}

fn push_text(out: &mut Vec<Line<'static>>, prefix: &str, text: &str, style: Style) {
    for (i, line) in text.split('\n').enumerate() {
        let lead = if i == 0 {
            prefix.to_string()
        } else {
            " ".repeat(prefix.chars().count())
        };
        out.push(Line::from(vec![Span::raw(lead), Span::styled(line.to_string(), style)]));
    }
}
