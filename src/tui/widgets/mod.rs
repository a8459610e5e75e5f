//! TUI Widgets - UI Components
//!
//! Stateless renderers shared by the list and detail screens. Screens own
//! their state; these only turn it into ratatui primitives.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use super::state::{Form, FormField, TextInput};
use super::theme::{icons, ConsoleTheme};

/// Common widget utilities
pub mod utils {
    use ratatui::layout::Rect;

    /// Truncate string with ellipsis
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else if max_len <= 3 {
            s.chars().take(max_len).collect()
        } else {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        }
    }

    /// A rect of `percent_x` x `height` centered in `area`
    pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
        let width = (area.width * percent_x / 100).max(20).min(area.width);
        let height = height.min(area.height);
        Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        }
    }
}

/// Boxed input line with a cursor
pub fn input_line<'a>(label: &'a str, input: &'a TextInput, focused: bool, theme: &ConsoleTheme) -> Line<'a> {
    let style = if focused { theme.accent() } else { theme.dimmed() };
    let mut spans = vec![
        Span::styled(format!("{:<12}", label), style),
        Span::styled(input.as_str(), theme.text()),
    ];
    if focused {
        spans.push(Span::styled(icons::CURSOR, theme.accent()));
    }
    Line::from(spans)
}

/// Modal create/edit form
pub fn render_form(frame: &mut Frame, area: Rect, title: &str, form: &Form, theme: &ConsoleTheme) {
    let rect = utils::centered_rect(60, 6, area);
    frame.render_widget(Clear, rect);

    let lines = vec![
        input_line("Name", &form.name, form.focus == FormField::Name, theme),
        input_line(
            "Description",
            &form.description,
            form.focus == FormField::Description,
            theme,
        ),
    ];
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(theme.modal_border());
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

/// Modal single-field prompt
pub fn render_prompt(frame: &mut Frame, area: Rect, title: &str, input: &TextInput, theme: &ConsoleTheme) {
    let rect = utils::centered_rect(60, 3, area);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(theme.modal_border());
    let line = Line::from(vec![
        Span::styled(input.as_str(), theme.text()),
        Span::styled(icons::CURSOR, theme.accent()),
    ]);
    frame.render_widget(Paragraph::new(line).block(block), rect);
}

/// Modal yes/no question
pub fn render_confirm(frame: &mut Frame, area: Rect, question: &str, theme: &ConsoleTheme) {
    let rect = utils::centered_rect(60, 5, area);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(theme.error());
    let text = vec![
        Line::from(Span::styled(question, theme.text())),
        Line::from(Span::styled("y = yes   n = no", theme.dimmed())),
    ];
    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), rect);
}

/// Full-area message (loading, empty, error)
pub fn render_message(frame: &mut Frame, area: Rect, message: &str, style: ratatui::style::Style) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);
    let paragraph = Paragraph::new(Span::styled(message, style))
        .alignment(ratatui::layout::Alignment::Center);
    frame.render_widget(paragraph, rows[1]);
}

/// Full-area failure: headline, the error itself, and an optional hint
pub fn render_failure(
    frame: &mut Frame,
    area: Rect,
    headline: &str,
    error: &str,
    hint: Option<&str>,
    theme: &ConsoleTheme,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Length(3), Constraint::Min(0)])
        .split(area);
    let mut text = vec![
        Line::from(Span::styled(headline, theme.error())),
        Line::from(Span::styled(error, theme.dimmed())),
    ];
    if let Some(hint) = hint {
        text.push(Line::from(Span::styled(hint, theme.dimmed())));
    }
    frame.render_widget(
        Paragraph::new(text)
            .alignment(ratatui::layout::Alignment::Center)
            .wrap(Wrap { trim: true }),
        rows[1],
    );
}
