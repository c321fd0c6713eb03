use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

/// A bordered single-line text field.
#[derive(Debug, Clone)]
pub struct TextInput<'a> {
    label: &'a str,
    value: &'a str,
    placeholder: &'a str,
    masked: bool,
    focused: bool,
}

impl<'a> TextInput<'a> {
    pub fn new(label: &'a str, value: &'a str) -> Self {
        Self {
            label,
            value,
            placeholder: "",
            masked: false,
            focused: false,
        }
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Render every character as `*`.
    pub fn masked(mut self, masked: bool) -> Self {
        self.masked = masked;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    fn content(&self) -> Line<'a> {
        if self.value.is_empty() {
            let mut spans = vec![Span::styled(
                self.placeholder,
                Style::default().fg(Color::DarkGray),
            )];
            if self.focused {
                spans.insert(0, Span::raw("_"));
            }
            return Line::from(spans);
        }
        let shown = if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.to_string()
        };
        if self.focused {
            Line::from(format!("{shown}_"))
        } else {
            Line::from(shown)
        }
    }
}

impl Widget for TextInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(format!(" {} ", self.label));
        Paragraph::new(self.content()).block(block).render(area, buf);
    }
}

/// Apply a typing key to `value`. Returns false for keys that are not edits.
pub fn edit_text(value: &mut String, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            value.push(c);
            true
        }
        KeyCode::Backspace => {
            value.pop();
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn masked_input_hides_value() {
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        TextInput::new("Password", "secret")
            .masked(true)
            .render(area, &mut buf);
        let middle = row(&buf, 1);
        assert!(middle.contains("******"), "{middle:?}");
        assert!(!middle.contains("secret"));
        assert!(row(&buf, 0).contains("Password"));
    }

    #[test]
    fn empty_input_shows_placeholder() {
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        TextInput::new("Task", "")
            .placeholder("Add a new task...")
            .render(area, &mut buf);
        assert!(row(&buf, 1).contains("Add a new task..."));
    }

    #[test]
    fn edit_text_handles_typing_and_backspace() {
        let mut value = String::from("ab");
        assert!(edit_text(&mut value, KeyEvent::from(KeyCode::Char('c'))));
        assert!(edit_text(&mut value, KeyEvent::from(KeyCode::Backspace)));
        assert!(!edit_text(&mut value, KeyEvent::from(KeyCode::Enter)));
        assert!(!edit_text(
            &mut value,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
        assert_eq!(value, "ab");
    }
}
