use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Widget};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonVariant {
    #[default]
    Primary,
    Secondary,
}

/// A one-line push button. Carries no state of its own; the screen decides
/// whether it is focused or disabled on every frame.
#[derive(Debug, Clone)]
pub struct Button<'a> {
    label: &'a str,
    variant: ButtonVariant,
    disabled: bool,
    focused: bool,
}

impl<'a> Button<'a> {
    pub fn new(label: &'a str) -> Self {
        Self {
            label,
            variant: ButtonVariant::Primary,
            disabled: false,
            focused: false,
        }
    }

    pub fn variant(mut self, variant: ButtonVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Whether activating the button should fire its action.
    pub fn press(&self) -> bool {
        !self.disabled
    }

    fn style(&self) -> Style {
        if self.disabled {
            return Style::default().fg(Color::DarkGray);
        }
        let base = match self.variant {
            ButtonVariant::Primary => Style::default().fg(Color::Black).bg(Color::Blue),
            ButtonVariant::Secondary => Style::default().fg(Color::Blue),
        };
        if self.focused {
            base.bold().add_modifier(Modifier::REVERSED)
        } else {
            base
        }
    }
}

impl Widget for Button<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let marker = if self.focused { ">" } else { " " };
        Paragraph::new(format!("{marker}[ {} ]", self.label))
            .style(self.style())
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_button_does_not_fire() {
        assert!(Button::new("Add").press());
        assert!(!Button::new("Add").disabled(true).press());
    }

    #[test]
    fn renders_label() {
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        Button::new("Sign In").focused(true).render(area, &mut buf);
        let text: String = (0..area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect();
        assert!(text.contains("[ Sign In ]"), "{text:?}");
    }
}
