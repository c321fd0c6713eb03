use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Widget};

const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

pub const DEFAULT_CAPTION: &str = "Loading...";

/// Busy indicator with a caption, centered in its area.
#[derive(Debug, Clone)]
pub struct Spinner<'a> {
    caption: &'a str,
    tick: usize,
}

impl Default for Spinner<'_> {
    fn default() -> Self {
        Self {
            caption: DEFAULT_CAPTION,
            tick: 0,
        }
    }
}

impl<'a> Spinner<'a> {
    pub fn new(caption: &'a str) -> Self {
        Self { caption, tick: 0 }
    }

    /// Pick the animation frame.
    pub fn tick(mut self, tick: usize) -> Self {
        self.tick = tick;
        self
    }

    pub fn frame(&self) -> &'static str {
        FRAMES[self.tick % FRAMES.len()]
    }
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let line_area = Rect {
            y: area.y + area.height / 2,
            height: 1,
            ..area
        };
        Paragraph::new(Line::from(vec![
            Span::styled(self.frame(), Style::default().fg(Color::Blue).bold()),
            Span::raw(" "),
            Span::styled(self.caption, Style::default().fg(Color::Gray)),
        ]))
        .alignment(Alignment::Center)
        .render(line_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_caption() {
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        Spinner::default().render(area, &mut buf);
        let text: String = (0..area.width)
            .map(|x| buf[(x, 1)].symbol().to_string())
            .collect();
        assert!(text.contains("Loading..."), "{text:?}");
    }

    #[test]
    fn frames_cycle() {
        assert_eq!(Spinner::default().tick(0).frame(), "|");
        assert_eq!(Spinner::default().tick(5).frame(), "/");
    }
}
