use super::TextInput;
use crate::domain::Scheme;
use nucleo::pattern::{CaseMatching, Normalization, Pattern};
use nucleo::{Config, Matcher, Utf32Str};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

/// Fuzzy filter over task text.
pub struct SearchBar {
    input: TextInput,
    is_focused: bool,
    pattern: Pattern,
    matcher: Matcher,
    buf: Vec<char>,
}

impl Default for SearchBar {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchBar {
    pub fn new() -> Self {
        Self {
            input: TextInput::new(),
            is_focused: false,
            pattern: Pattern::parse("", CaseMatching::Ignore, Normalization::Smart),
            matcher: Matcher::new(Config::DEFAULT),
            buf: Vec::new(),
        }
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.is_focused = focused;
    }

    pub fn query(&self) -> &str {
        self.input.value()
    }

    pub fn insert_char(&mut self, c: char) {
        self.input.insert_char(c);
        self.reparse();
    }

    pub fn delete_char(&mut self) {
        self.input.delete_char();
        self.reparse();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.reparse();
    }

    fn reparse(&mut self) {
        self.pattern = Pattern::parse(
            self.input.value(),
            CaseMatching::Ignore,
            Normalization::Smart,
        );
    }

    pub fn matches(&mut self, text: &str) -> bool {
        if self.input.value().trim().is_empty() {
            return true;
        }
        let haystack = Utf32Str::new(text, &mut self.buf);
        self.pattern.score(haystack, &mut self.matcher).is_some()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, scheme: &Scheme) {
        let title = if self.is_focused {
            "Filter (focused)"
        } else {
            "Filter (press / to focus)"
        };

        let border_style = if self.is_focused {
            Style::default().fg(scheme.primary)
        } else {
            Style::default().fg(scheme.muted)
        };

        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style);

        let (text, text_style) = if self.input.is_empty() {
            let hint = if self.is_focused {
                "Type to filter tasks..."
            } else {
                "Press / to filter"
            };
            (hint, Style::default().fg(scheme.muted))
        } else {
            (self.input.value(), Style::default().fg(scheme.foreground))
        };

        frame.render_widget(Paragraph::new(text).block(block).style(text_style), area);

        if self.is_focused {
            let cursor_x = area.x + 1 + self.input.cursor() as u16;
            if cursor_x < area.x + area.width.saturating_sub(1) {
                frame.set_cursor_position(ratatui::layout::Position {
                    x: cursor_x,
                    y: area.y + 1,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_matches_everything() {
        let mut bar = SearchBar::new();
        assert!(bar.matches("anything"));
    }

    #[test]
    fn fuzzy_matches_ignore_case() {
        let mut bar = SearchBar::new();
        for c in "bml".chars() {
            bar.insert_char(c);
        }

        assert!(bar.matches("Buy milk"));
        assert!(!bar.matches("Call mom"));

        bar.clear();
        assert!(bar.matches("Call mom"));
    }
}
