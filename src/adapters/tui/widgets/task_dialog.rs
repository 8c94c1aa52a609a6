use super::TextInput;
use crate::adapters::tui::event::AppEvent;
use crate::domain::{ColorTag, DomainResult, Scheme, Task, TaskDraft, TaskId, TaskTime, PALETTE};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogField {
    Text,
    Color,
    Start,
    End,
}

impl DialogField {
    fn next(self) -> Self {
        match self {
            DialogField::Text => DialogField::Color,
            DialogField::Color => DialogField::Start,
            DialogField::Start => DialogField::End,
            DialogField::End => DialogField::Text,
        }
    }

    fn previous(self) -> Self {
        match self {
            DialogField::Text => DialogField::End,
            DialogField::Color => DialogField::Text,
            DialogField::Start => DialogField::Color,
            DialogField::End => DialogField::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Pending,
    Cancelled,
    Submitted,
}

/// Create/edit form for one task.
#[derive(Debug, Clone)]
pub struct TaskDialog {
    editing: Option<TaskId>,
    text: TextInput,
    color: ColorTag,
    start: TextInput,
    end: TextInput,
    focus: DialogField,
}

impl TaskDialog {
    /// Empty form; the start time defaults to now and the end time to unset.
    pub fn create(color: ColorTag) -> Self {
        Self {
            editing: None,
            text: TextInput::new(),
            color,
            start: TextInput::with_value(TaskTime::now().display()),
            end: TextInput::new(),
            focus: DialogField::Text,
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            editing: Some(task.id),
            text: TextInput::with_value(task.text.clone()),
            color: task.color_tag,
            start: TextInput::with_value(task.start_time.display()),
            end: TextInput::with_value(task.end_time.display()),
            focus: DialogField::Text,
        }
    }

    pub fn editing(&self) -> Option<TaskId> {
        self.editing
    }

    #[cfg(test)]
    pub fn focus(&self) -> DialogField {
        self.focus
    }

    #[cfg(test)]
    pub fn color(&self) -> ColorTag {
        self.color
    }

    /// Text is passed through unchanged; blank text is left to the repository.
    pub fn to_draft(&self) -> DomainResult<TaskDraft> {
        let start = TaskTime::parse_input(self.start.value())?;
        let end = TaskTime::parse_input(self.end.value())?;
        Ok(TaskDraft::new(self.text.value(), self.color).with_times(start, end))
    }

    fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            DialogField::Text => Some(&mut self.text),
            DialogField::Start => Some(&mut self.start),
            DialogField::End => Some(&mut self.end),
            DialogField::Color => None,
        }
    }

    fn shift_color(&mut self, forward: bool) {
        let len = PALETTE.len();
        let next = match (self.color.palette_index(), forward) {
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
            (None, _) => 0,
        };
        self.color = PALETTE[next].tag;
    }

    pub fn handle_event(&mut self, event: AppEvent) -> DialogOutcome {
        match event {
            AppEvent::CloseModal => return DialogOutcome::Cancelled,
            AppEvent::Enter => return DialogOutcome::Submitted,
            AppEvent::Tab | AppEvent::Down => self.focus = self.focus.next(),
            AppEvent::BackTab | AppEvent::Up => self.focus = self.focus.previous(),
            AppEvent::Left => match self.focused_input() {
                Some(input) => input.move_left(),
                None => self.shift_color(false),
            },
            AppEvent::Right => match self.focused_input() {
                Some(input) => input.move_right(),
                None => self.shift_color(true),
            },
            AppEvent::Home => {
                if let Some(input) = self.focused_input() {
                    input.move_home();
                }
            }
            AppEvent::End => {
                if let Some(input) = self.focused_input() {
                    input.move_end();
                }
            }
            AppEvent::Backspace => {
                if let Some(input) = self.focused_input() {
                    input.delete_char();
                }
            }
            AppEvent::Delete => {
                if let Some(input) = self.focused_input() {
                    input.delete_forward();
                }
            }
            AppEvent::Character(c) => match self.focused_input() {
                Some(input) => input.insert_char(c),
                // Digits pick a swatch directly
                None => {
                    if let Some(i) = c.to_digit(10).map(|d| d as usize) {
                        if (1..=PALETTE.len()).contains(&i) {
                            self.color = PALETTE[i - 1].tag;
                        }
                    }
                }
            },
            AppEvent::Quit | AppEvent::Tick => {}
        }
        DialogOutcome::Pending
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, scheme: &Scheme) {
        frame.render_widget(Clear, area);

        let title = if self.editing.is_some() {
            "Edit task"
        } else {
            "New task"
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(scheme.primary))
            .style(Style::default().bg(scheme.surface).fg(scheme.foreground));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Text
                Constraint::Length(3), // Color
                Constraint::Length(3), // Start
                Constraint::Length(3), // End
                Constraint::Min(1),    // Hints
            ])
            .split(inner);

        self.render_input(frame, rows[0], "Text", &self.text, DialogField::Text, scheme);
        self.render_palette(frame, rows[1], scheme);
        self.render_input(
            frame,
            rows[2],
            "Start (YYYY-MM-DD HH:MM)",
            &self.start,
            DialogField::Start,
            scheme,
        );
        self.render_input(
            frame,
            rows[3],
            "End (empty = not set)",
            &self.end,
            DialogField::End,
            scheme,
        );

        let hints = Paragraph::new("Tab: next field | ←/→: color | Enter: save | Esc: cancel")
            .style(Style::default().fg(scheme.muted));
        frame.render_widget(hints, rows[4]);
    }

    fn field_block<'a>(&self, title: &'a str, field: DialogField, scheme: &Scheme) -> Block<'a> {
        let border_style = if self.focus == field {
            Style::default().fg(scheme.primary)
        } else {
            Style::default().fg(scheme.muted)
        };
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style)
    }

    fn render_input(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        input: &TextInput,
        field: DialogField,
        scheme: &Scheme,
    ) {
        let block = self.field_block(title, field, scheme);
        frame.render_widget(Paragraph::new(input.value()).block(block), area);

        if self.focus == field {
            let cursor_x = area.x + 1 + input.cursor() as u16;
            if cursor_x < area.x + area.width.saturating_sub(1) {
                frame.set_cursor_position(ratatui::layout::Position {
                    x: cursor_x,
                    y: area.y + 1,
                });
            }
        }
    }

    fn render_palette(&self, frame: &mut Frame, area: Rect, scheme: &Scheme) {
        let block = self.field_block("Color", DialogField::Color, scheme);

        let mut spans = Vec::new();
        for (i, swatch) in PALETTE.iter().enumerate() {
            let marker = if swatch.tag == self.color {
                format!("[{}]", i + 1)
            } else {
                format!(" {} ", i + 1)
            };
            spans.push(Span::styled(
                marker,
                Style::default()
                    .bg(swatch.tag.to_terminal())
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            self.color.name(),
            Style::default().fg(scheme.muted),
        ));

        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    fn type_text(dialog: &mut TaskDialog, text: &str) {
        for c in text.chars() {
            dialog.handle_event(AppEvent::Character(c));
        }
    }

    #[test]
    fn new_dialog_defaults() {
        let dialog = TaskDialog::create(PALETTE[2].tag);
        let draft = dialog.to_draft().unwrap();

        assert_eq!(dialog.editing(), None);
        assert_eq!(draft.color_tag, PALETTE[2].tag);
        assert!(!draft.start_time.is_unset());
        assert!(draft.end_time.is_unset());
    }

    #[test]
    fn edit_dialog_is_prefilled() {
        let task = Task::new(
            TaskId(5),
            TaskDraft::new("Call mom", PALETTE[3].tag).with_times(
                TaskTime::from_raw("未设置"),
                TaskTime::from_raw("2024-06-01 18:00"),
            ),
        );
        let dialog = TaskDialog::edit(&task);
        let draft = dialog.to_draft().unwrap();

        assert_eq!(dialog.editing(), Some(TaskId(5)));
        assert_eq!(draft.text, "Call mom");
        assert!(draft.start_time.is_unset());
        assert_eq!(draft.end_time.as_str(), "2024-06-01 18:00");
    }

    #[test]
    fn tab_cycles_fields_and_color_keys_pick_swatches() {
        let mut dialog = TaskDialog::create(PALETTE[0].tag);
        type_text(&mut dialog, "Gym");

        assert_eq!(dialog.handle_event(AppEvent::Tab), DialogOutcome::Pending);
        assert_eq!(dialog.focus(), DialogField::Color);
        dialog.handle_event(AppEvent::Left);
        assert_eq!(dialog.color(), PALETTE[5].tag);
        dialog.handle_event(AppEvent::Character('4'));
        assert_eq!(dialog.color(), PALETTE[3].tag);
        dialog.handle_event(AppEvent::Right);
        assert_eq!(dialog.color(), PALETTE[4].tag);

        dialog.handle_event(AppEvent::Tab);
        dialog.handle_event(AppEvent::Tab);
        assert_eq!(dialog.focus(), DialogField::End);
        type_text(&mut dialog, "2024-07-01 07:30");
        dialog.handle_event(AppEvent::Tab);
        assert_eq!(dialog.focus(), DialogField::Text);

        let draft = dialog.to_draft().unwrap();
        assert_eq!(draft.text, "Gym");
        assert_eq!(draft.end_time.as_str(), "2024-07-01 07:30");
    }

    #[test]
    fn bad_time_is_reported() {
        let mut dialog = TaskDialog::create(PALETTE[0].tag);
        dialog.handle_event(AppEvent::BackTab);
        assert_eq!(dialog.focus(), DialogField::End);
        type_text(&mut dialog, "soon");

        assert!(matches!(dialog.to_draft(), Err(DomainError::InvalidTime(_))));
    }

    #[test]
    fn enter_and_escape_finish_the_dialog() {
        let mut dialog = TaskDialog::create(PALETTE[0].tag);
        assert_eq!(dialog.handle_event(AppEvent::Enter), DialogOutcome::Submitted);
        assert_eq!(
            dialog.handle_event(AppEvent::CloseModal),
            DialogOutcome::Cancelled
        );
    }
}
