use color_eyre::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{
    event::{AppEvent, EventHandler},
    widgets::{DialogOutcome, SearchBar, TaskDialog},
};
use crate::application::{AppError, LoadReport, TaskRepository, ThemeStore};
use crate::domain::{ColorTag, Scheme, Task, TaskId, Theme, DONE_CARD};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

const NOTICE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Main,
    Search,
    Dialog,
    Help,
}

#[derive(Debug, Clone)]
struct Notice {
    text: String,
    is_error: bool,
    shown_at: Instant,
}

pub struct App {
    repository: Arc<TaskRepository>,
    themes: Arc<ThemeStore>,
    theme: Theme,
    default_color: ColorTag,

    // UI State
    mode: AppMode,
    search_bar: SearchBar,
    dialog: Option<TaskDialog>,
    notice: Option<Notice>,

    // Task list
    tasks: Vec<Task>,
    filtered_tasks: Vec<Task>,
    task_list_state: TableState,
}

impl App {
    pub fn new(
        repository: Arc<TaskRepository>,
        themes: Arc<ThemeStore>,
        default_color: ColorTag,
    ) -> Self {
        Self {
            repository,
            themes,
            theme: Theme::default(),
            default_color,
            mode: AppMode::Main,
            search_bar: SearchBar::new(),
            dialog: None,
            notice: None,
            tasks: Vec::new(),
            filtered_tasks: Vec::new(),
            task_list_state: TableState::default(),
        }
    }

    /// Picks up the stored theme and the already loaded task list.
    pub async fn initialize(&mut self, report: &LoadReport) {
        self.theme = self.themes.load_theme().await;

        match report {
            LoadReport::Empty => {}
            LoadReport::Restored(count) => tracing::debug!("Showing {} restored tasks", count),
            LoadReport::Renumbered { renumbered, .. } => self.show_notice(
                format!("Renumbered {renumbered} task(s) that shared an id with another task"),
                false,
            ),
            LoadReport::Recovered(reason) => self.show_notice(
                format!("Stored tasks could not be read, starting empty ({reason})"),
                true,
            ),
        }

        self.refresh().await;
        if !self.filtered_tasks.is_empty() {
            self.task_list_state.select(Some(0));
        }
    }

    /// Re-reads the repository, keeping the selection on the same task when
    /// it is still visible.
    async fn refresh(&mut self) {
        let selected = self.selected_task().map(|task| task.id);
        self.tasks = self.repository.tasks().await;
        self.update_filtered_tasks();

        if let Some(id) = selected {
            self.select_task(id);
        }
    }

    fn update_filtered_tasks(&mut self) {
        let search_bar = &mut self.search_bar;
        self.filtered_tasks = self
            .tasks
            .iter()
            .filter(|task| search_bar.matches(&task.text))
            .cloned()
            .collect();

        // Adjust selection if needed
        let selection = match self.task_list_state.selected() {
            _ if self.filtered_tasks.is_empty() => None,
            Some(i) if i >= self.filtered_tasks.len() => Some(self.filtered_tasks.len() - 1),
            Some(i) => Some(i),
            None => Some(0),
        };
        self.task_list_state.select(selection);
    }

    fn selected_task(&self) -> Option<&Task> {
        self.task_list_state
            .selected()
            .and_then(|i| self.filtered_tasks.get(i))
    }

    fn select_task(&mut self, id: TaskId) {
        if let Some(index) = self.filtered_tasks.iter().position(|task| task.id == id) {
            self.task_list_state.select(Some(index));
        }
    }

    fn show_notice(&mut self, text: impl Into<String>, is_error: bool) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error,
            shown_at: Instant::now(),
        });
    }

    fn report(&mut self, error: AppError) {
        tracing::warn!("Operation failed: {}", error);
        let text = match &error {
            AppError::Store(e) => format!("Change kept but not saved to disk: {e}"),
            other => other.to_string(),
        };
        self.show_notice(text, true);
    }

    pub async fn handle_event(&mut self, event: AppEvent) -> Result<bool> {
        match event {
            AppEvent::Quit => return Ok(true),
            AppEvent::Tick => {
                if self
                    .notice
                    .as_ref()
                    .is_some_and(|notice| notice.shown_at.elapsed() >= NOTICE_TTL)
                {
                    self.notice = None;
                }
                return Ok(false);
            }
            _ => {}
        }

        match self.mode {
            AppMode::Main => return Ok(self.handle_main_event(event).await),
            AppMode::Search => self.handle_search_event(event),
            AppMode::Dialog => self.handle_dialog_event(event).await,
            AppMode::Help => self.mode = AppMode::Main,
        }

        Ok(false)
    }

    async fn handle_main_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Character('q') => return true,
            AppEvent::Character('j') | AppEvent::Down => self.next_task(),
            AppEvent::Character('k') | AppEvent::Up => self.previous_task(),
            AppEvent::Character('g') | AppEvent::Home => self.first_task(),
            AppEvent::Character('G') | AppEvent::End => self.last_task(),
            AppEvent::Character('a') | AppEvent::Character('n') => self.open_create_dialog(),
            AppEvent::Character('e') | AppEvent::Enter => self.open_edit_dialog().await,
            AppEvent::Character(' ') => self.toggle_selected().await,
            AppEvent::Character('d') | AppEvent::Delete => self.delete_selected().await,
            AppEvent::Character('t') => self.toggle_theme().await,
            AppEvent::Character('/') => {
                self.mode = AppMode::Search;
                self.search_bar.set_focused(true);
            }
            AppEvent::Character('?') => self.mode = AppMode::Help,
            AppEvent::CloseModal => {
                if !self.search_bar.query().is_empty() {
                    self.search_bar.clear();
                    self.update_filtered_tasks();
                }
            }
            _ => {}
        }
        false
    }

    fn handle_search_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Character(c) => {
                self.search_bar.insert_char(c);
                self.update_filtered_tasks();
            }
            AppEvent::Backspace => {
                self.search_bar.delete_char();
                self.update_filtered_tasks();
            }
            AppEvent::CloseModal => {
                self.search_bar.clear();
                self.update_filtered_tasks();
                self.leave_search();
            }
            AppEvent::Enter | AppEvent::Tab | AppEvent::Down => self.leave_search(),
            _ => {}
        }
    }

    fn leave_search(&mut self) {
        self.search_bar.set_focused(false);
        self.mode = AppMode::Main;
    }

    async fn handle_dialog_event(&mut self, event: AppEvent) {
        let Some(dialog) = self.dialog.as_mut() else {
            self.mode = AppMode::Main;
            return;
        };

        match dialog.handle_event(event) {
            DialogOutcome::Pending => {}
            DialogOutcome::Cancelled => self.close_dialog(),
            DialogOutcome::Submitted => self.submit_dialog().await,
        }
    }

    fn open_create_dialog(&mut self) {
        self.dialog = Some(TaskDialog::create(self.default_color));
        self.mode = AppMode::Dialog;
    }

    async fn open_edit_dialog(&mut self) {
        let Some(id) = self.selected_task().map(|task| task.id) else {
            return;
        };

        match self.repository.get(id).await {
            Ok(task) => {
                self.dialog = Some(TaskDialog::edit(&task));
                self.mode = AppMode::Dialog;
            }
            Err(e) => {
                self.report(e);
                self.refresh().await;
            }
        }
    }

    fn close_dialog(&mut self) {
        self.dialog = None;
        self.mode = AppMode::Main;
    }

    async fn submit_dialog(&mut self) {
        let Some(dialog) = self.dialog.as_ref() else {
            return;
        };

        let draft = match dialog.to_draft() {
            Ok(draft) => draft,
            Err(e) => {
                self.show_notice(e.to_string(), true);
                return;
            }
        };

        let result = match dialog.editing() {
            None => self.repository.create(draft).await,
            Some(id) => self.repository.update(id, draft).await,
        };

        match result {
            Ok(task) => {
                self.close_dialog();
                self.refresh().await;
                self.select_task(task.id);
            }
            // The dialog stays open so the user can fix the input
            Err(AppError::Validation(e)) => self.show_notice(e.to_string(), true),
            Err(e) => {
                self.close_dialog();
                self.report(e);
                self.refresh().await;
            }
        }
    }

    async fn toggle_selected(&mut self) {
        let Some((id, is_done)) = self.selected_task().map(|task| (task.id, task.is_done)) else {
            return;
        };

        if let Err(e) = self.repository.toggle(id, !is_done).await {
            self.report(e);
        }
        self.refresh().await;
    }

    async fn delete_selected(&mut self) {
        let Some(id) = self.selected_task().map(|task| task.id) else {
            return;
        };

        match self.repository.delete(id).await {
            Ok(task) => self.show_notice(format!("Deleted \"{}\"", task.text), false),
            Err(e) => self.report(e),
        }
        self.refresh().await;
    }

    async fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(e) = self.themes.save_theme(self.theme).await {
            self.report(e);
        }
    }

    fn next_task(&mut self) {
        if self.filtered_tasks.is_empty() {
            return;
        }

        let current = self.task_list_state.selected().unwrap_or(0);
        let next = if current >= self.filtered_tasks.len() - 1 {
            0
        } else {
            current + 1
        };
        self.task_list_state.select(Some(next));
    }

    fn previous_task(&mut self) {
        if self.filtered_tasks.is_empty() {
            return;
        }

        let current = self.task_list_state.selected().unwrap_or(0);
        let previous = if current == 0 {
            self.filtered_tasks.len() - 1
        } else {
            current - 1
        };
        self.task_list_state.select(Some(previous));
    }

    fn first_task(&mut self) {
        if !self.filtered_tasks.is_empty() {
            self.task_list_state.select(Some(0));
        }
    }

    fn last_task(&mut self) {
        if !self.filtered_tasks.is_empty() {
            self.task_list_state
                .select(Some(self.filtered_tasks.len() - 1));
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let scheme = self.theme.scheme();

        frame.render_widget(
            Block::default().style(Style::default().bg(scheme.background).fg(scheme.foreground)),
            frame.area(),
        );

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Length(3), // Search bar
                Constraint::Min(0),    // Task list
                Constraint::Length(1), // Status bar
            ])
            .split(frame.area());

        self.render_header(frame, main_chunks[0], &scheme);
        self.search_bar.render(frame, main_chunks[1], &scheme);
        self.render_task_list(frame, main_chunks[2], &scheme);
        self.render_status_bar(frame, main_chunks[3], &scheme);

        match self.mode {
            AppMode::Dialog => {
                if let Some(dialog) = &self.dialog {
                    dialog.render(frame, Self::centered_rect(60, 80, frame.area()), &scheme);
                }
            }
            AppMode::Help => self.render_help(frame, &scheme),
            AppMode::Main | AppMode::Search => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, scheme: &Scheme) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(14)])
            .split(area);

        let title = Paragraph::new(" Todo").style(
            Style::default()
                .fg(scheme.primary)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(title, chunks[0]);

        let icon = if self.theme.is_dark() { "☾" } else { "☀" };
        let label = Paragraph::new(format!("{icon} {} (t) ", self.theme.label()))
            .alignment(Alignment::Right)
            .style(Style::default().fg(scheme.muted));
        frame.render_widget(label, chunks[1]);
    }

    fn render_task_list(&mut self, frame: &mut Frame, area: Rect, scheme: &Scheme) {
        let title = if self.search_bar.query().is_empty() {
            format!("Tasks ({})", self.tasks.len())
        } else {
            format!("Tasks ({} of {})", self.filtered_tasks.len(), self.tasks.len())
        };
        let border_style = if self.mode == AppMode::Main {
            Style::default().fg(scheme.primary)
        } else {
            Style::default().fg(scheme.muted)
        };

        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style);

        if self.filtered_tasks.is_empty() {
            let message = if self.search_bar.query().is_empty() {
                "No tasks yet. Press a to add one."
            } else {
                "No tasks match your filter"
            };
            let paragraph = Paragraph::new(message)
                .block(block)
                .style(Style::default().fg(scheme.muted));
            frame.render_widget(paragraph, area);
            return;
        }

        let rows: Vec<Row> = self.filtered_tasks.iter().map(task_row).collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(4), // Checkbox
                Constraint::Min(10),   // Text and times
            ],
        )
        .block(block)
        .column_spacing(1)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▶ ");

        frame.render_stateful_widget(table, area, &mut self.task_list_state);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, scheme: &Scheme) {
        if let Some(notice) = &self.notice {
            let color = if notice.is_error {
                Color::Red
            } else {
                scheme.primary
            };
            let paragraph = Paragraph::new(notice.text.as_str()).style(Style::default().fg(color));
            frame.render_widget(paragraph, area);
            return;
        }

        let help_text = match self.mode {
            AppMode::Main => "a: new | e: edit | Space: done | d: delete | t: theme | /: filter | q: quit | ?: help",
            AppMode::Search => "Type to filter | Enter: back to tasks | Esc: clear filter",
            AppMode::Dialog => "Tab: next field | ←/→: color | Enter: save | Esc: cancel",
            AppMode::Help => "Press any key to close help",
        };

        let paragraph = Paragraph::new(help_text).style(Style::default().fg(scheme.muted));
        frame.render_widget(paragraph, area);
    }

    fn render_help(&self, frame: &mut Frame, scheme: &Scheme) {
        let popup_area = Self::centered_rect(60, 70, frame.area());

        frame.render_widget(Clear, popup_area);

        let help_text = [
            "Todo Help",
            "",
            "Navigation:",
            "  j/k or ↑/↓     - Move up/down in the task list",
            "  g/G            - Go to first/last task",
            "",
            "Task Actions:",
            "  a or n         - New task",
            "  e or Enter     - Edit selected task",
            "  Space          - Toggle done",
            "  d or Delete    - Delete selected task",
            "",
            "Edit Dialog:",
            "  Tab/Shift+Tab  - Next/previous field",
            "  ←/→ or 1-6     - Pick a color (on the color field)",
            "  Enter          - Save",
            "  Esc            - Cancel",
            "",
            "Filter:",
            "  /              - Focus filter bar",
            "  Esc            - Clear filter",
            "",
            "General:",
            "  t              - Switch light/dark theme",
            "  ?              - Show this help",
            "  q or Ctrl+C    - Quit",
            "",
            "Press any key to close this help",
        ]
        .join("\n");

        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .title("Help")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(scheme.primary)),
            )
            .style(Style::default().bg(scheme.surface).fg(scheme.foreground))
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, popup_area);
    }

    fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
        let popup_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ])
            .split(r);

        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ])
            .split(popup_layout[1])[1]
    }
}

/// One card per task: tag color background, or neutral gray once done.
fn task_row(task: &Task) -> Row<'static> {
    let card = if task.is_done { DONE_CARD } else { task.color_tag };
    let text_color = if task.is_done {
        Color::Rgb(0x80, 0x80, 0x80)
    } else if card.prefers_light_text() {
        Color::White
    } else {
        Color::Black
    };

    let mut text_style = Style::default().fg(text_color);
    if task.is_done {
        text_style = text_style.add_modifier(Modifier::CROSSED_OUT);
    }

    let mut lines = vec![Line::from(Span::styled(task.text.clone(), text_style))];
    if task.has_schedule() {
        let mut times = Vec::new();
        if !task.start_time.is_unset() {
            times.push(format!("Start: {}", task.start_time));
        }
        if !task.end_time.is_unset() {
            times.push(format!("End: {}", task.end_time));
        }
        lines.push(Line::from(Span::styled(
            times.join("  "),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let height = lines.len() as u16;
    Row::new(vec![
        Cell::from(task.status_marker()),
        Cell::from(Text::from(lines)),
    ])
    .height(height)
    .style(Style::default().bg(card.to_terminal()).fg(text_color))
}

pub async fn run_tui(mut app: App, report: &LoadReport) -> Result<()> {
    // color-eyre is already initialized in main.rs

    // Set up terminal
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.initialize(report).await;

    let mut event_handler = EventHandler::new();

    let result: Result<()> = async {
        loop {
            terminal.draw(|frame| app.render(frame))?;

            let event = event_handler.next_event()?;
            if app.handle_event(event).await? {
                return Ok(());
            }
        }
    }
    .await;

    // Cleanup
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}
