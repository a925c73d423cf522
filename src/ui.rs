use crate::calendar::{Cell, ViewMonth, WEEKDAY_ABBREVIATIONS};
use crate::codec::parse_canonical;
use crate::help::{HelpEvent, HelpModal};
use crate::model::Form;
use crate::page::{ChangeNotice, DocumentListener, FieldGroup, Page, Role};
use crate::picker::{DatePicker, PickerEvent, PickerState};
use crate::storage::{save_form, FormLocation};
use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::collections::BTreeMap;
use std::io::{stdout, Stdout};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub fn run(form: Form, location: FormLocation, log_dir: Option<&Path>) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(form, location, local_today);
    if let Some(dir) = log_dir {
        app.status = format!("{} • logs in {}", app.status, dir.display());
    }
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    app.unmount();
    result
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

struct App {
    form: Form,
    location: FormLocation,
    page: Page,
    pickers: BTreeMap<String, DatePicker>,
    today: fn() -> NaiveDate,
    selected: usize,
    editor: FieldValue,
    highlight: usize,
    help: HelpModal,
    last_save: Instant,
    dirty: bool,
    status: String,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    /// Takes `value` from the page; the caret jumps to the end only when the
    /// text was rewritten underneath it.
    fn reset(&mut self, value: &str) {
        if self.value != value {
            *self = FieldValue::new(value);
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn delete(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        let next = next_char(self.cursor, &self.value);
        self.value.drain(self.cursor..next);
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl App {
    fn new(form: Form, location: FormLocation, today: fn() -> NaiveDate) -> Self {
        let status = format!("Loaded form from {}", location.path.display());
        let mut app = App {
            form,
            location,
            page: Page::new(),
            pickers: BTreeMap::new(),
            today,
            selected: 0,
            editor: FieldValue::new(""),
            highlight: 0,
            help: HelpModal::new(),
            last_save: Instant::now(),
            dirty: false,
            status,
        };
        app.mount_fields();
        app
    }

    fn mount_fields(&mut self) {
        for field in &self.form.fields {
            self.page
                .insert_group(FieldGroup::date_field(field.id.clone(), &field.value));
            let picker = DatePicker::mount(&mut self.page, &field.id, Box::new(self.today));
            self.pickers.insert(field.id.clone(), picker);
        }
        self.refresh_editor();
    }

    fn unmount(&mut self) {
        for (id, picker) in std::mem::take(&mut self.pickers) {
            picker.destroy();
            self.page.remove_group(&id);
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if self.help.is_visible() {
            self.handle_help_key(key);
            return Ok(false);
        }
        let quit = if self.current_state() == Some(PickerState::Open) {
            self.handle_popup_key(key)
        } else {
            self.handle_field_key(key)?
        };
        self.observe_changes();
        self.refresh_editor();
        Ok(quit)
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                self.help.handle(HelpEvent::CloseButton)
            }
            _ => self.help.handle(HelpEvent::Dialog),
        }
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> bool {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.move_highlight(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_highlight(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_highlight(-7),
            KeyCode::Down | KeyCode::Char('j') => self.move_highlight(7),
            KeyCode::PageUp | KeyCode::Char('[') => {
                self.send(PickerEvent::PrevMonth);
                self.highlight_day(1);
            }
            KeyCode::PageDown | KeyCode::Char(']') => {
                self.send(PickerEvent::NextMonth);
                self.highlight_day(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.send(PickerEvent::CellClick(self.highlight)),
            KeyCode::Esc => self.dispatch_document(DocumentListener::Escape, None),
            KeyCode::F(2) => self.send(PickerEvent::TriggerClick),
            KeyCode::Char('o') if control => self.send(PickerEvent::TriggerClick),
            KeyCode::Tab => self.focus_field(self.selected + 1),
            KeyCode::BackTab => self.focus_field(self.selected.wrapping_sub(1)),
            _ => {}
        }
        false
    }

    fn handle_field_key(&mut self, key: KeyEvent) -> Result<bool> {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if !control => return Ok(true),
            KeyCode::Char('c') if control => return Ok(true),
            KeyCode::Char('s') if control => self.save()?,
            KeyCode::Char('o') if control => self.open_popup(),
            KeyCode::F(2) => self.open_popup(),
            KeyCode::Char('?') => self.show_help(),
            KeyCode::Esc => self.dispatch_document(DocumentListener::Escape, None),
            KeyCode::Up | KeyCode::BackTab => self.focus_field(self.selected.wrapping_sub(1)),
            KeyCode::Down | KeyCode::Tab | KeyCode::Enter => self.focus_field(self.selected + 1),
            KeyCode::Left => self.editor.move_left(),
            KeyCode::Right => self.editor.move_right(),
            KeyCode::Home => self.editor.cursor = 0,
            KeyCode::End => self.editor.cursor = self.editor.value.len(),
            KeyCode::Backspace => {
                self.editor.backspace();
                self.type_display();
            }
            KeyCode::Delete => {
                self.editor.delete();
                self.type_display();
            }
            KeyCode::Char(c) if !control && (c.is_ascii_digit() || c == '-') => {
                self.editor.insert_char(c);
                self.type_display();
            }
            _ => {}
        }
        Ok(false)
    }

    fn current_id(&self) -> Option<String> {
        self.form.fields.get(self.selected).map(|f| f.id.clone())
    }

    fn current_picker(&self) -> Option<&DatePicker> {
        self.form
            .fields
            .get(self.selected)
            .and_then(|f| self.pickers.get(&f.id))
    }

    fn current_state(&self) -> Option<PickerState> {
        self.current_picker().map(|p| p.state())
    }

    fn send(&mut self, event: PickerEvent) {
        let Some(id) = self.current_id() else {
            return;
        };
        if let Some(picker) = self.pickers.get_mut(&id) {
            picker.handle(&mut self.page, event);
        }
    }

    /// Delivers a document-level event to every registered owner.
    /// `inside` names the group the event landed on, if any.
    fn dispatch_document(&mut self, kind: DocumentListener, inside: Option<&str>) {
        for owner in self.page.subscribers(kind) {
            let event = match kind {
                DocumentListener::Escape => PickerEvent::Escape,
                DocumentListener::OutsideClick => PickerEvent::DocumentClick {
                    inside: inside == Some(owner.as_str()),
                },
            };
            if let Some(picker) = self.pickers.get_mut(&owner) {
                picker.handle(&mut self.page, event);
            }
        }
    }

    fn type_display(&mut self) {
        let Some(id) = self.current_id() else {
            return;
        };
        self.page.type_into(&id, Role::Display, &self.editor.value);
        self.send(PickerEvent::DisplayInput);
        self.dirty = true;
    }

    /// Moving to another field blurs the current one and counts as a click
    /// landing on the new field's group.
    fn focus_field(&mut self, target: usize) {
        if self.form.fields.is_empty() {
            return;
        }
        self.send(PickerEvent::DisplayBlur);
        let len = self.form.fields.len();
        self.selected = if target == usize::MAX {
            len - 1
        } else {
            target % len
        };
        let inside = self.current_id();
        self.dispatch_document(DocumentListener::OutsideClick, inside.as_deref());
        self.editor = FieldValue::new(self.current_display().as_str());
    }

    fn open_popup(&mut self) {
        self.send(PickerEvent::TriggerClick);
        if self.current_state() != Some(PickerState::Open) {
            return;
        }
        let hidden = self
            .current_id()
            .and_then(|id| self.page.role_value(&id, Role::Hidden).map(str::to_string))
            .unwrap_or_default();
        let anchor = parse_canonical(&hidden).unwrap_or_else(self.today);
        self.highlight_day(anchor.day());
    }

    fn highlight_day(&mut self, day: u32) {
        let index = self.current_picker().map(|picker| {
            let popup = picker.popup();
            popup
                .index_of(day)
                .or_else(|| popup.index_of(1))
                .unwrap_or(0)
        });
        if let Some(index) = index {
            self.highlight = index;
        }
    }

    /// Moves the highlighted cell, rolling into the adjacent month when it
    /// leaves the grid.
    fn move_highlight(&mut self, delta: isize) {
        let Some(picker) = self.current_picker() else {
            return;
        };
        let view = picker.popup().view();
        let cells = picker.popup().cells();
        let first = cells.iter().position(Cell::is_enabled).unwrap_or(0) as isize;
        let len = cells.len() as isize;
        let target = self.highlight as isize + delta;
        if target < first {
            self.send(PickerEvent::PrevMonth);
            let last = self
                .current_picker()
                .map(|p| p.popup().view())
                .filter(|shown| *shown != view)
                .map(ViewMonth::days_in_month);
            if let Some(last) = last {
                self.highlight_day(last);
            }
        } else if target >= len {
            self.send(PickerEvent::NextMonth);
            let moved = self
                .current_picker()
                .is_some_and(|p| p.popup().view() != view);
            if moved {
                self.highlight_day(1);
            }
        } else {
            self.highlight = target as usize;
        }
    }

    fn show_help(&mut self) {
        if let Some(field) = self.form.fields.get(self.selected) {
            field.field_help().activate(&mut self.help);
        }
    }

    /// Reacts to change notices the pickers emitted, the way a surrounding
    /// form would.
    fn observe_changes(&mut self) {
        for ChangeNotice { group, role, value } in self.page.drain_changes() {
            if role != Role::Display {
                continue;
            }
            let label = self
                .form
                .find_field(&group)
                .map(|f| f.label.clone())
                .unwrap_or_else(|| group.clone());
            self.status = format!("{} set to {}", label, value);
            self.dirty = true;
        }
    }

    fn refresh_editor(&mut self) {
        let display = self.current_display();
        self.editor.reset(&display);
        if self.editor.cursor > self.editor.value.len() {
            self.editor.cursor = self.editor.value.len();
        }
    }

    fn current_display(&self) -> String {
        self.current_id()
            .and_then(|id| self.page.role_value(&id, Role::Display).map(str::to_string))
            .unwrap_or_default()
    }

    /// Copies hidden values into the form, writes it out, then refreshes
    /// every field group from the saved form.
    fn save(&mut self) -> Result<()> {
        self.send(PickerEvent::DisplayBlur);
        let mut cleared = Vec::new();
        for idx in 0..self.form.fields.len() {
            let id = self.form.fields[idx].id.clone();
            let hidden = self
                .page
                .role_value(&id, Role::Hidden)
                .unwrap_or_default()
                .to_string();
            let typed = self
                .page
                .role_value(&id, Role::Display)
                .unwrap_or_default()
                .to_string();
            if hidden.is_empty() && !typed.is_empty() {
                cleared.push(self.form.fields[idx].label.clone());
            }
            if let Err(err) = self.form.set_value(&id, &hidden) {
                warn!(field = %id, %err, "rejected hidden value");
                self.form.set_value(&id, "")?;
            }
        }
        save_form(&self.location, &self.form)?;
        self.last_save = Instant::now();
        self.dirty = false;

        for field in &self.form.fields {
            self.page
                .insert_group(FieldGroup::date_field(field.id.clone(), &field.value));
            if let Some(picker) = self.pickers.get_mut(&field.id) {
                picker.update(&mut self.page);
            }
        }
        self.editor = FieldValue::new(self.current_display().as_str());
        debug!(
            path = %self.location.path.display(),
            listeners = self.page.listener_count(DocumentListener::OutsideClick),
            "form saved"
        );

        self.status = if cleared.is_empty() {
            format!("Saved to {}", self.location.path.display())
        } else {
            format!("Saved; invalid dates cleared: {}", cleared.join(", "))
        };
        Ok(())
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_fields(f, layout[1]);
        self.draw_footer(f, layout[2]);

        if self.current_state() == Some(PickerState::Open) {
            self.draw_calendar(f, layout[1]);
        }
        if self.help.is_visible() {
            self.draw_help(f);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "eudate ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                &self.form.name,
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                if self.dirty {
                    "unsaved changes".to_string()
                } else {
                    format!("saved {}", format_elapsed(self.last_save))
                },
                Style::default().fg(if self.dirty { Color::LightRed } else { Color::Gray }),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_fields(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Span::styled(
                "Dates",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        if self.form.fields.is_empty() {
            let msg = Paragraph::new("No date fields (add one with `eudate add <label>`)")
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(msg, area);
            return;
        }

        let label_width = self
            .form
            .fields
            .iter()
            .map(|f| f.label.chars().count())
            .max()
            .unwrap_or(0);
        let lines: Vec<Line<'static>> = self
            .form
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let active = idx == self.selected;
                let display = if active {
                    self.editor.with_caret()
                } else {
                    self.page
                        .role_value(&field.id, Role::Display)
                        .unwrap_or_default()
                        .to_string()
                };
                let hidden = self
                    .page
                    .role_value(&field.id, Role::Hidden)
                    .unwrap_or_default()
                    .to_string();
                field_line(&field.label, label_width, display, hidden, active)
            })
            .collect();
        let paragraph = Paragraph::new(lines).block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_calendar(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(picker) = self.current_picker() else {
            return;
        };
        let popup = picker.popup();
        let view = popup.view();
        let selected = self
            .page
            .role_value(picker.group(), Role::Hidden)
            .and_then(parse_canonical);
        let today = (self.today)();

        let mut lines = vec![
            Line::from(Span::styled(
                view.label(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(
                WEEKDAY_ABBREVIATIONS
                    .iter()
                    .map(|h| Span::styled(format!("{:^4}", h), Style::default().fg(Color::Gray)))
                    .collect::<Vec<_>>(),
            ),
        ];
        for (week_idx, week) in popup.cells().chunks(7).enumerate() {
            let spans: Vec<Span<'static>> = week
                .iter()
                .enumerate()
                .map(|(col, cell)| {
                    let idx = week_idx * 7 + col;
                    match cell {
                        Cell::Blank => Span::styled(
                            "    ",
                            Style::default().fg(Color::DarkGray),
                        ),
                        Cell::Day(day) => {
                            let date = view.date(*day);
                            let mut style = Style::default().fg(Color::Gray);
                            if date == Some(today) {
                                style = style.fg(Color::LightGreen);
                            }
                            if date.is_some() && date == selected {
                                style = style.fg(Color::LightYellow).add_modifier(Modifier::BOLD);
                            }
                            if idx == self.highlight {
                                style = style
                                    .bg(Color::Cyan)
                                    .fg(Color::Black)
                                    .add_modifier(Modifier::BOLD);
                            }
                            Span::styled(format!("{:^4}", day), style)
                        }
                    }
                })
                .collect();
            lines.push(Line::from(spans));
        }

        let width = 4 * 7 + 2;
        let height = lines.len() as u16 + 2;
        let rect = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + 1,
            width: width.min(area.width),
            height: height.min(area.height.saturating_sub(1)),
        };
        let block = Block::default()
            .title(Span::styled(
                "Calendar",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(Clear, rect);
        f.render_widget(paragraph, rect);
    }

    fn draw_help(&self, f: &mut ratatui::Frame<'_>) {
        let area = centered_rect(50, 30, f.size());
        let body = vec![
            Line::from(self.help.body().to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "Esc to close",
                Style::default().fg(Color::Gray),
            )),
        ];
        let dialog = Paragraph::new(body)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(Span::styled(
                        self.help.title().to_string(),
                        Style::default()
                            .fg(Color::LightMagenta)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightMagenta)),
            );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        if self.current_state() == Some(PickerState::Open) {
            return Line::from(vec![
                Span::styled("←↑↓→ / h j k l", Style::default().fg(Color::LightCyan)),
                Span::raw(" day  "),
                Span::styled("[ ]", Style::default().fg(Color::LightCyan)),
                Span::raw(" month  "),
                Span::styled("Enter", Style::default().fg(Color::LightGreen)),
                Span::raw(" pick  "),
                Span::styled("Esc", Style::default().fg(Color::LightRed)),
                Span::raw(" close"),
            ]);
        }
        Line::from(vec![
            Span::styled("↑↓ / Tab", Style::default().fg(Color::LightCyan)),
            Span::raw(" field  "),
            Span::styled("0-9 -", Style::default().fg(Color::LightCyan)),
            Span::raw(" type DD-MM-YYYY  "),
            Span::styled("F2/Ctrl+O", Style::default().fg(Color::LightGreen)),
            Span::raw(" calendar  "),
            Span::styled("?", Style::default().fg(Color::LightMagenta)),
            Span::raw(" help  "),
            Span::styled("Ctrl+S", Style::default().fg(Color::LightYellow)),
            Span::raw(" save  "),
            Span::styled("q", Style::default().fg(Color::LightRed)),
            Span::raw(" quit"),
        ])
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
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

fn field_line(
    label: &str,
    label_width: usize,
    display: String,
    hidden: String,
    active: bool,
) -> Line<'static> {
    let marker = if active { "▸ " } else { "  " };
    let label_style = Style::default()
        .fg(if active { Color::Cyan } else { Color::Gray })
        .add_modifier(Modifier::BOLD);
    let value_style = Style::default().fg(if active { Color::White } else { Color::Gray });
    let hidden_text = if hidden.is_empty() {
        "(none)".to_string()
    } else {
        hidden
    };
    Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Cyan)),
        Span::styled(format!("{:<width$}  ", label, width = label_width), label_style),
        Span::styled(format!("[{:<11}]", display), value_style),
        Span::raw("  "),
        Span::styled(
            hidden_text,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        ),
    ])
}

fn prev_char(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{load_form, FormScope};

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn app(dir: &Path) -> App {
        let mut form = Form::default_named("trip");
        form.set_value("start", "2024-03-07").unwrap();
        let location = FormLocation {
            path: dir.join("form.yml"),
            scope: FormScope::Project,
        };
        App::new(form, location, fixed_today)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(key(KeyCode::Char(ch))).unwrap();
        }
    }

    #[test]
    fn fields_mount_with_display_values() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());
        assert_eq!(app.editor.value, "07-03-2024");
        assert_eq!(app.page.listener_count(DocumentListener::Escape), 2);
    }

    #[test]
    fn popup_selection_updates_fields_and_status() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.handle_key(key(KeyCode::F(2))).unwrap();
        assert_eq!(app.current_state(), Some(PickerState::Open));
        assert_eq!(app.highlight, 10);

        app.handle_key(key(KeyCode::Right)).unwrap();
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.current_state(), Some(PickerState::Closed));
        assert_eq!(app.page.role_value("start", Role::Hidden), Some("2024-03-08"));
        assert_eq!(app.editor.value, "08-03-2024");
        assert!(app.status.contains("08-03-2024"));
        assert!(app.dirty);
    }

    #[test]
    fn empty_field_opens_on_today() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.handle_key(key(KeyCode::Down)).unwrap();
        app.handle_key(ctrl('o')).unwrap();
        let view = app.current_picker().unwrap().popup().view();
        assert_eq!((view.year, view.month), (2024, 3));
        assert_eq!(app.highlight, app.current_picker().unwrap().popup().index_of(15).unwrap());
    }

    #[test]
    fn highlight_rolls_into_previous_month() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.handle_key(key(KeyCode::F(2))).unwrap();
        app.handle_key(key(KeyCode::Up)).unwrap();
        let view = app.current_picker().unwrap().popup().view();
        assert_eq!((view.year, view.month), (2024, 2));
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.page.role_value("start", Role::Hidden), Some("2024-02-29"));
    }

    #[test]
    fn highlight_holds_at_january_1900() {
        let tmp = tempfile::tempdir().unwrap();
        let mut form = Form::default_named("archive");
        form.set_value("start", "1900-01-03").unwrap();
        let location = FormLocation {
            path: tmp.path().join("form.yml"),
            scope: FormScope::Project,
        };
        let mut app = App::new(form, location, fixed_today);
        app.handle_key(key(KeyCode::F(2))).unwrap();
        app.handle_key(key(KeyCode::Up)).unwrap();
        let view = app.current_picker().unwrap().popup().view();
        assert_eq!((view.year, view.month), (1900, 1));
        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.page.role_value("start", Role::Hidden), Some("1900-01-03"));
    }

    #[test]
    fn escape_and_focus_change_close_popup() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.handle_key(key(KeyCode::F(2))).unwrap();
        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert_eq!(app.current_state(), Some(PickerState::Closed));

        app.handle_key(key(KeyCode::F(2))).unwrap();
        app.handle_key(key(KeyCode::Tab)).unwrap();
        assert_eq!(app.selected, 1);
        assert!(app
            .pickers
            .values()
            .all(|p| p.state() == PickerState::Closed));
        assert_eq!(app.page.role_value("start", Role::Hidden), Some("2024-03-07"));
    }

    #[test]
    fn typing_invalid_date_clears_hidden_on_blur() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        for _ in 0..10 {
            app.handle_key(key(KeyCode::Backspace)).unwrap();
        }
        assert_eq!(app.page.role_value("start", Role::Hidden), Some(""));
        type_text(&mut app, "31-02-2024");
        app.handle_key(key(KeyCode::Tab)).unwrap();
        assert_eq!(app.page.role_value("start", Role::Hidden), Some(""));
        assert_eq!(app.page.role_value("start", Role::Display), Some("31-02-2024"));
    }

    #[test]
    fn typing_valid_date_then_saving_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.handle_key(key(KeyCode::Down)).unwrap();
        type_text(&mut app, "1-1-2025");
        assert_eq!(app.page.role_value("end", Role::Hidden), Some("2025-01-01"));

        app.handle_key(ctrl('s')).unwrap();
        assert!(!app.dirty);
        assert_eq!(app.page.role_value("end", Role::Display), Some("01-01-2025"));
        assert_eq!(app.page.listener_count(DocumentListener::OutsideClick), 2);

        let saved = load_form(&app.location).unwrap();
        assert_eq!(saved.find_field("end").unwrap().value, "2025-01-01");
        assert_eq!(saved.find_field("start").unwrap().value, "2024-03-07");
    }

    #[test]
    fn help_modal_opens_and_closes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.handle_key(key(KeyCode::Char('?'))).unwrap();
        assert!(app.help.is_visible());
        assert_eq!(app.help.title(), "Start date");
        app.handle_key(key(KeyCode::Char('x'))).unwrap();
        assert!(app.help.is_visible());
        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(!app.help.is_visible());
    }

    #[test]
    fn unmount_releases_listeners() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.unmount();
        assert_eq!(app.page.listener_count(DocumentListener::Escape), 0);
        assert_eq!(app.page.listener_count(DocumentListener::OutsideClick), 0);
    }

    #[test]
    fn quit_only_outside_popup() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app(tmp.path());
        app.handle_key(key(KeyCode::F(2))).unwrap();
        assert!(!app.handle_key(key(KeyCode::Char('q'))).unwrap());
        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(app.handle_key(key(KeyCode::Char('q'))).unwrap());
    }
}
