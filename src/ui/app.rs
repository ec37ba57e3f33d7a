use std::mem;
use std::path::Path;

use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;
use tracing::warn;

use crate::db::{
    authenticate, create_student, delete_student, search_students, update_student, Database,
};
use crate::error::Result;
use crate::export::{export_csv, student_rows, STUDENT_HEADERS};
use crate::models::{Selection, Student};

use super::forms::{ExportPrompt, LoginField, LoginForm, StudentField, StudentForm};
use super::helpers::{centered_rect, cursor_column};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Pre-filled destination for CSV exports.
const DEFAULT_EXPORT_PATH: &str = "students.csv";

/// The login gate runs once; after it the records screen stays up until exit.
enum Screen {
    Login(LoginForm),
    Records,
}

/// Fine-grained modes scoped to the records screen.
enum Mode {
    Normal,
    AddingStudent(StudentForm),
    EditingStudent {
        selection: Selection,
        form: StudentForm,
    },
    ConfirmDelete(Selection),
    Searching(SearchState),
    Exporting(ExportPrompt),
}

/// State for the live search bar. The query in here mirrors `App::filter`
/// while the bar is open.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state. Records in `students` are a display copy of the
/// last query; every mutation re-queries storage.
pub struct App {
    db: Database,
    screen: Screen,
    mode: Mode,
    students: Vec<Student>,
    selected: usize,
    filter: String,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            screen: Screen::Login(LoginForm::default()),
            mode: Mode::Normal,
            students: Vec::new(),
            selected: 0,
            filter: String::new(),
            status: None,
        }
    }

    /// Apply one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        if let Screen::Login(form) = &mut self.screen {
            let form = mem::take(form);
            return self.handle_login(code, form);
        }

        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::AddingStudent(form) => self.handle_add_student(code, form),
            Mode::EditingStudent { selection, form } => {
                self.handle_edit_student(code, selection, form)
            }
            Mode::ConfirmDelete(selection) => self.handle_confirm_delete(code, selection),
            Mode::Searching(state) => self.handle_search(code, state),
            Mode::Exporting(prompt) => self.handle_export(code, prompt),
        };

        exit
    }

    fn handle_login(&mut self, code: KeyCode, mut form: LoginForm) -> bool {
        match code {
            KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match authenticate(&self.db, &form.username, &form.password) {
                Ok(true) => {
                    self.screen = Screen::Records;
                    match self.reload_students(None) {
                        Ok(()) => self.set_status(
                            format!("Welcome, {}.", form.username),
                            StatusKind::Info,
                        ),
                        Err(err) => self.set_status(err.to_string(), StatusKind::Error),
                    }
                    return false;
                }
                Ok(false) => {
                    form.password.clear();
                    form.error = Some("Invalid username or password.".to_string());
                }
                Err(err) => {
                    form.error = Some(err.to_string());
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        self.screen = Screen::Login(form);
        false
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.students.len().saturating_sub(1),
            KeyCode::Char('+') | KeyCode::Char('a') => {
                self.clear_status();
                return Mode::AddingStudent(StudentForm::default());
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(student) = self.current_student() {
                    let selection = Selection::from(student);
                    let form = StudentForm::from_student(student);
                    self.clear_status();
                    return Mode::EditingStudent { selection, form };
                }
                self.set_status("No student selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') | KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(student) = self.current_student() {
                    return Mode::ConfirmDelete(Selection::from(student));
                }
                self.set_status("No student selected to delete.", StatusKind::Error);
            }
            KeyCode::Char('f') | KeyCode::Char('/') => {
                return Mode::Searching(SearchState {
                    query: self.filter.clone(),
                });
            }
            KeyCode::Char('x') => {
                return Mode::Exporting(ExportPrompt::with_path(DEFAULT_EXPORT_PATH));
            }
            KeyCode::Char('r') => match self.reload_students(None) {
                Ok(()) => self.set_status("Reloaded.", StatusKind::Info),
                Err(err) => self.set_status(err.to_string(), StatusKind::Error),
            },
            _ => {}
        }
        Mode::Normal
    }

    fn handle_add_student(&mut self, code: KeyCode, mut form: StudentForm) -> Mode {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Add student cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_student(&form) {
                Ok(()) => keep_open = false,
                Err(err) => {
                    let message = err.to_string();
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Mode::AddingStudent(form)
        } else {
            Mode::Normal
        }
    }

    fn handle_edit_student(
        &mut self,
        code: KeyCode,
        selection: Selection,
        mut form: StudentForm,
    ) -> Mode {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_existing_student(&selection, &form) {
                Ok(()) => keep_open = false,
                Err(err) => {
                    let message = err.to_string();
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Mode::EditingStudent { selection, form }
        } else {
            Mode::Normal
        }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, selection: Selection) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&selection) {
                    Ok(()) => {}
                    Err(err) => self.set_status(err.to_string(), StatusKind::Error),
                }
                Mode::Normal
            }
            _ => Mode::ConfirmDelete(selection),
        }
    }

    /// Every keystroke re-runs the query so the table always reflects storage.
    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Mode {
        match code {
            KeyCode::Esc => {
                self.filter.clear();
                if let Err(err) = self.reload_students(None) {
                    self.set_status(err.to_string(), StatusKind::Error);
                } else {
                    self.clear_status();
                }
                return Mode::Normal;
            }
            KeyCode::Enter => return Mode::Normal,
            KeyCode::Up => {
                self.move_selection(-1);
                return Mode::Searching(state);
            }
            KeyCode::Down => {
                self.move_selection(1);
                return Mode::Searching(state);
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => state.query.push(ch),
            _ => return Mode::Searching(state),
        }

        let previous = mem::replace(&mut self.filter, state.query.clone());
        match self.reload_students(None) {
            Ok(()) => self.clear_status(),
            Err(err) => {
                state.query = previous.clone();
                self.filter = previous;
                self.set_status(err.to_string(), StatusKind::Error);
            }
        }
        Mode::Searching(state)
    }

    fn handle_export(&mut self, code: KeyCode, mut prompt: ExportPrompt) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Export cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Backspace => {
                prompt.backspace();
                Mode::Exporting(prompt)
            }
            KeyCode::Enter => {
                let path = prompt.path.trim().to_string();
                if path.is_empty() {
                    prompt.error = Some("Destination path is required.".to_string());
                    return Mode::Exporting(prompt);
                }
                match self.export_displayed(Path::new(&path)) {
                    Ok(()) => {
                        self.set_status(
                            format!("Exported {} rows to {path}.", self.students.len()),
                            StatusKind::Info,
                        );
                        Mode::Normal
                    }
                    Err(err) => {
                        let message = err.to_string();
                        prompt.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                        Mode::Exporting(prompt)
                    }
                }
            }
            KeyCode::Char(ch) => {
                if prompt.push_char(ch) {
                    prompt.error = None;
                }
                Mode::Exporting(prompt)
            }
            _ => Mode::Exporting(prompt),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        if let Screen::Login(form) = &self.screen {
            self.draw_login(frame, area, form);
            return;
        }

        let footer_height = FOOTER_HEIGHT.min(area.height);
        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        self.draw_student_table(frame, content_area);
        if area.height > footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingStudent(form) => self.draw_student_form(frame, area, "Add Student", form),
            Mode::EditingStudent { selection, form } => {
                let title = format!("Edit Student #{}", selection.id);
                self.draw_student_form(frame, area, &title, form)
            }
            Mode::ConfirmDelete(selection) => self.draw_confirm_delete(frame, area, selection),
            Mode::Searching(state) => self.draw_search_bar(frame, area, state),
            Mode::Exporting(prompt) => self.draw_export_prompt(frame, area, prompt),
            Mode::Normal => {}
        }
    }

    fn draw_login(&self, frame: &mut Frame, area: Rect, form: &LoginForm) {
        let popup_area = centered_rect(50, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Login").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Username", LoginField::Username),
            form.build_line("Password", LoginField::Password),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to log in • Tab to switch • Esc to quit",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let (label, row) = match form.active {
            LoginField::Username => ("Username", 0),
            LoginField::Password => ("Password", 1),
        };
        frame.set_cursor_position((
            cursor_column(inner, label, form.value_len(form.active)),
            inner.y + row,
        ));
    }

    fn draw_student_table(&self, frame: &mut Frame, area: Rect) {
        let title = if self.filter.is_empty() {
            format!("Students ({})", self.students.len())
        } else {
            format!("Students matching \"{}\" ({})", self.filter, self.students.len())
        };
        let block = Block::default().title(title).borders(Borders::ALL);

        if self.students.is_empty() {
            let message = if self.filter.is_empty() {
                "No students yet. Press '+' to add one."
            } else {
                "No students match the search."
            };
            let paragraph = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let header_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let header = Row::new(STUDENT_HEADERS.iter().map(|label| Cell::from(*label)))
            .style(header_style);
        let rows = self
            .students
            .iter()
            .map(|student| Row::new(student.to_row().into_iter().map(Cell::from)));

        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Percentage(45),
                Constraint::Length(5),
                Constraint::Min(10),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);

        match self.mode {
            Mode::Searching(_) => Line::from(vec![
                Span::styled("[type]", key_style),
                Span::raw(" Filter   "),
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Keep   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Clear"),
            ]),
            _ => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[f]", key_style),
                Span::raw(" Search   "),
                Span::styled("[x]", key_style),
                Span::raw(" Export CSV   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
        }
    }

    fn draw_student_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &StudentForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Name", StudentField::Name),
            form.build_line("Age", StudentField::Age),
            form.build_line("Course", StudentField::Course),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let (label, row) = match form.active {
            StudentField::Name => ("Name", 0),
            StudentField::Age => ("Age", 1),
            StudentField::Course => ("Course", 2),
        };
        frame.set_cursor_position((
            cursor_column(inner, label, form.value_len(form.active)),
            inner.y + row,
        ));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, selection: &Selection) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let lines = vec![
            Line::from(format!("Delete {} (#{})?", selection.name, selection.id)),
            Line::from(""),
            Line::from(Span::styled(
                "y / Enter to confirm • n / Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search by name");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        frame.set_cursor_position((
            cursor_column(inner, "Search", state.query.chars().count()),
            inner.y,
        ));
    }

    fn draw_export_prompt(&self, frame: &mut Frame, area: Rect, prompt: &ExportPrompt) {
        let popup_area = centered_rect(70, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Export CSV").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            Line::from(format!("Path: {}", prompt.path)),
            Line::from(""),
        ];
        match &prompt.error {
            Some(error) => lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            ))),
            None => lines.push(Line::from(Span::styled(
                format!(
                    "Enter to write {} displayed rows • Esc to cancel",
                    self.students.len()
                ),
                Style::default().fg(Color::Gray),
            ))),
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
        frame.set_cursor_position((
            cursor_column(inner, "Path", prompt.path.chars().count()),
            inner.y,
        ));
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Once `create_student` returns the row is committed; a failed reload
    /// after that is reported separately and never reopens the form.
    fn save_new_student(&mut self, form: &StudentForm) -> Result<()> {
        let student = create_student(&self.db, &form.name, &form.age, &form.course)?;
        self.refresh_after_mutation(Some(student.id), format!("Added {student}."));
        Ok(())
    }

    fn save_existing_student(&mut self, selection: &Selection, form: &StudentForm) -> Result<()> {
        update_student(&self.db, selection.id, &form.name, &form.age, &form.course)?;
        self.refresh_after_mutation(
            Some(selection.id),
            format!("Updated student #{}.", selection.id),
        );
        Ok(())
    }

    fn perform_delete(&mut self, selection: &Selection) -> Result<()> {
        if let Err(err) = delete_student(&self.db, selection.id) {
            warn!(id = selection.id, error = %err, "delete failed");
            // A stale selection still refreshes the table so the ghost row goes away.
            if let Err(reload_err) = self.reload_students(None) {
                warn!(error = %reload_err, "reload after failed delete failed");
            }
            return Err(err);
        }

        self.refresh_after_mutation(
            None,
            format!("Deleted {} (#{}).", selection.name, selection.id),
        );
        Ok(())
    }

    /// Reload after a committed mutation. A reload failure keeps the old rows
    /// on screen and is appended to the success message.
    fn refresh_after_mutation(&mut self, focus_id: Option<i64>, done: String) {
        match self.reload_students(focus_id) {
            Ok(()) => self.set_status(done, StatusKind::Info),
            Err(err) => {
                warn!(error = %err, "reload after mutation failed");
                self.set_status(
                    format!("{done} Refreshing the table failed: {err}"),
                    StatusKind::Error,
                );
            }
        }
    }

    /// The rows currently on screen, exactly as displayed.
    fn export_displayed(&self, path: &Path) -> Result<()> {
        export_csv(path, &STUDENT_HEADERS, &student_rows(&self.students))
    }

    /// Re-query storage with the active filter. On failure the previous rows
    /// stay on screen.
    fn reload_students(&mut self, focus_id: Option<i64>) -> Result<()> {
        self.students = search_students(&self.db, &self.filter)?;
        if self.students.is_empty() {
            self.selected = 0;
            return Ok(());
        }

        if let Some(id) = focus_id {
            if let Some(idx) = self.students.iter().position(|s| s.id == id) {
                self.selected = idx;
                return Ok(());
            }
        }

        if self.selected >= self.students.len() {
            self.selected = self.students.len() - 1;
        }
        Ok(())
    }

    fn current_student(&self) -> Option<&Student> {
        self.students.get(self.selected)
    }

    fn move_selection(&mut self, offset: isize) {
        if self.students.is_empty() {
            return;
        }
        let last = self.students.len() - 1;
        self.selected = self.selected.saturating_add_signed(offset).min(last);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::db::{create_user, list_students};

    use super::*;

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch));
        }
    }

    fn logged_in_app() -> App {
        let db = Database::open_in_memory().unwrap();
        create_user(&db, "admin", "pw").unwrap();
        create_student(&db, "Alice", "20", "CS").unwrap();
        create_student(&db, "Bob", "22", "Math").unwrap();

        let mut app = App::new(db);
        type_text(&mut app, "admin");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "pw");
        assert!(!app.handle_key(KeyCode::Enter));
        assert!(matches!(app.screen, Screen::Records));
        app
    }

    fn names(app: &App) -> Vec<&str> {
        app.students.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn failed_login_stays_on_login_screen() {
        let db = Database::open_in_memory().unwrap();
        create_user(&db, "admin", "pw").unwrap();
        let mut app = App::new(db);

        type_text(&mut app, "admin");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "PW");
        app.handle_key(KeyCode::Enter);

        match &app.screen {
            Screen::Login(form) => {
                assert_eq!(form.error.as_deref(), Some("Invalid username or password."));
                assert!(form.password.is_empty());
                assert_eq!(form.username, "admin");
            }
            Screen::Records => panic!("login should have been rejected"),
        }
        assert!(app.students.is_empty());
    }

    #[test]
    fn escape_on_login_quits() {
        let mut app = App::new(Database::open_in_memory().unwrap());
        assert!(app.handle_key(KeyCode::Esc));
    }

    #[test]
    fn successful_login_loads_every_student() {
        let app = logged_in_app();
        assert_eq!(names(&app), ["Alice", "Bob"]);
    }

    #[test]
    fn adding_through_the_form_refreshes_the_table() {
        let mut app = logged_in_app();

        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Carol");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "2x1");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Biology");
        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(names(&app), ["Alice", "Bob", "Carol"]);
        let carol = &app.students[app.selected];
        assert_eq!(carol.name, "Carol");
        assert_eq!(carol.age, 21);
    }

    #[test]
    fn incomplete_form_keeps_popup_open_and_writes_nothing() {
        let mut app = logged_in_app();

        app.handle_key(KeyCode::Char('a'));
        type_text(&mut app, "Dave");
        app.handle_key(KeyCode::Enter);

        match &app.mode {
            Mode::AddingStudent(form) => {
                assert_eq!(form.error.as_deref(), Some("Age is required."));
            }
            _ => panic!("form should stay open"),
        }
        assert_eq!(list_students(&app.db).unwrap().len(), 2);
    }

    #[test]
    fn editing_uses_the_selected_record_id() {
        let mut app = logged_in_app();

        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char('e'));
        for _ in 0.."Bob".len() {
            app.handle_key(KeyCode::Backspace);
        }
        type_text(&mut app, "Robert");
        app.handle_key(KeyCode::Enter);

        assert_eq!(names(&app), ["Alice", "Robert"]);
        assert_eq!(app.students[1].age, 22);
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut app = logged_in_app();

        app.handle_key(KeyCode::Char('-'));
        app.handle_key(KeyCode::Char('n'));
        assert_eq!(names(&app), ["Alice", "Bob"]);

        app.handle_key(KeyCode::Char('-'));
        app.handle_key(KeyCode::Char('y'));
        assert_eq!(names(&app), ["Bob"]);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn deleting_a_stale_selection_reports_not_found() {
        let mut app = logged_in_app();
        let alice_id = app.students[0].id;
        delete_student(&app.db, alice_id).unwrap();

        app.handle_key(KeyCode::Char('d'));
        app.handle_key(KeyCode::Enter);

        let status = app.status.as_ref().unwrap();
        assert!(matches!(status.kind, StatusKind::Error));
        assert!(status.text.contains("not found"));
        assert_eq!(names(&app), ["Bob"]);
    }

    #[test]
    fn edit_and_delete_need_a_selection() {
        let db = Database::open_in_memory().unwrap();
        create_user(&db, "u", "p").unwrap();
        let mut app = App::new(db);
        type_text(&mut app, "u");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "p");
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('e'));
        assert!(matches!(app.mode, Mode::Normal));
        app.handle_key(KeyCode::Char('d'));
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(
            app.status.as_ref().map(|s| s.text.as_str()),
            Some("No student selected to delete.")
        );
    }

    #[test]
    fn search_filters_on_every_keystroke() {
        let mut app = logged_in_app();

        app.handle_key(KeyCode::Char('f'));
        type_text(&mut app, "AL");
        assert_eq!(names(&app), ["Alice"]);

        app.handle_key(KeyCode::Backspace);
        app.handle_key(KeyCode::Backspace);
        assert_eq!(names(&app), ["Alice", "Bob"]);

        type_text(&mut app, "b");
        app.handle_key(KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(names(&app), ["Bob"]);

        app.handle_key(KeyCode::Char('/'));
        app.handle_key(KeyCode::Esc);
        assert!(app.filter.is_empty());
        assert_eq!(names(&app), ["Alice", "Bob"]);
    }

    #[test]
    fn mutations_respect_the_active_filter() {
        let mut app = logged_in_app();
        app.handle_key(KeyCode::Char('f'));
        type_text(&mut app, "bob");
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Zed");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "30");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Art");
        app.handle_key(KeyCode::Enter);

        assert_eq!(names(&app), ["Bob"]);
        assert_eq!(list_students(&app.db).unwrap().len(), 3);
    }

    #[test]
    fn export_writes_the_displayed_rows() {
        let mut app = logged_in_app();
        app.handle_key(KeyCode::Char('f'));
        type_text(&mut app, "ali");
        app.handle_key(KeyCode::Enter);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        app.mode = Mode::Exporting(ExportPrompt::with_path(path.to_string_lossy()));
        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        let id = app.students[0].id;
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("ID,Name,Age,Course\r\n{id},Alice,20,CS\r\n")
        );
    }

    #[test]
    fn export_failure_keeps_the_prompt_open() {
        let mut app = logged_in_app();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        app.mode = Mode::Exporting(ExportPrompt::with_path(path.to_string_lossy()));
        app.handle_key(KeyCode::Enter);

        match &app.mode {
            Mode::Exporting(prompt) => assert!(prompt.error.is_some()),
            _ => panic!("prompt should stay open after a failed export"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn selection_is_clamped_to_the_listing() {
        let mut app = logged_in_app();
        app.handle_key(KeyCode::Up);
        assert_eq!(app.selected, 0);
        for _ in 0..5 {
            app.handle_key(KeyCode::Down);
        }
        assert_eq!(app.selected, 1);
        app.handle_key(KeyCode::Home);
        assert_eq!(app.selected, 0);
        app.handle_key(KeyCode::End);
        assert_eq!(app.selected, 1);
    }

    #[test]
    fn quit_from_the_records_screen() {
        let mut app = logged_in_app();
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    /// Slip in a row whose age is text. SQLite stores it, but every read that
    /// reaches it fails to map.
    fn insert_unreadable_row(app: &App) {
        app.db
            .execute(
                "INSERT INTO students (name, age, course) VALUES ('Ghost', 'n/a', 'None')",
                [],
            )
            .unwrap();
    }

    fn count_named(app: &App, name: &str) -> i64 {
        app.db
            .query(
                "SELECT COUNT(*) FROM students WHERE name = ?1",
                [name],
                |row| row.get::<_, i64>(0),
            )
            .unwrap()[0]
    }

    #[test]
    fn committed_add_closes_form_even_when_reload_fails() {
        let mut app = logged_in_app();
        insert_unreadable_row(&app);

        app.handle_key(KeyCode::Char('+'));
        type_text(&mut app, "Carol");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "21");
        app.handle_key(KeyCode::Tab);
        type_text(&mut app, "Bio");
        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        let status = app.status.as_ref().unwrap();
        assert!(matches!(status.kind, StatusKind::Error));
        assert!(status.text.starts_with("Added Carol"));
        assert_eq!(names(&app), ["Alice", "Bob"]);
        assert_eq!(count_named(&app, "Carol"), 1);
    }

    #[test]
    fn committed_update_and_delete_survive_a_failed_reload() {
        let mut app = logged_in_app();
        insert_unreadable_row(&app);

        app.handle_key(KeyCode::Char('e'));
        for _ in 0.."Alice".len() {
            app.handle_key(KeyCode::Backspace);
        }
        type_text(&mut app, "Alicia");
        app.handle_key(KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.status.as_ref().unwrap().text.starts_with("Updated student"));
        assert_eq!(count_named(&app, "Alicia"), 1);

        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char('d'));
        app.handle_key(KeyCode::Char('y'));
        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.status.as_ref().unwrap().text.starts_with("Deleted Bob"));
        assert_eq!(count_named(&app, "Bob"), 0);
    }

    #[test]
    fn failed_search_keeps_query_and_filter_in_step() {
        let mut app = logged_in_app();
        insert_unreadable_row(&app);

        app.handle_key(KeyCode::Char('f'));
        type_text(&mut app, "G");

        match &app.mode {
            Mode::Searching(state) => assert!(state.query.is_empty()),
            _ => panic!("search bar should stay open"),
        }
        assert!(app.filter.is_empty());
        assert!(matches!(
            app.status.as_ref().map(|s| &s.kind),
            Some(StatusKind::Error)
        ));
        assert_eq!(names(&app), ["Alice", "Bob"]);
    }

    #[test]
    fn short_terminal_shows_the_table_instead_of_the_footer() {
        use ratatui::backend::TestBackend;
        use ratatui::Terminal;

        let app = logged_in_app();
        let mut terminal = Terminal::new(TestBackend::new(40, FOOTER_HEIGHT)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let top_row: String = (0..40)
            .filter_map(|x| buffer.cell((x, 0)).map(|cell| cell.symbol().to_string()))
            .collect();
        assert!(top_row.contains("Students (2)"), "top row was {top_row:?}");
    }
}
