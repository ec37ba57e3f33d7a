use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::Student;

/// Credentials typed on the login screen.
#[derive(Default, Clone)]
pub(crate) struct LoginForm {
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) active: LoginField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum LoginField {
    #[default]
    Username,
    Password,
}

impl LoginForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            LoginField::Username => self.username.push(ch),
            LoginField::Password => self.password.push(ch),
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            LoginField::Username => {
                self.username.pop();
            }
            LoginField::Password => {
                self.password.pop();
            }
        }
    }

    /// Render one field. The password is masked with one `*` per character.
    pub(crate) fn build_line(&self, field_name: &str, field: LoginField) -> Line<'static> {
        let display = match field {
            LoginField::Username => self.username.clone(),
            LoginField::Password => "*".repeat(self.password.chars().count()),
        };
        let style = if self.active == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    pub(crate) fn value_len(&self, field: LoginField) -> usize {
        match field {
            LoginField::Username => self.username.chars().count(),
            LoginField::Password => self.password.chars().count(),
        }
    }
}

/// Form state for adding or editing a student. Values stay as typed text; the
/// persistence layer validates and converts them.
#[derive(Default, Clone)]
pub(crate) struct StudentForm {
    pub(crate) name: String,
    pub(crate) age: String,
    pub(crate) course: String,
    pub(crate) active: StudentField,
    pub(crate) error: Option<String>,
}

/// Enumerates the fields within the student form to drive focus management.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum StudentField {
    #[default]
    Name,
    Age,
    Course,
}

impl StudentForm {
    /// Populate the form from an existing record when entering edit mode.
    pub(crate) fn from_student(student: &Student) -> Self {
        Self {
            name: student.name.clone(),
            age: student.age.to_string(),
            course: student.course.clone(),
            active: StudentField::Name,
            error: None,
        }
    }

    /// Cycle focus forward across the three fields.
    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            StudentField::Name => StudentField::Age,
            StudentField::Age => StudentField::Course,
            StudentField::Course => StudentField::Name,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            StudentField::Name => StudentField::Course,
            StudentField::Age => StudentField::Name,
            StudentField::Course => StudentField::Age,
        };
    }

    /// Append a character to the active field. The age field only takes
    /// digits plus a leading minus sign.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            StudentField::Age => {
                if ch.is_ascii_digit() || (ch == '-' && self.age.is_empty()) {
                    self.age.push(ch);
                    true
                } else {
                    false
                }
            }
            StudentField::Name | StudentField::Course if ch.is_control() => false,
            StudentField::Name => {
                self.name.push(ch);
                true
            }
            StudentField::Course => {
                self.course.push(ch);
                true
            }
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            StudentField::Name => {
                self.name.pop();
            }
            StudentField::Age => {
                self.age.pop();
            }
            StudentField::Course => {
                self.course.pop();
            }
        }
    }

    pub(crate) fn build_line(&self, field_name: &str, field: StudentField) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;

        let display = if value.is_empty() {
            "<required>".to_string()
        } else {
            value.to_string()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    pub(crate) fn value_len(&self, field: StudentField) -> usize {
        self.value(field).chars().count()
    }

    fn value(&self, field: StudentField) -> &str {
        match field {
            StudentField::Name => &self.name,
            StudentField::Age => &self.age,
            StudentField::Course => &self.course,
        }
    }
}

/// Destination prompt shown before writing a CSV export.
#[derive(Clone)]
pub(crate) struct ExportPrompt {
    pub(crate) path: String,
    pub(crate) error: Option<String>,
}

impl ExportPrompt {
    pub(crate) fn with_path<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            false
        } else {
            self.path.push(ch);
            true
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.path.pop();
    }
}
