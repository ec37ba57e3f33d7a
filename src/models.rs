//! Domain models that mirror the SQLite schema. These stay plain data holders;
//! persistence lives in `db` and presentation in `ui`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One row of the `students` table.
pub struct Student {
    /// Primary key assigned by SQLite on insert. Edit and delete flows carry it
    /// back to the persistence layer.
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub course: String,
}

impl Student {
    /// The record as display strings, in `ID, Name, Age, Course` column order.
    /// Both the table widget and the CSV export consume this shape.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.age.to_string(),
            self.course.clone(),
        ]
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

/// The record a user picked in the UI. Update and delete calls take the id
/// from here, never from a table row position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub id: i64,
    pub name: String,
}

impl From<&Student> for Selection {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            name: student.name.clone(),
        }
    }
}
