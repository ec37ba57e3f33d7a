use std::num::IntErrorKind;

use rusqlite::{params, Row};
use tracing::{debug, info};

use super::Database;
use crate::error::{Error, Result};
use crate::models::Student;

const SELECT_STUDENTS: &str = "SELECT id, name, age, course FROM students";

/// Validated form values ready for an insert or update.
struct StudentFields {
    name: String,
    age: i64,
    course: String,
}

/// Retrieve every student in storage order. There is deliberately no
/// `ORDER BY`: callers see rows the way SQLite hands them back.
pub fn list_students(db: &Database) -> Result<Vec<Student>> {
    let students = db.query(SELECT_STUDENTS, [], student_from_row)?;
    debug!(count = students.len(), "listed students");
    Ok(students)
}

/// Insert a new student and echo it back with the id SQLite assigned. The age
/// arrives as raw form text and is re-validated here since this is the
/// boundary every caller goes through.
pub fn create_student(db: &Database, name: &str, age: &str, course: &str) -> Result<Student> {
    let fields = validate_student(name, age, course)?;

    db.execute(
        "INSERT INTO students (name, age, course) VALUES (?1, ?2, ?3)",
        params![fields.name, fields.age, fields.course],
    )?;

    let student = Student {
        id: db.last_insert_id(),
        name: fields.name,
        age: fields.age,
        course: fields.course,
    };
    info!(id = student.id, "student added");
    Ok(student)
}

/// Overwrite name, age and course of an existing student. Zero touched rows
/// means the id is gone.
pub fn update_student(db: &Database, id: i64, name: &str, age: &str, course: &str) -> Result<()> {
    let fields = validate_student(name, age, course)?;

    let updated = db.execute(
        "UPDATE students SET name = ?1, age = ?2, course = ?3 WHERE id = ?4",
        params![fields.name, fields.age, fields.course, id],
    )?;

    if updated == 0 {
        Err(Error::NotFound { id })
    } else {
        info!(id, "student updated");
        Ok(())
    }
}

/// Remove a student row.
pub fn delete_student(db: &Database, id: i64) -> Result<()> {
    let deleted = db.execute("DELETE FROM students WHERE id = ?1", params![id])?;

    if deleted == 0 {
        Err(Error::NotFound { id })
    } else {
        info!(id, "student deleted");
        Ok(())
    }
}

/// Students whose name contains `needle`. SQLite's `LIKE` folds ASCII case, and
/// wildcard characters in the needle are escaped so they match literally. An
/// empty needle returns the full listing.
pub fn search_students(db: &Database, needle: &str) -> Result<Vec<Student>> {
    if needle.is_empty() {
        return list_students(db);
    }

    let pattern = format!("%{}%", escape_like(needle));
    let students = db.query(
        &format!("{SELECT_STUDENTS} WHERE name LIKE ?1 ESCAPE '\\'"),
        params![pattern],
        student_from_row,
    )?;
    debug!(needle, count = students.len(), "searched students");
    Ok(students)
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        course: row.get(3)?,
    })
}

/// Emptiness is judged on trimmed text, but name and course are stored exactly
/// as typed. Age accepts any base-10 `i64`, sign included.
fn validate_student(name: &str, age: &str, course: &str) -> Result<StudentFields> {
    if name.trim().is_empty() {
        return Err(Error::validation("Name is required."));
    }

    let age = age.trim();
    if age.is_empty() {
        return Err(Error::validation("Age is required."));
    }
    let age = age.parse::<i64>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            Error::validation("Age is too large.")
        }
        _ => Error::validation("Age must be a whole number."),
    })?;

    if course.trim().is_empty() {
        return Err(Error::validation("Course is required."));
    }

    Ok(StudentFields {
        name: name.to_string(),
        age,
        course: course.to_string(),
    })
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
