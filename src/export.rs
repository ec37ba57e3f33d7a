//! CSV export of whatever rows the caller is currently displaying. The module
//! never touches the database; the UI hands over the rendered listing.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::Student;

/// Column labels of the student table, in display order.
pub const STUDENT_HEADERS: [&str; 4] = ["ID", "Name", "Age", "Course"];

/// Turn a listing into export rows using the same column order as the headers.
pub fn student_rows(students: &[Student]) -> Vec<Vec<String>> {
    students.iter().map(Student::to_row).collect()
}

/// Write `headers` followed by `rows` to `path` as RFC 4180 CSV.
///
/// The content goes to a temporary file next to the destination first and is
/// renamed into place only once fully written, so a failed export never leaves
/// a truncated file behind.
pub fn export_csv(path: &Path, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut contents = String::new();
    push_record(&mut contents, headers);
    for row in rows {
        push_record(&mut contents, row.as_slice());
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| Error::io(path, err))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|err| Error::io(path, err))?;
    tmp.persist(path).map_err(|err| Error::io(path, err.error))?;

    info!(path = %path.display(), rows = rows.len(), "exported csv");
    Ok(())
}

fn push_record<F: AsRef<str>>(out: &mut String, fields: &[F]) {
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&csv_quote(field.as_ref()));
    }
    out.push_str("\r\n");
}

fn csv_quote(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
