//! Core library surface for the Student Manager application.
//!
//! The services (`db`, `export`) form a plain data-in/data-out layer; the
//! terminal UI in `ui` is one client of it and the `add-user` command another.
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod ui;

/// Persistence entry points used by the binary and by tests.
pub use db::{
    authenticate, create_student, create_user, delete_student, list_students, search_students,
    update_student, Database,
};

pub use error::{Error, Result};
pub use export::{export_csv, student_rows, STUDENT_HEADERS};
pub use models::{Selection, Student};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
