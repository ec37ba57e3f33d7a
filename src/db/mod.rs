//! Persistence module split across logical submodules.

mod connection;
mod students;
mod users;

pub use connection::Database;
pub use students::{
    create_student, delete_student, list_students, search_students, update_student,
};
pub use users::{authenticate, create_user};
