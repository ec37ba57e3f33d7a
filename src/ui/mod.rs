//! Terminal presentation layer. It owns widget state only; every read and
//! write goes through the `db` and `export` services.

mod app;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use terminal::run_app;
