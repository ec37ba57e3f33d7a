//! Binary entry point: resolve configuration, start file logging, open the
//! SQLite store, then either run the admin command or hand control to the
//! terminal UI.
use anyhow::Context;
use clap::Parser;
use student_manager::config::{Cli, Command, Config};
use student_manager::{create_user, logging, run_app, App, Database};
use tracing::info;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;
    let _log_guard = logging::init(&config.log_dir)?;

    let db = Database::open(&config.database_path).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path.display()
        )
    })?;

    match cli.command {
        Some(Command::AddUser { username, password }) => {
            create_user(&db, &username, &password)?;
            println!("Added user {username}.");
            Ok(())
        }
        None => {
            info!("starting terminal ui");
            let mut app = App::new(db);
            run_app(&mut app)
        }
    }
}
