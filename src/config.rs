//! Command-line and environment configuration. The SQLite location is the
//! only connection descriptor the application needs, and it is never baked
//! into the code: flags win over environment variables (including a `.env`
//! file loaded by `main`), which win over the per-user default.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".student-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "students.sqlite";

#[derive(Debug, Parser)]
#[command(name = "student-manager", version, about = "Manage student records from the terminal")]
pub struct Cli {
    /// SQLite database holding the `users` and `students` tables.
    #[arg(long, env = "STUDENT_MANAGER_DB", value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Directory that receives `student-manager.log`.
    #[arg(long, env = "STUDENT_MANAGER_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision a login account and exit.
    AddUser { username: String, password: String },
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    /// Fill in whatever the command line left out with per-user defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let (database_path, log_dir) = match (&cli.database, &cli.log_dir) {
            (Some(db), Some(logs)) => (db.clone(), logs.clone()),
            (db, logs) => {
                let data_dir = data_dir()?;
                (
                    db.clone().unwrap_or_else(|| data_dir.join(DB_FILE_NAME)),
                    logs.clone().unwrap_or(data_dir),
                )
            }
        };

        Ok(Self {
            database_path,
            log_dir,
        })
    }
}

/// Resolve the application data directory inside the user's home.
fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}
