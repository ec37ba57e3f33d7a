use rusqlite::params;
use tracing::{info, warn};

use super::Database;
use crate::error::{Error, Result};

/// Check a username/password pair against the `users` table. The comparison
/// is literal and case-sensitive; passwords are stored in clear text.
///
/// Storage failures are returned as errors rather than reported as a failed
/// login, so the caller can tell "wrong password" from "database is down".
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<bool> {
    let matches = db.query(
        "SELECT 1 FROM users WHERE username = ?1 AND password = ?2 LIMIT 1",
        params![username, password],
        |row| row.get::<_, i64>(0),
    )?;

    let ok = !matches.is_empty();
    if ok {
        info!(username, "login succeeded");
    } else {
        warn!(username, "login rejected");
    }
    Ok(ok)
}

/// Provision a login account. Only the `add-user` admin command calls this;
/// the interactive application treats users as read-only.
pub fn create_user(db: &Database, username: &str, password: &str) -> Result<()> {
    if username.is_empty() {
        return Err(Error::validation("Username is required."));
    }
    if password.is_empty() {
        return Err(Error::validation("Password is required."));
    }

    db.execute(
        "INSERT INTO users (username, password) VALUES (?1, ?2)",
        params![username, password],
    )?;
    info!(username, "user provisioned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_admin() -> Database {
        let db = Database::open_in_memory().unwrap();
        create_user(&db, "admin", "s3cret").unwrap();
        db
    }

    #[test]
    fn exact_credentials_authenticate() {
        let db = db_with_admin();
        assert!(authenticate(&db, "admin", "s3cret").unwrap());
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let db = db_with_admin();
        assert!(!authenticate(&db, "Admin", "s3cret").unwrap());
        assert!(!authenticate(&db, "admin", "S3CRET").unwrap());
    }

    #[test]
    fn wrong_or_partial_credentials_are_rejected() {
        let db = db_with_admin();
        assert!(!authenticate(&db, "admin", "").unwrap());
        assert!(!authenticate(&db, "", "s3cret").unwrap());
        assert!(!authenticate(&db, "admin", "s3cret ").unwrap());
        assert!(!authenticate(&db, "nobody", "s3cret").unwrap());
    }

    #[test]
    fn empty_users_table_rejects_everyone() {
        let db = Database::open_in_memory().unwrap();
        assert!(!authenticate(&db, "admin", "s3cret").unwrap());
    }

    #[test]
    fn duplicate_usernames_still_match_either_password() {
        let db = db_with_admin();
        create_user(&db, "admin", "other").unwrap();
        assert!(authenticate(&db, "admin", "s3cret").unwrap());
        assert!(authenticate(&db, "admin", "other").unwrap());
    }

    #[test]
    fn create_user_requires_both_fields() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            create_user(&db, "", "pw"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            create_user(&db, "admin", ""),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn storage_failure_is_not_a_failed_login() {
        let db = Database::open_in_memory().unwrap();
        db.execute("DROP TABLE users", []).unwrap();
        assert!(matches!(
            authenticate(&db, "admin", "s3cret"),
            Err(Error::Storage(_))
        ));
    }
}
