//! User account database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{NewUser, User};

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
    })
}

impl Database {
    /// Insert a new user. The password must already be a stored record.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
            params![user.id, user.username, user.password],
        )?;
        Ok(())
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, password FROM users WHERE id = ?",
                [id],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a user by login name.
    pub fn get_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, password FROM users WHERE username = ?",
                [username],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Make sure the given account exists, creating it with a hashed
    /// password if missing. An existing account is left untouched.
    ///
    /// Returns `true` when the account was created.
    pub fn ensure_admin_user(&self, username: &str, password: &str) -> DbResult<bool> {
        if self.get_user_by_username(username)?.is_some() {
            tracing::debug!(username, "admin account already present");
            return Ok(false);
        }

        let user = User::from_new(NewUser {
            username: username.to_string(),
            password: password.to_string(),
        });
        self.insert_user(&user)?;
        tracing::info!(username, "created admin account");
        Ok(true)
    }
}
