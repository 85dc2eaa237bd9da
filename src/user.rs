//! User records, the ownership anchor for accounts, categories, budgets
//! and goals.
//!
//! Passwords and sessions are the front end's concern and are not stored
//! here.

use rusqlite::{Connection, Row, Transaction as SqlTransaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{
    Error,
    account::{self, Account},
};

/// Database identifier for a user.
pub type UserId = i64;

/// A registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The ID of the user.
    pub id: UserId,
    /// The user's email address, unique across the deployment.
    pub email: String,
    /// When the user registered.
    pub created_at: OffsetDateTime,
}

/// Create the user table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Register a new user and create their account in one unit of work.
///
/// Every user owns exactly one account, created here with a zero balance.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEmail] if a user with `email` already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn register_user(
    email: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(User, Account), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let user = transaction
        .prepare("INSERT INTO user (email, created_at) VALUES (?1, ?2) RETURNING id, email, created_at")?
        .query_one((email, now), map_user_row)?;

    let account = account::create_account(user.id, now, &transaction)?;

    transaction.commit()?;

    Ok((user, account))
}

/// Retrieve a user from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_user(id: UserId, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare("SELECT id, email, created_at FROM user WHERE id = :id")?
        .query_one(&[(":id", &id)], map_user_row)?;

    Ok(user)
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: row.get(2)?,
    })
}
