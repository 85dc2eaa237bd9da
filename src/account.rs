//! Accounts and the cached balance kept in sync with the transaction
//! ledger.
//!
//! The balance is denormalized: it must always equal the sum of income
//! amounts minus the sum of expense amounts in the ledger. Creates apply
//! an incremental update for cheapness; edits, deletes and bulk imports
//! must use [recalculate_balance] because un-applying the previous
//! type/amount incrementally is an easy place to introduce drift.

use rusqlite::{Connection, Row, params};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{Error, category::CategoryType, money::decimal_from_sql, user::UserId};

/// Database identifier for an account.
pub type AccountId = i64;

/// A user's account and its cached running balance.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The user who owns the account. One account per user.
    pub user_id: UserId,
    /// The cached running balance.
    pub balance: Decimal,
    /// When the account was created.
    pub created_at: OffsetDateTime,
    /// When the balance was last written.
    pub updated_at: OffsetDateTime,
}

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL UNIQUE,
                balance TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create an account with a zero balance.
///
/// Called from [crate::user::register_user]; accounts are never created on
/// their own.
pub(crate) fn create_account(
    user_id: UserId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "INSERT INTO account (user_id, balance, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, user_id, balance, created_at, updated_at",
        )?
        .query_one(
            params![user_id, Decimal::ZERO.to_string(), now, now],
            map_account_row,
        )?;

    Ok(account)
}

/// Retrieve an account from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "SELECT id, user_id, balance, created_at, updated_at FROM account WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_account_row)?;

    Ok(account)
}

/// Retrieve the account owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the user has no account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_account_for_user(user_id: UserId, connection: &Connection) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "SELECT id, user_id, balance, created_at, updated_at FROM account WHERE user_id = :user_id",
        )?
        .query_one(&[(":user_id", &user_id)], map_account_row)?;

    Ok(account)
}

/// Sum the ledger amounts of `transaction_type` for an account.
///
/// The amounts are summed in Rust over exact decimals rather than with SQL
/// `SUM`, which would coerce the TEXT column to floating point.
pub fn get_total_by_type(
    account_id: AccountId,
    transaction_type: CategoryType,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let mut statement = connection
        .prepare("SELECT amount FROM \"transaction\" WHERE account_id = ?1 AND type = ?2")?;
    let amounts = statement.query_map(params![account_id, transaction_type.as_str()], |row| {
        let text: String = row.get(0)?;
        decimal_from_sql(text, 0)
    })?;

    let mut total = Decimal::ZERO;
    for amount in amounts {
        total += amount?;
    }

    Ok(total)
}

/// Recompute the cached balance from the entire ledger and store it.
///
/// Required after transaction edits, deletes, category deletion and bulk
/// import. On failure the stored balance keeps its last committed value
/// and the caller must treat it as possibly stale until the next
/// successful recalculation.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `account_id` does not refer to a valid account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn recalculate_balance(
    account_id: AccountId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let income = get_total_by_type(account_id, CategoryType::Income, connection)?;
    let expenses = get_total_by_type(account_id, CategoryType::Expense, connection)?;
    let balance = income - expenses;

    let rows_affected = connection.execute(
        "UPDATE account SET balance = ?1, updated_at = ?2 WHERE id = ?3",
        params![balance.to_string(), now, account_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(balance)
}

/// Apply a single newly created transaction to the cached balance.
///
/// Only valid for creates. Edits and deletes must use
/// [recalculate_balance].
pub(crate) fn apply_to_balance(
    account_id: AccountId,
    transaction_type: CategoryType,
    amount: Decimal,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let account = get_account(account_id, connection)?;

    let balance = match transaction_type {
        CategoryType::Income => account.balance + amount,
        CategoryType::Expense => account.balance - amount,
    };

    connection.execute(
        "UPDATE account SET balance = ?1, updated_at = ?2 WHERE id = ?3",
        params![balance.to_string(), now, account_id],
    )?;

    Ok(balance)
}

pub(crate) fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let balance_text: String = row.get(2)?;

    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        balance: decimal_from_sql(balance_text, 2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}
