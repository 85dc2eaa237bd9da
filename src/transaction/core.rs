//! Defines the core data model and write paths for transactions.
//!
//! Every write here is one unit of work: the ledger mutation and the
//! balance cache resync commit together, so no reader can observe one
//! without the other.

use rusqlite::{Connection, Row, Transaction as SqlTransaction, TransactionBehavior, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserContext,
    account::{self, AccountId},
    category::{self, CategoryId, CategoryType, category_type_from_sql},
    money::decimal_from_sql,
};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a transaction.
pub type TransactionId = i64;

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// Whether the transaction is income or an expense.
    ///
    /// Always copied from the category at write time, never set
    /// independently.
    pub transaction_type: CategoryType,
    /// The amount of money spent or earned.
    ///
    /// Always positive; the type decides the direction.
    pub amount: Decimal,
    /// The category the transaction is recorded against.
    pub category_id: CategoryId,
    /// The account whose ledger the transaction belongs to.
    pub account_id: AccountId,
}

/// The caller-supplied fields for creating a transaction.
///
/// There is no type field on purpose: the type is copied from the
/// category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The amount of money spent or earned. Must be positive.
    pub amount: Decimal,
    /// When the transaction happened. Defaults to the current date when
    /// `None`.
    pub date: Option<Date>,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// The category to record the transaction against.
    pub category_id: CategoryId,
}

/// The caller-supplied fields for editing a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTransaction {
    /// The new amount. Must be positive.
    pub amount: Decimal,
    /// The new transaction date.
    pub date: Date,
    /// The new description.
    pub description: Option<String>,
    /// The new category. The transaction's type follows it.
    pub category_id: CategoryId,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the ledger and apply it to the cached
/// balance.
///
/// The transaction's type is copied from the category. The insert and the
/// incremental balance update commit together.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `amount` is zero or negative,
/// - [Error::NotFound] if the category does not exist or is not owned by
///   the caller,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new: NewTransaction,
    context: &UserContext,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new.amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(new.amount));
    }

    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let category =
        category::get_category_for_user(new.category_id, context.user_id, &transaction)?;
    let date = new.date.unwrap_or(now.date());

    let created = transaction
        .prepare(
            "INSERT INTO \"transaction\" (date, description, type, amount, category_id, account_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, date, description, type, amount, category_id, account_id",
        )?
        .query_one(
            params![
                date,
                new.description,
                category.category_type.as_str(),
                new.amount.to_string(),
                category.id,
                context.account_id
            ],
            map_transaction_row,
        )?;

    // Creates get the cheap incremental update; edits and deletes must
    // recalculate from the full ledger instead.
    account::apply_to_balance(
        context.account_id,
        created.transaction_type,
        created.amount,
        now,
        &transaction,
    )?;

    transaction.commit()?;

    Ok(created)
}

/// Update a transaction and recalculate the cached balance from the full
/// ledger.
///
/// The type is re-copied from the (possibly new) category. Undoing the old
/// amount incrementally and applying the new one is exactly the kind of
/// bookkeeping that drifts, so edits always recalculate.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `amount` is zero or negative,
/// - [Error::NotFound] if the transaction or category does not exist or is
///   not owned by the caller,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    update: UpdateTransaction,
    context: &UserContext,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if update.amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(update.amount));
    }

    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let category =
        category::get_category_for_user(update.category_id, context.user_id, &transaction)?;

    let updated = transaction
        .prepare(
            "UPDATE \"transaction\"
             SET date = ?1, description = ?2, type = ?3, amount = ?4, category_id = ?5
             WHERE id = ?6 AND account_id = ?7
             RETURNING id, date, description, type, amount, category_id, account_id",
        )?
        .query_one(
            params![
                update.date,
                update.description,
                category.category_type.as_str(),
                update.amount.to_string(),
                category.id,
                id,
                context.account_id
            ],
            map_transaction_row,
        )?;

    account::recalculate_balance(context.account_id, now, &transaction)?;

    transaction.commit()?;

    Ok(updated)
}

/// Delete a transaction and recalculate the cached balance from the full
/// ledger.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist or does not belong
///   to the caller's account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    id: TransactionId,
    context: &UserContext,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let rows_affected = transaction.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND account_id = ?2",
        params![id, context.account_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    account::recalculate_balance(context.account_id, now, &transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Retrieve a transaction belonging to `account_id` by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction on the
///   account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, date, description, type, amount, category_id, account_id
             FROM \"transaction\" WHERE id = ?1 AND account_id = ?2",
        )?
        .query_one(params![id, account_id], map_transaction_row)?;

    Ok(transaction)
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                date TEXT NOT NULL,
                description TEXT,
                type TEXT NOT NULL,
                amount TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Composite index used by the month-windowed report queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_date ON \"transaction\"(account_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_type: String = row.get(3)?;
    let raw_amount: String = row.get(4)?;

    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        transaction_type: category_type_from_sql(raw_type, 3)?,
        amount: decimal_from_sql(raw_amount, 4)?,
        category_id: row.get(5)?,
        account_id: row.get(6)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
