//! Fintrack is the storage and reporting core of a personal finance tracker.
//!
//! It keeps an account's cached balance consistent with its transaction
//! ledger, and computes the aggregates that a front end renders: budget
//! usage, category summaries, savings goal progress and monthly trend
//! series. The HTTP layer lives elsewhere; this crate exposes plain
//! data-access functions that take a database connection and an explicit
//! caller context.

#![warn(missing_docs)]

use rust_decimal::Decimal;

pub mod account;
pub mod budget;
pub mod category;
pub mod csv_import;
pub mod dashboard;
mod database_id;
pub mod db;
pub mod goal;
mod money;
pub mod month;
pub mod transaction;
pub mod user;

pub use database_id::DatabaseId;

use crate::{account::AccountId, category::CategoryType, csv_import::RowError, user::UserId};

/// Identifies the caller of a write path.
///
/// The presentation layer resolves its session into a [UserContext] once
/// per request and passes it into every mutating function, so ownership
/// checks never rely on ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    /// The user making the request.
    pub user_id: UserId,
    /// The account owned by that user.
    pub account_id: AccountId,
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found, or is not owned by the caller.
    ///
    /// Resources owned by another user report the same error as missing
    /// resources so the response does not leak their existence.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// The category name is already taken.
    ///
    /// Category names are unique across the whole deployment, not just per
    /// user.
    #[error("the category \"{0}\" already exists in the database")]
    DuplicateCategoryName(String),

    /// The email address is already registered.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// A zero or negative amount was used where a positive amount is
    /// required (transaction amounts and goal contributions).
    #[error("amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    /// A transaction's type did not match its category's type.
    #[error("transaction type {transaction} does not match category type {category}")]
    CategoryTypeMismatch {
        /// The type of the referenced category.
        category: CategoryType,
        /// The type supplied for the transaction.
        transaction: CategoryType,
    },

    /// A date string could not be parsed in any accepted format.
    #[error("could not parse \"{0}\" as a date")]
    InvalidDate(String),

    /// The CSV file could not be processed at all, e.g. the header row is
    /// missing required columns or the file contains no transaction rows.
    #[error("could not process the CSV file: {0}")]
    InvalidCsv(String),

    /// One or more CSV rows failed validation. Nothing was imported.
    #[error("the CSV file contained {} invalid rows", .0.len())]
    CsvRowErrors(Vec<RowError>),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {error}");
                Error::SqlError(error)
            }
        }
    }
}
