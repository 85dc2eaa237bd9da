//! Defines the category domain types and database queries.
//!
//! Categories classify transactions as income or expense and carry the
//! display metadata (icon, colour key) that the reporting layer attaches
//! to chart output.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction, TransactionBehavior, params, types::Type,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, UserContext, account, money::decimal_from_sql, user::UserId};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a category.
pub type CategoryId = i64;

/// Whether a category records money earned or money spent.
///
/// A transaction's type is always copied from its category's type at write
/// time; the classification is immutable once the category exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl CategoryType {
    /// The database representation of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transaction category, e.g. 'Groceries', 'Salary'.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The category name, unique across the deployment.
    pub name: CategoryName,
    /// A text description of the category.
    pub description: Option<String>,
    /// Whether transactions in this category are income or expenses.
    pub category_type: CategoryType,
    /// An icon identifier for display.
    pub icon: Option<String>,
    /// A colour key for display, e.g. "primary", "danger".
    pub color: Option<String>,
    /// The user who owns the category.
    pub user_id: UserId,
}

/// The fields needed to create a category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The category name.
    pub name: CategoryName,
    /// A text description of the category.
    pub description: Option<String>,
    /// The immutable income/expense classification.
    pub category_type: CategoryType,
    /// An icon identifier for display.
    pub icon: Option<String>,
    /// A colour key for display.
    pub color: Option<String>,
    /// The user who will own the category.
    pub user_id: UserId,
}

/// The editable fields of a category.
///
/// The type is deliberately absent: reclassifying a category would silently
/// change the meaning of every transaction recorded against it.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCategory {
    /// The new category name.
    pub name: CategoryName,
    /// The new description.
    pub description: Option<String>,
    /// The new icon identifier.
    pub icon: Option<String>,
    /// The new colour key.
    pub color: Option<String>,
}

/// Resolve a stored colour key to the hex code used in chart payloads.
///
/// Unknown or missing keys fall back to black.
pub fn color_hex(color: Option<&str>) -> &'static str {
    match color {
        Some("primary") => "#0d6efd",
        Some("success") => "#198754",
        Some("danger") => "#dc3545",
        Some("warning") => "#ffc107",
        Some("info") => "#0dcaf0",
        Some("secondary") => "#6c757d",
        _ => "#000000",
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                type TEXT NOT NULL,
                icon TEXT,
                color TEXT,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create a new category in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCategoryName] if a category with the same name exists
///   anywhere in the database,
/// - [Error::NotFound] if `user_id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(new: NewCategory, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare(
            "INSERT INTO category (name, description, type, icon, color, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, name, description, type, icon, color, user_id",
        )?
        .query_one(
            params![
                new.name.as_ref(),
                new.description,
                new.category_type.as_str(),
                new.icon,
                new.color,
                new.user_id
            ],
            map_category_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(new.name.to_string()),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })
}

/// Retrieve a category from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "SELECT id, name, description, type, icon, color, user_id FROM category WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_category_row)?;

    Ok(category)
}

/// Retrieve a category owned by `user_id`.
///
/// Categories owned by other users report [Error::NotFound], the same as
/// missing categories, so the response does not leak their existence.
pub fn get_category_for_user(
    id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "SELECT id, name, description, type, icon, color, user_id
             FROM category WHERE id = ?1 AND user_id = ?2",
        )?
        .query_one(params![id, user_id], map_category_row)?;

    Ok(category)
}

/// Retrieve the categories owned by `user_id`, optionally restricted to one
/// type, ordered by name.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn list_categories(
    user_id: UserId,
    category_type: Option<CategoryType>,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    match category_type {
        Some(category_type) => connection
            .prepare(
                "SELECT id, name, description, type, icon, color, user_id
                 FROM category WHERE user_id = ?1 AND type = ?2 ORDER BY name",
            )?
            .query_map(params![user_id, category_type.as_str()], map_category_row)?
            .map(|maybe_category| maybe_category.map_err(Error::SqlError))
            .collect(),
        None => connection
            .prepare(
                "SELECT id, name, description, type, icon, color, user_id
                 FROM category WHERE user_id = ?1 ORDER BY name",
            )?
            .query_map(params![user_id], map_category_row)?
            .map(|maybe_category| maybe_category.map_err(Error::SqlError))
            .collect(),
    }
}

/// Update a category's name and display fields.
///
/// The income/expense type cannot be changed.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the category does not exist or is not owned by
///   `user_id`,
/// - [Error::DuplicateCategoryName] if the new name is already taken,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_category(
    id: CategoryId,
    user_id: UserId,
    update: UpdateCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "UPDATE category
             SET name = ?1, description = ?2, icon = ?3, color = ?4
             WHERE id = ?5 AND user_id = ?6
             RETURNING id, name, description, type, icon, color, user_id",
        )?
        .query_one(
            params![
                update.name.as_ref(),
                update.description,
                update.icon,
                update.color,
                id,
                user_id
            ],
            map_category_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(update.name.to_string()),
            error => error.into(),
        })
}

/// Delete a category, its transactions, and resync the account balance.
///
/// The cascade removes every transaction recorded against the category, so
/// the cached balance is recalculated from the remaining ledger inside the
/// same unit of work.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the category does not exist or is not owned by
///   the caller,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_category(
    id: CategoryId,
    context: &UserContext,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let rows_affected = transaction.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        params![id, context.user_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    account::recalculate_balance(context.account_id, now, &transaction)?;

    transaction.commit()?;

    Ok(())
}

// ============================================================================
// SUMMARIES
// ============================================================================

/// Per-category roll-up of all-time activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    /// The ID of the category.
    pub id: CategoryId,
    /// The category name.
    pub name: String,
    /// The category description.
    pub description: Option<String>,
    /// The income/expense classification.
    pub category_type: CategoryType,
    /// The category's icon identifier.
    pub icon: Option<String>,
    /// The category's colour key.
    pub color: Option<String>,
    /// How many transactions have ever been recorded against the category.
    pub total_transactions: u32,
    /// The all-time sum of those transactions' amounts.
    pub total_amount: Decimal,
}

/// Summarize the categories of one type for a user: all-time transaction
/// count and total amount per category.
///
/// Categories with no transactions are included with zero totals.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_categories_data(
    user_id: UserId,
    category_type: CategoryType,
    connection: &Connection,
) -> Result<Vec<CategorySummary>, Error> {
    let mut statement = connection.prepare(
        "SELECT category.id, category.name, category.description, category.type,
                category.icon, category.color, \"transaction\".amount
         FROM category
         LEFT JOIN \"transaction\" ON \"transaction\".category_id = category.id
         WHERE category.user_id = ?1 AND category.type = ?2
         ORDER BY category.name, category.id",
    )?;

    let rows = statement.query_map(params![user_id, category_type.as_str()], |row| {
        let raw_type: String = row.get(3)?;
        let amount = row
            .get::<usize, Option<String>>(6)?
            .map(|text| decimal_from_sql(text, 6))
            .transpose()?;

        Ok((
            CategorySummary {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                category_type: category_type_from_sql(raw_type, 3)?,
                icon: row.get(4)?,
                color: row.get(5)?,
                total_transactions: 0,
                total_amount: Decimal::ZERO,
            },
            amount,
        ))
    })?;

    // The rows arrive grouped by category; fold each group into one summary,
    // summing in Rust to keep the totals in exact decimals.
    let mut summaries: Vec<CategorySummary> = Vec::new();
    for row in rows {
        let (summary, amount) = row?;

        if summaries.last().map(|last| last.id) != Some(summary.id) {
            summaries.push(summary);
        }

        if let (Some(last), Some(amount)) = (summaries.last_mut(), amount) {
            last.total_transactions += 1;
            last.total_amount += amount;
        }
    }

    Ok(summaries)
}

pub(crate) fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(1)?;
    let raw_type: String = row.get(3)?;

    Ok(Category {
        id: row.get(0)?,
        name: CategoryName::new_unchecked(&raw_name),
        description: row.get(2)?,
        category_type: category_type_from_sql(raw_type, 3)?,
        icon: row.get(4)?,
        color: row.get(5)?,
        user_id: row.get(6)?,
    })
}

pub(crate) fn category_type_from_sql(
    text: String,
    column: usize,
) -> Result<CategoryType, rusqlite::Error> {
    match text.as_str() {
        "income" => Ok(CategoryType::Income),
        "expense" => Ok(CategoryType::Expense),
        _ => Err(rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Text,
            format!("unknown category type {text}").into(),
        )),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        Error, UserContext,
        account::get_account,
        category::{
            CategoryName, CategoryType, NewCategory, UpdateCategory, get_category_for_user,
            list_categories, update_category,
        },
        db::initialize,
        user::register_user,
    };

    use super::{create_category, delete_category};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_test_user(conn: &Connection, email: &str) -> UserContext {
        let (user, account) = register_user(email, OffsetDateTime::now_utc(), conn).unwrap();

        UserContext {
            user_id: user.id,
            account_id: account.id,
        }
    }

    fn new_category(name: &str, category_type: CategoryType, user_id: i64) -> NewCategory {
        NewCategory {
            name: CategoryName::new_unchecked(name),
            description: None,
            category_type,
            icon: None,
            color: Some("primary".to_owned()),
            user_id,
        }
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let context = create_test_user(&conn, "foo@bar.baz");

        let category =
            create_category(new_category("Food", CategoryType::Expense, context.user_id), &conn)
                .unwrap();

        assert!(category.id > 0);
        assert_eq!(category.name, CategoryName::new_unchecked("Food"));
        assert_eq!(category.category_type, CategoryType::Expense);
    }

    #[test]
    fn create_fails_on_duplicate_name_even_across_users() {
        let conn = get_test_connection();
        let first = create_test_user(&conn, "foo@bar.baz");
        let second = create_test_user(&conn, "bar@baz.qux");
        create_category(new_category("Food", CategoryType::Expense, first.user_id), &conn)
            .unwrap();

        let got =
            create_category(new_category("Food", CategoryType::Expense, second.user_id), &conn);

        assert_eq!(got, Err(Error::DuplicateCategoryName("Food".to_owned())));
    }

    #[test]
    fn create_fails_on_invalid_user_id() {
        let conn = get_test_connection();

        let got = create_category(new_category("Food", CategoryType::Expense, 42), &conn);

        assert_eq!(got, Err(Error::NotFound));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert_eq!(CategoryName::new("   "), Err(Error::EmptyCategoryName));
    }

    #[test]
    fn get_for_user_hides_other_users_categories() {
        let conn = get_test_connection();
        let owner = create_test_user(&conn, "foo@bar.baz");
        let other = create_test_user(&conn, "bar@baz.qux");
        let category =
            create_category(new_category("Food", CategoryType::Expense, owner.user_id), &conn)
                .unwrap();

        let got = get_category_for_user(category.id, other.user_id, &conn);

        assert_eq!(got, Err(Error::NotFound));
    }

    #[test]
    fn list_filters_by_type() {
        let conn = get_test_connection();
        let context = create_test_user(&conn, "foo@bar.baz");
        create_category(new_category("Food", CategoryType::Expense, context.user_id), &conn)
            .unwrap();
        create_category(new_category("Salary", CategoryType::Income, context.user_id), &conn)
            .unwrap();

        let got = list_categories(context.user_id, Some(CategoryType::Income), &conn).unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].name, CategoryName::new_unchecked("Salary"));
    }

    #[test]
    fn update_changes_name_but_never_type() {
        let conn = get_test_connection();
        let context = create_test_user(&conn, "foo@bar.baz");
        let category =
            create_category(new_category("Food", CategoryType::Expense, context.user_id), &conn)
                .unwrap();

        let got = update_category(
            category.id,
            context.user_id,
            UpdateCategory {
                name: CategoryName::new_unchecked("Groceries"),
                description: Some("Weekly shop".to_owned()),
                icon: None,
                color: None,
            },
            &conn,
        )
        .unwrap();

        assert_eq!(got.name, CategoryName::new_unchecked("Groceries"));
        assert_eq!(got.category_type, CategoryType::Expense);
    }

    #[test]
    fn delete_cascades_transactions_and_resyncs_balance() {
        let conn = get_test_connection();
        let context = create_test_user(&conn, "foo@bar.baz");
        let income =
            create_category(new_category("Salary", CategoryType::Income, context.user_id), &conn)
                .unwrap();
        let expense =
            create_category(new_category("Food", CategoryType::Expense, context.user_id), &conn)
                .unwrap();
        conn.execute(
            "INSERT INTO \"transaction\" (date, type, amount, category_id, account_id)
             VALUES ('2025-03-01', 'income', '500.00', ?1, ?3),
                    ('2025-03-02', 'expense', '120.00', ?2, ?3)",
            rusqlite::params![income.id, expense.id, context.account_id],
        )
        .unwrap();
        crate::account::recalculate_balance(context.account_id, OffsetDateTime::now_utc(), &conn)
            .unwrap();

        delete_category(expense.id, &context, OffsetDateTime::now_utc(), &conn).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"transaction\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 1);
        assert_eq!(
            get_account(context.account_id, &conn).unwrap().balance,
            rust_decimal_macros::dec!(500.00)
        );
    }

    #[test]
    fn delete_fails_for_non_owner() {
        let conn = get_test_connection();
        let owner = create_test_user(&conn, "foo@bar.baz");
        let other = create_test_user(&conn, "bar@baz.qux");
        let category =
            create_category(new_category("Food", CategoryType::Expense, owner.user_id), &conn)
                .unwrap();

        let got = delete_category(category.id, &other, OffsetDateTime::now_utc(), &conn);

        assert_eq!(got, Err(Error::NotFound));
    }
}
