//! Database query helpers for transaction listings, recent activity and
//! totals.

use rusqlite::{Connection, ToSql};
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    account::AccountId,
    category::{CategoryId, CategoryType, category_type_from_sql},
    money::decimal_from_sql,
    transaction::TransactionId,
};

/// Filters for transaction listings, totals and CSV export.
///
/// All date bounds are inclusive; `None` means unfiltered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Keep transactions dated on or after this date.
    pub start_date: Option<Date>,
    /// Keep transactions dated on or before this date.
    pub end_date: Option<Date>,
    /// Keep transactions recorded against this category.
    pub category_id: Option<CategoryId>,
    /// Keep transactions of this type.
    pub transaction_type: Option<CategoryType>,
}

/// A ledger row joined with its category's display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionData {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// Whether the transaction is income or an expense.
    pub transaction_type: CategoryType,
    /// The amount of money spent or earned.
    pub amount: Decimal,
    /// The ID of the transaction's category.
    pub category_id: CategoryId,
    /// The category's name.
    pub category_name: String,
    /// The category's icon identifier.
    pub category_icon: Option<String>,
    /// The category's colour key.
    pub category_color: Option<String>,
}

/// Income and expense totals over a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionTotals {
    /// The sum of income amounts.
    pub income: Decimal,
    /// The sum of expense amounts.
    pub expenses: Decimal,
}

impl TransactionTotals {
    /// Income minus expenses.
    pub fn net(&self) -> Decimal {
        self.income - self.expenses
    }
}

/// Get the account's transactions matching `filter`, most recent first.
///
/// Sorted by date descending and then ID ascending to keep the order
/// stable after edits; the recent-activity and CSV export views depend on
/// this ordering.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_transactions(
    account_id: AccountId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<TransactionData>, Error> {
    query_transactions(account_id, filter, None, connection)
}

/// Get the `limit` most recent transactions for the account.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_recent_transactions(
    account_id: AccountId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<TransactionData>, Error> {
    query_transactions(
        account_id,
        &TransactionFilter::default(),
        Some(limit),
        connection,
    )
}

/// Sum the income and expense amounts of the transactions matching
/// `filter`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_transaction_totals(
    account_id: AccountId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<TransactionTotals, Error> {
    let (where_clause, params) = build_where_clause(account_id, filter);
    let sql = format!(
        "SELECT \"transaction\".type, \"transaction\".amount FROM \"transaction\" WHERE {where_clause}"
    );

    let params_ref: Vec<&dyn ToSql> = params.iter().map(|param| param.as_ref()).collect();

    let mut statement = connection.prepare(&sql)?;
    let rows = statement.query_map(params_ref.as_slice(), |row| {
        let raw_type: String = row.get(0)?;
        let raw_amount: String = row.get(1)?;

        Ok((
            category_type_from_sql(raw_type, 0)?,
            decimal_from_sql(raw_amount, 1)?,
        ))
    })?;

    let mut totals = TransactionTotals {
        income: Decimal::ZERO,
        expenses: Decimal::ZERO,
    };
    for row in rows {
        let (transaction_type, amount) = row?;
        match transaction_type {
            CategoryType::Income => totals.income += amount,
            CategoryType::Expense => totals.expenses += amount,
        }
    }

    Ok(totals)
}

fn query_transactions(
    account_id: AccountId,
    filter: &TransactionFilter,
    limit: Option<u32>,
    connection: &Connection,
) -> Result<Vec<TransactionData>, Error> {
    let (where_clause, params) = build_where_clause(account_id, filter);

    let mut sql = format!(
        "SELECT \"transaction\".id, \"transaction\".date, \"transaction\".description,
                \"transaction\".type, \"transaction\".amount, category.id, category.name,
                category.icon, category.color
         FROM \"transaction\"
         INNER JOIN category ON \"transaction\".category_id = category.id
         WHERE {where_clause}
         ORDER BY \"transaction\".date DESC, \"transaction\".id ASC"
    );

    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let params_ref: Vec<&dyn ToSql> = params.iter().map(|param| param.as_ref()).collect();

    connection
        .prepare(&sql)?
        .query_map(params_ref.as_slice(), |row| {
            let raw_type: String = row.get(3)?;
            let raw_amount: String = row.get(4)?;

            Ok(TransactionData {
                id: row.get(0)?,
                date: row.get(1)?,
                description: row.get(2)?,
                transaction_type: category_type_from_sql(raw_type, 3)?,
                amount: decimal_from_sql(raw_amount, 4)?,
                category_id: row.get(5)?,
                category_name: row.get(6)?,
                category_icon: row.get(7)?,
                category_color: row.get(8)?,
            })
        })?
        .map(|maybe_row| maybe_row.map_err(Error::SqlError))
        .collect()
}

fn build_where_clause(
    account_id: AccountId,
    filter: &TransactionFilter,
) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses = vec!["\"transaction\".account_id = ?".to_owned()];
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(account_id)];

    if let Some(start_date) = filter.start_date {
        clauses.push("\"transaction\".date >= ?".to_owned());
        params.push(Box::new(start_date));
    }
    if let Some(end_date) = filter.end_date {
        clauses.push("\"transaction\".date <= ?".to_owned());
        params.push(Box::new(end_date));
    }
    if let Some(category_id) = filter.category_id {
        clauses.push("\"transaction\".category_id = ?".to_owned());
        params.push(Box::new(category_id));
    }
    if let Some(transaction_type) = filter.transaction_type {
        clauses.push("\"transaction\".type = ?".to_owned());
        params.push(Box::new(transaction_type.as_str()));
    }

    (clauses.join(" AND "), params)
}
