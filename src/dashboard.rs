//! Read-side aggregation for the dashboard: monthly totals, the trend
//! series and the expense breakdown behind the pie chart.
//!
//! Nothing here mutates. Every function takes an explicit date or window,
//! so results are reproducible and testable.

use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    account::{AccountId, get_account},
    category::color_hex,
    money::decimal_from_sql,
    month::{current_month_range, last_n_months},
    transaction::{TransactionFilter, get_transaction_totals},
};

/// The number of trailing months shown in the dashboard's trend chart.
pub const TREND_MONTHS: u32 = 6;

/// Total income and expenses for an account within an inclusive date
/// range.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_monthly_income_and_expenses(
    account_id: AccountId,
    start_date: Date,
    end_date: Date,
    connection: &Connection,
) -> Result<(Decimal, Decimal), Error> {
    let totals = get_transaction_totals(
        account_id,
        &TransactionFilter {
            start_date: Some(start_date),
            end_date: Some(end_date),
            ..Default::default()
        },
        connection,
    )?;

    Ok((totals.income, totals.expenses))
}

/// The headline numbers on the dashboard: the cached balance plus the
/// current month's totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// The account's cached balance.
    pub total_balance: Decimal,
    /// Income recorded this month.
    pub month_income: Decimal,
    /// Expenses recorded this month.
    pub month_expenses: Decimal,
}

/// Build the dashboard's headline numbers for the month containing
/// `today`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `account_id` does not refer to a valid account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_dashboard_summary(
    account_id: AccountId,
    today: Date,
    connection: &Connection,
) -> Result<DashboardSummary, Error> {
    let account = get_account(account_id, connection)?;
    let (month_start, month_end) = current_month_range(today);
    let (month_income, month_expenses) =
        get_monthly_income_and_expenses(account_id, month_start, month_end, connection)?;

    Ok(DashboardSummary {
        total_balance: account.balance,
        month_income,
        month_expenses,
    })
}

/// One income and one expense data point per trailing month, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingTrend {
    /// Full month names, oldest first, e.g. "January".
    pub labels: Vec<String>,
    /// Income per month.
    pub income: Vec<Decimal>,
    /// Expenses per month.
    pub expenses: Vec<Decimal>,
}

/// Compute the income and expense series for the `n` trailing months,
/// current month included.
///
/// Months with no transactions report zero rather than being skipped, so
/// the series always has `n` points.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_spending_trend(
    account_id: AccountId,
    n: u32,
    today: Date,
    connection: &Connection,
) -> Result<SpendingTrend, Error> {
    let months = last_n_months(n, today);

    let mut trend = SpendingTrend {
        labels: Vec::with_capacity(months.len()),
        income: Vec::with_capacity(months.len()),
        expenses: Vec::with_capacity(months.len()),
    };

    for window in months {
        let (income, expenses) =
            get_monthly_income_and_expenses(account_id, window.start, window.end, connection)?;

        trend.labels.push(window.label);
        trend.income.push(income);
        trend.expenses.push(expenses);
    }

    Ok(trend)
}

/// One slice of the expense pie: a category's spend with its display
/// colour resolved to a hex code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    /// The category's name.
    pub name: String,
    /// The category's display colour as a hex code.
    pub color: String,
    /// The category's summed expenses over the range.
    pub total: Decimal,
}

/// Sum expense amounts by category over an inclusive date range, largest
/// first.
///
/// Income transactions are excluded; categories with no expenses in the
/// range do not appear.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_expenses_by_category(
    account_id: AccountId,
    start_date: Date,
    end_date: Date,
    connection: &Connection,
) -> Result<Vec<CategoryBreakdown>, Error> {
    let mut statement = connection.prepare(
        "SELECT category.name, category.color, \"transaction\".amount
         FROM \"transaction\"
         INNER JOIN category ON \"transaction\".category_id = category.id
         WHERE \"transaction\".account_id = ?1 AND \"transaction\".type = 'expense'
               AND \"transaction\".date BETWEEN ?2 AND ?3
         ORDER BY category.name",
    )?;

    let rows = statement.query_map(params![account_id, start_date, end_date], |row| {
        let name: String = row.get(0)?;
        let color: Option<String> = row.get(1)?;
        let raw_amount: String = row.get(2)?;

        Ok((name, color, decimal_from_sql(raw_amount, 2)?))
    })?;

    // The rows arrive grouped by category name; fold each group into one
    // slice, summing in exact decimals.
    let mut breakdown: Vec<CategoryBreakdown> = Vec::new();
    for row in rows {
        let (name, color, amount) = row?;

        if breakdown.last().map(|slice| slice.name.as_str()) != Some(name.as_str()) {
            breakdown.push(CategoryBreakdown {
                name,
                color: color_hex(color.as_deref()).to_owned(),
                total: Decimal::ZERO,
            });
        }

        if let Some(slice) = breakdown.last_mut() {
            slice.total += amount;
        }
    }

    breakdown.sort_by(|a, b| b.total.cmp(&a.total));

    Ok(breakdown)
}
