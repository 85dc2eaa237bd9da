//! Budgets: monthly spending ceilings per category, and the usage and
//! alert reporting built on them.
//!
//! Budgets never touch the ledger; everything here other than the CRUD
//! functions is read-side.

use rusqlite::{Connection, Row, params, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::{self, CategoryId},
    money::{decimal_from_sql, percentage_of},
    month::current_month_range,
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a budget.
pub type BudgetId = i64;

/// How often a budget resets.
///
/// Only monthly budgets are currently computed against; the other periods
/// are stored so the data model does not have to change when the reporting
/// layer grows into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// Resets every week.
    Weekly,
    /// Resets every calendar month.
    Monthly,
    /// Resets every quarter.
    Quarterly,
    /// Resets every year.
    Yearly,
}

impl BudgetPeriod {
    /// The database representation of the period.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

/// A spending ceiling for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The category the ceiling applies to.
    pub category_id: CategoryId,
    /// The ceiling amount per period.
    pub amount: Decimal,
    /// How often the budget resets.
    pub period: BudgetPeriod,
    /// A text description of the budget.
    pub description: Option<String>,
    /// The user who owns the budget.
    pub user_id: UserId,
}

/// The fields needed to create a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    /// The category the ceiling applies to. Must belong to the same user.
    pub category_id: CategoryId,
    /// The ceiling amount per period.
    pub amount: Decimal,
    /// How often the budget resets.
    pub period: BudgetPeriod,
    /// A text description of the budget.
    pub description: Option<String>,
    /// The user who will own the budget.
    pub user_id: UserId,
}

/// The editable fields of a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBudget {
    /// The new category.
    pub category_id: CategoryId,
    /// The new ceiling amount.
    pub amount: Decimal,
    /// The new description.
    pub description: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY,
                category_id INTEGER NOT NULL,
                amount TEXT NOT NULL,
                period TEXT NOT NULL,
                description TEXT,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create a new budget in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the category does not exist or is not owned by
///   the user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(new: NewBudget, connection: &Connection) -> Result<Budget, Error> {
    category::get_category_for_user(new.category_id, new.user_id, connection)?;

    let budget = connection
        .prepare(
            "INSERT INTO budget (category_id, amount, period, description, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, category_id, amount, period, description, user_id",
        )?
        .query_one(
            params![
                new.category_id,
                new.amount.to_string(),
                new.period.as_str(),
                new.description,
                new.user_id
            ],
            map_budget_row,
        )?;

    Ok(budget)
}

/// Update a budget's category, amount and description.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the budget or the new category does not exist or
///   is not owned by `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_budget(
    id: BudgetId,
    user_id: UserId,
    update: UpdateBudget,
    connection: &Connection,
) -> Result<Budget, Error> {
    category::get_category_for_user(update.category_id, user_id, connection)?;

    let budget = connection
        .prepare(
            "UPDATE budget SET category_id = ?1, amount = ?2, description = ?3
             WHERE id = ?4 AND user_id = ?5
             RETURNING id, category_id, amount, period, description, user_id",
        )?
        .query_one(
            params![
                update.category_id,
                update.amount.to_string(),
                update.description,
                id,
                user_id
            ],
            map_budget_row,
        )?;

    Ok(budget)
}

/// Delete a budget.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the budget does not exist or is not owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_budget(id: BudgetId, user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let raw_amount: String = row.get(2)?;
    let raw_period: String = row.get(3)?;

    Ok(Budget {
        id: row.get(0)?,
        category_id: row.get(1)?,
        amount: decimal_from_sql(raw_amount, 2)?,
        period: budget_period_from_sql(raw_period, 3)?,
        description: row.get(4)?,
        user_id: row.get(5)?,
    })
}

fn budget_period_from_sql(text: String, column: usize) -> Result<BudgetPeriod, rusqlite::Error> {
    match text.as_str() {
        "weekly" => Ok(BudgetPeriod::Weekly),
        "monthly" => Ok(BudgetPeriod::Monthly),
        "quarterly" => Ok(BudgetPeriod::Quarterly),
        "yearly" => Ok(BudgetPeriod::Yearly),
        _ => Err(rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Text,
            format!("unknown budget period {text}").into(),
        )),
    }
}

// ============================================================================
// USAGE REPORTING
// ============================================================================

/// Usage status tiers for a budget, from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    /// Spending exceeds the ceiling.
    Danger,
    /// At least 80% of the ceiling is used.
    Warning,
    /// At least 60% of the ceiling is used.
    Success,
    /// Comfortably within budget.
    Primary,
}

/// A budget joined with its category and the current month's spend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetData {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The budgeted category's name.
    pub name: String,
    /// The budgeted category's icon identifier.
    pub icon: Option<String>,
    /// The budgeted category's colour key.
    pub color: Option<String>,
    /// How much was spent on the category this month.
    pub spent: Decimal,
    /// The ceiling amount.
    pub amount: Decimal,
    /// The budget's description.
    pub description: Option<String>,
}

impl BudgetData {
    /// How much of the ceiling is used, as a whole percentage capped at 100.
    ///
    /// A zero ceiling reports 0 rather than dividing by zero.
    pub fn percentage_used(&self) -> u8 {
        percentage_of(self.spent, self.amount)
    }

    /// How much budget is left this month. Negative when overspent.
    pub fn remaining(&self) -> Decimal {
        self.amount - self.spent
    }

    /// Whether spending exceeds the ceiling.
    pub fn is_over_budget(&self) -> bool {
        self.spent > self.amount
    }

    /// The display tier for the budget's current usage.
    pub fn status(&self) -> BudgetStatus {
        if self.is_over_budget() {
            BudgetStatus::Danger
        } else if self.percentage_used() >= 80 {
            BudgetStatus::Warning
        } else if self.percentage_used() >= 60 {
            BudgetStatus::Success
        } else {
            BudgetStatus::Primary
        }
    }
}

/// Summarize every budget for a user against the current month's spending.
///
/// The month window is derived from the caller-supplied `today`. Spend
/// sums every transaction recorded against the budget's category within
/// the window.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_budgets_data(
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<Vec<BudgetData>, Error> {
    let (month_start, month_end) = current_month_range(today);

    let mut statement = connection.prepare(
        "SELECT budget.id, category.name, category.icon, category.color, budget.amount,
                budget.description, \"transaction\".amount
         FROM budget
         INNER JOIN category ON budget.category_id = category.id
         LEFT JOIN \"transaction\" ON \"transaction\".category_id = category.id
              AND \"transaction\".date BETWEEN ?2 AND ?3
         WHERE budget.user_id = ?1
         ORDER BY budget.id",
    )?;

    let rows = statement.query_map(params![user_id, month_start, month_end], |row| {
        let raw_amount: String = row.get(4)?;
        let spent = row
            .get::<usize, Option<String>>(6)?
            .map(|text| decimal_from_sql(text, 6))
            .transpose()?;

        Ok((
            BudgetData {
                id: row.get(0)?,
                name: row.get(1)?,
                icon: row.get(2)?,
                color: row.get(3)?,
                spent: Decimal::ZERO,
                amount: decimal_from_sql(raw_amount, 4)?,
                description: row.get(5)?,
            },
            spent,
        ))
    })?;

    // One row per (budget, in-month transaction); fold each budget's rows
    // into a single record with the spend summed in exact decimals.
    let mut budgets: Vec<BudgetData> = Vec::new();
    for row in rows {
        let (budget, spent) = row?;

        if budgets.last().map(|last| last.id) != Some(budget.id) {
            budgets.push(budget);
        }

        if let (Some(last), Some(spent)) = (budgets.last_mut(), spent) {
            last.spent += spent;
        }
    }

    Ok(budgets)
}

// ============================================================================
// ALERTS
// ============================================================================

/// Severity of a budget alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// The budget is over its ceiling.
    Danger,
    /// The budget is close to its ceiling.
    Warning,
    /// The budget is fine.
    Info,
}

/// A short user-facing notice about one budget's usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAlert {
    /// The alert severity.
    pub level: AlertLevel,
    /// The budgeted category's name.
    pub name: String,
    /// The notice text, to be shown after the name.
    pub message: String,
}

/// The maximum number of alerts shown at once.
pub const MAX_BUDGET_ALERTS: usize = 4;

/// Build at most [MAX_BUDGET_ALERTS] alerts from budget usage, worst tier
/// first: over-budget, then nearing the ceiling, then within budget.
pub fn get_budget_alerts(budgets: &[BudgetData]) -> Vec<BudgetAlert> {
    let mut alerts = Vec::new();

    for budget in budgets.iter().filter(|budget| budget.is_over_budget()) {
        alerts.push(BudgetAlert {
            level: AlertLevel::Danger,
            name: budget.name.clone(),
            message: "is over budget".to_owned(),
        });
    }

    for budget in budgets
        .iter()
        .filter(|budget| !budget.is_over_budget() && budget.percentage_used() >= 80)
    {
        alerts.push(BudgetAlert {
            level: AlertLevel::Warning,
            name: budget.name.clone(),
            message: format!("is at {}% of budget", budget.percentage_used()),
        });
    }

    for budget in budgets
        .iter()
        .filter(|budget| !budget.is_over_budget() && budget.percentage_used() < 80)
    {
        alerts.push(BudgetAlert {
            level: AlertLevel::Info,
            name: budget.name.clone(),
            message: "is within budget".to_owned(),
        });
    }

    alerts.truncate(MAX_BUDGET_ALERTS);

    alerts
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod usage_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{OffsetDateTime, macros::date};

    use crate::{
        UserContext,
        budget::{BudgetData, BudgetPeriod, BudgetStatus, NewBudget, create_budget},
        category::{CategoryName, CategoryType, NewCategory, create_category},
        db::initialize,
        transaction::{NewTransaction, create_transaction},
        user::register_user,
    };

    use super::get_budgets_data;

    fn budget_data(spent: Decimal, amount: Decimal) -> BudgetData {
        BudgetData {
            id: 1,
            name: "Food".to_owned(),
            icon: None,
            color: None,
            spent,
            amount,
            description: None,
        }
    }

    #[test]
    fn percentage_used_is_capped_and_guards_zero_ceiling() {
        assert_eq!(budget_data(dec!(300), dec!(200)).percentage_used(), 100);
        assert_eq!(budget_data(dec!(50), Decimal::ZERO).percentage_used(), 0);
    }

    #[test]
    fn remaining_goes_negative_when_overspent() {
        let budget = budget_data(dec!(250), dec!(200));

        assert_eq!(budget.remaining(), dec!(-50));
        assert!(budget.is_over_budget());
    }

    #[test]
    fn status_tiers_match_usage() {
        assert_eq!(budget_data(dec!(201), dec!(200)).status(), BudgetStatus::Danger);
        assert_eq!(budget_data(dec!(160), dec!(200)).status(), BudgetStatus::Warning);
        assert_eq!(budget_data(dec!(120), dec!(200)).status(), BudgetStatus::Success);
        assert_eq!(budget_data(dec!(100), dec!(200)).status(), BudgetStatus::Primary);
    }

    #[test]
    fn spend_only_counts_the_current_month() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let (user, account) =
            register_user("foo@bar.baz", OffsetDateTime::now_utc(), &conn).unwrap();
        let context = UserContext {
            user_id: user.id,
            account_id: account.id,
        };
        let category = create_category(
            NewCategory {
                name: CategoryName::new_unchecked("Food"),
                description: None,
                category_type: CategoryType::Expense,
                icon: None,
                color: None,
                user_id: user.id,
            },
            &conn,
        )
        .unwrap();
        create_budget(
            NewBudget {
                category_id: category.id,
                amount: dec!(200.00),
                period: BudgetPeriod::Monthly,
                description: None,
                user_id: user.id,
            },
            &conn,
        )
        .unwrap();
        let now = OffsetDateTime::now_utc();
        for (amount, date) in [
            (dec!(40.00), date!(2025 - 03 - 05)),
            (dec!(25.50), date!(2025 - 03 - 28)),
            (dec!(99.99), date!(2025 - 02 - 28)),
        ] {
            create_transaction(
                NewTransaction {
                    amount,
                    date: Some(date),
                    description: None,
                    category_id: category.id,
                },
                &context,
                now,
                &conn,
            )
            .unwrap();
        }

        let got = get_budgets_data(user.id, date!(2025 - 03 - 15), &conn).unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].spent, dec!(65.50));
        assert_eq!(got[0].remaining(), dec!(134.50));
    }

    #[test]
    fn budgets_with_no_spend_report_zero() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let (user, _) = register_user("foo@bar.baz", OffsetDateTime::now_utc(), &conn).unwrap();
        let category = create_category(
            NewCategory {
                name: CategoryName::new_unchecked("Food"),
                description: None,
                category_type: CategoryType::Expense,
                icon: None,
                color: None,
                user_id: user.id,
            },
            &conn,
        )
        .unwrap();
        create_budget(
            NewBudget {
                category_id: category.id,
                amount: dec!(200.00),
                period: BudgetPeriod::Monthly,
                description: None,
                user_id: user.id,
            },
            &conn,
        )
        .unwrap();

        let got = get_budgets_data(user.id, date!(2025 - 03 - 15), &conn).unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].spent, Decimal::ZERO);
    }
}
