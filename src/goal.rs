//! Savings goals: contribution tracking, the achieved state machine, and
//! the history-backed progress chart.
//!
//! Every save of a goal appends a history snapshot of its current amount.
//! That log is append-only and is the sole input to the progress chart;
//! entries are never edited or removed individually.

use std::collections::HashMap;

use rusqlite::{Connection, Row, Transaction as SqlTransaction, TransactionBehavior, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    DatabaseId, Error,
    money::{decimal_from_sql, percentage_of},
    month::{last_n_months, month_abbreviation},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a goal.
pub type GoalId = i64;

/// Preset contribution amounts accepted by [quick_add_money].
pub const QUICK_ADD_AMOUNTS: [u32; 4] = [10, 25, 50, 100];

/// The number of trailing months covered by the progress chart.
const CHART_MONTHS: u32 = 12;

/// A savings goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// The ID of the goal.
    pub id: GoalId,
    /// The goal's display name.
    pub name: String,
    /// A text description of the goal.
    pub description: Option<String>,
    /// The amount the user wants to save.
    pub target_amount: Decimal,
    /// The amount saved so far. Never negative.
    pub current_amount: Decimal,
    /// When the goal was created. Set once.
    pub start_date: Date,
    /// When the user wants the goal achieved.
    pub target_date: Date,
    /// An icon identifier for display.
    pub icon: Option<String>,
    /// A colour key for display.
    pub color: Option<String>,
    /// Whether the target has been reached.
    ///
    /// Monotonic: once true it never reverts, even if the target amount is
    /// later raised.
    pub achieved: bool,
    /// When the target was first reached.
    ///
    /// Stamped exactly once, at the first contribution where
    /// `current_amount >= target_amount`. Later contributions never
    /// re-stamp it.
    pub achieved_at: Option<OffsetDateTime>,
    /// The user who owns the goal.
    pub user_id: UserId,
}

/// An append-only snapshot of a goal's saved amount at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalHistoryEntry {
    /// The ID of the history entry.
    pub id: DatabaseId,
    /// The goal the snapshot belongs to.
    pub goal_id: GoalId,
    /// The goal's current amount when the snapshot was taken.
    pub amount: Decimal,
    /// When the snapshot was taken.
    pub date: OffsetDateTime,
}

/// The fields needed to create a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    /// The goal's display name.
    pub name: String,
    /// A text description of the goal.
    pub description: Option<String>,
    /// The amount the user wants to save.
    pub target_amount: Decimal,
    /// The starting saved amount, usually zero.
    pub current_amount: Decimal,
    /// When the user wants the goal achieved.
    pub target_date: Date,
    /// An icon identifier for display.
    pub icon: Option<String>,
    /// A colour key for display.
    pub color: Option<String>,
    /// The user who will own the goal.
    pub user_id: UserId,
}

/// The editable fields of a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateGoal {
    /// The new display name.
    pub name: String,
    /// The new description.
    pub description: Option<String>,
    /// The new target amount.
    pub target_amount: Decimal,
    /// The new saved amount, or `None` to leave it unchanged.
    pub current_amount: Option<Decimal>,
    /// The new target date.
    pub target_date: Date,
    /// The new icon identifier.
    pub icon: Option<String>,
    /// The new colour key.
    pub color: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the goal and goal history tables in the database.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_goal_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                target_amount TEXT NOT NULL,
                current_amount TEXT NOT NULL,
                start_date TEXT NOT NULL,
                target_date TEXT NOT NULL,
                icon TEXT,
                color TEXT,
                achieved INTEGER NOT NULL DEFAULT 0,
                achieved_at TEXT,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal_history (
                id INTEGER PRIMARY KEY,
                goal_id INTEGER NOT NULL,
                amount TEXT NOT NULL,
                date TEXT NOT NULL,
                FOREIGN KEY(goal_id) REFERENCES goal(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create a new goal and its first history snapshot in one unit of work.
///
/// `start_date` is taken from `now` and never changes afterwards.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `user_id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_goal(new: NewGoal, now: OffsetDateTime, connection: &Connection) -> Result<Goal, Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let goal = transaction
        .prepare(
            "INSERT INTO goal (name, description, target_amount, current_amount, start_date,
                               target_date, icon, color, achieved, achieved_at, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL, ?9)
             RETURNING id, name, description, target_amount, current_amount, start_date,
                       target_date, icon, color, achieved, achieved_at, user_id",
        )?
        .query_one(
            params![
                new.name,
                new.description,
                new.target_amount.to_string(),
                new.current_amount.to_string(),
                now.date(),
                new.target_date,
                new.icon,
                new.color,
                new.user_id
            ],
            map_goal_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })?;

    append_history(goal.id, goal.current_amount, now, &transaction)?;

    transaction.commit()?;

    Ok(goal)
}

/// Update a goal's details and append a history snapshot in one unit of
/// work.
///
/// Editing never evaluates the achieved transition; only contributions do.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the goal does not exist or is not owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_goal(
    id: GoalId,
    user_id: UserId,
    update: UpdateGoal,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Goal, Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let goal = transaction
        .prepare(
            "UPDATE goal
             SET name = ?1, description = ?2, target_amount = ?3,
                 current_amount = COALESCE(?4, current_amount), target_date = ?5,
                 icon = ?6, color = ?7
             WHERE id = ?8 AND user_id = ?9
             RETURNING id, name, description, target_amount, current_amount, start_date,
                       target_date, icon, color, achieved, achieved_at, user_id",
        )?
        .query_one(
            params![
                update.name,
                update.description,
                update.target_amount.to_string(),
                update.current_amount.map(|amount| amount.to_string()),
                update.target_date,
                update.icon,
                update.color,
                id,
                user_id
            ],
            map_goal_row,
        )?;

    append_history(goal.id, goal.current_amount, now, &transaction)?;

    transaction.commit()?;

    Ok(goal)
}

/// Delete a goal and, through the cascade, its entire history.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the goal does not exist or is not owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_goal(id: GoalId, user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM goal WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Retrieve a goal owned by `user_id` by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a goal owned by the user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_goal(id: GoalId, user_id: UserId, connection: &Connection) -> Result<Goal, Error> {
    let goal = connection
        .prepare(
            "SELECT id, name, description, target_amount, current_amount, start_date,
                    target_date, icon, color, achieved, achieved_at, user_id
             FROM goal WHERE id = ?1 AND user_id = ?2",
        )?
        .query_one(params![id, user_id], map_goal_row)?;

    Ok(goal)
}

/// Retrieve a goal's history snapshots, oldest first.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_goal_history(
    goal_id: GoalId,
    connection: &Connection,
) -> Result<Vec<GoalHistoryEntry>, Error> {
    connection
        .prepare(
            "SELECT id, goal_id, amount, date FROM goal_history
             WHERE goal_id = ?1 ORDER BY date ASC, id ASC",
        )?
        .query_map(params![goal_id], |row| {
            let raw_amount: String = row.get(2)?;

            Ok(GoalHistoryEntry {
                id: row.get(0)?,
                goal_id: row.get(1)?,
                amount: decimal_from_sql(raw_amount, 2)?,
                date: row.get(3)?,
            })
        })?
        .map(|maybe_entry| maybe_entry.map_err(Error::SqlError))
        .collect()
}

// ============================================================================
// CONTRIBUTIONS
// ============================================================================

/// Add money to a goal, evaluate the achieved transition and append a
/// history snapshot, all in one unit of work.
///
/// The achieved flag flips from false to true at the first contribution
/// where the saved amount reaches the target, and `achieved_at` is stamped
/// with that contribution's time. Contributions past the target keep
/// accumulating but never change the flag or the stamp again.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `amount` is zero or negative,
/// - [Error::NotFound] if the goal does not exist or is not owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn add_money_to_goal(
    goal_id: GoalId,
    amount: Decimal,
    user_id: UserId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Goal, Error> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(amount));
    }

    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let goal = get_goal(goal_id, user_id, &transaction)?;
    let current_amount = goal.current_amount + amount;

    let (achieved, achieved_at) = if !goal.achieved && current_amount >= goal.target_amount {
        (true, Some(now))
    } else {
        (goal.achieved, goal.achieved_at)
    };

    let updated = transaction
        .prepare(
            "UPDATE goal SET current_amount = ?1, achieved = ?2, achieved_at = ?3
             WHERE id = ?4
             RETURNING id, name, description, target_amount, current_amount, start_date,
                       target_date, icon, color, achieved, achieved_at, user_id",
        )?
        .query_one(
            params![current_amount.to_string(), achieved, achieved_at, goal_id],
            map_goal_row,
        )?;

    append_history(goal_id, updated.current_amount, now, &transaction)?;

    transaction.commit()?;

    Ok(updated)
}

/// Add one of the [QUICK_ADD_AMOUNTS] presets to a goal.
///
/// Funnels through [add_money_to_goal], so the same validation and
/// achieved transition apply.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `preset` is not one of the accepted presets,
/// - [Error::NotFound] if the goal does not exist or is not owned by
///   `user_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn quick_add_money(
    goal_id: GoalId,
    preset: u32,
    user_id: UserId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Goal, Error> {
    if !QUICK_ADD_AMOUNTS.contains(&preset) {
        return Err(Error::InvalidAmount(Decimal::from(preset)));
    }

    add_money_to_goal(goal_id, Decimal::from(preset), user_id, now, connection)
}

fn append_history(
    goal_id: GoalId,
    amount: Decimal,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO goal_history (goal_id, amount, date) VALUES (?1, ?2, ?3)",
        params![goal_id, amount.to_string(), now],
    )?;

    Ok(())
}

fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    let raw_target: String = row.get(3)?;
    let raw_current: String = row.get(4)?;

    Ok(Goal {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        target_amount: decimal_from_sql(raw_target, 3)?,
        current_amount: decimal_from_sql(raw_current, 4)?,
        start_date: row.get(5)?,
        target_date: row.get(6)?,
        icon: row.get(7)?,
        color: row.get(8)?,
        achieved: row.get(9)?,
        achieved_at: row.get(10)?,
        user_id: row.get(11)?,
    })
}

// ============================================================================
// REPORTING
// ============================================================================

/// A goal's progress as shown on the goals page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalData {
    /// The ID of the goal.
    pub id: GoalId,
    /// The goal's display name.
    pub name: String,
    /// The goal's description.
    pub description: Option<String>,
    /// The amount the user wants to save.
    pub target_amount: Decimal,
    /// The amount saved so far.
    pub current_amount: Decimal,
    /// When the user wants the goal achieved.
    pub target_date: Date,
    /// The goal's icon identifier.
    pub icon: Option<String>,
    /// The goal's colour key.
    pub color: Option<String>,
}

impl GoalData {
    /// How much of the target is saved, as a whole percentage capped at
    /// 100. A zero target reports 0.
    pub fn percentage_achieved(&self) -> u8 {
        percentage_of(self.current_amount, self.target_amount)
    }

    /// Days until the target date.
    ///
    /// Negative when the goal is overdue; surfaced as-is, never clamped.
    pub fn time_left(&self, today: Date) -> i64 {
        (self.target_date - today).whole_days()
    }
}

/// Roll-up statistics across a user's goals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalStatistics {
    /// The sum of all target amounts.
    pub total_target_amount: Decimal,
    /// The sum of all saved amounts.
    pub total_saved: Decimal,
    /// The mean of the goals' progress percentages, 0 with no goals.
    pub average_progress: u8,
    /// How many goals the user has.
    pub total_goals: usize,
}

/// One goal's charted progress line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalSeries {
    /// The goal's display name.
    pub name: String,
    /// The goal's resolved display colour as a hex code.
    pub color: String,
    /// One value per charted month, oldest first.
    pub points: Vec<Decimal>,
}

/// Twelve months of goal progress for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalsChartData {
    /// Month labels, oldest first, e.g. "Jan".
    pub labels: Vec<String>,
    /// One line per goal.
    pub series: Vec<GoalSeries>,
}

/// Fetch the progress records for every goal owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_goals_data(user_id: UserId, connection: &Connection) -> Result<Vec<GoalData>, Error> {
    connection
        .prepare(
            "SELECT id, name, description, target_amount, current_amount, target_date, icon, color
             FROM goal WHERE user_id = ?1 ORDER BY id",
        )?
        .query_map(params![user_id], |row| {
            let raw_target: String = row.get(3)?;
            let raw_current: String = row.get(4)?;

            Ok(GoalData {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                target_amount: decimal_from_sql(raw_target, 3)?,
                current_amount: decimal_from_sql(raw_current, 4)?,
                target_date: row.get(5)?,
                icon: row.get(6)?,
                color: row.get(7)?,
            })
        })?
        .map(|maybe_goal| maybe_goal.map_err(Error::SqlError))
        .collect()
}

/// Roll up totals and average progress across `goals`.
pub fn get_goal_statistics(goals: &[GoalData]) -> GoalStatistics {
    let total_target_amount = goals.iter().map(|goal| goal.target_amount).sum();
    let total_saved = goals.iter().map(|goal| goal.current_amount).sum();

    let average_progress = if goals.is_empty() {
        0
    } else {
        let progress_sum: u32 = goals
            .iter()
            .map(|goal| goal.percentage_achieved() as u32)
            .sum();
        (progress_sum / goals.len() as u32) as u8
    };

    GoalStatistics {
        total_target_amount,
        total_saved,
        average_progress,
        total_goals: goals.len(),
    }
}

/// Reconstruct twelve months of progress per goal from the history log.
///
/// For each month the chart takes the largest snapshot recorded in that
/// month; amounts only grow under normal use, so the maximum is the
/// month's closing value. Months without a snapshot carry the last known
/// value forward as a step function, and months before the first in-window
/// snapshot report zero.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn get_goals_chart_data(
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<GoalsChartData, Error> {
    let months = last_n_months(CHART_MONTHS, today);
    let labels = months
        .iter()
        .map(|window| month_abbreviation(window.start.month()).to_owned())
        .collect();
    let window_start = months[0].start;

    let goals = get_goals_data(user_id, connection)?;

    let mut series = Vec::with_capacity(goals.len());
    for goal in goals {
        let history = get_goal_history(goal.id, connection)?;

        let mut monthly_maximums: HashMap<Date, Decimal> = HashMap::new();
        for entry in history {
            let entry_date = entry.date.date();
            if entry_date < window_start {
                continue;
            }

            let month = entry_date.replace_day(1).unwrap();
            let maximum = monthly_maximums.entry(month).or_insert(entry.amount);
            if entry.amount > *maximum {
                *maximum = entry.amount;
            }
        }

        let mut points = Vec::with_capacity(months.len());
        let mut last_amount = Decimal::ZERO;
        for window in &months {
            if let Some(&amount) = monthly_maximums.get(&window.start) {
                last_amount = amount;
            }
            points.push(last_amount);
        }

        series.push(GoalSeries {
            name: goal.name,
            color: goal_color_hex(goal.color.as_deref()).to_owned(),
            points,
        });
    }

    Ok(GoalsChartData { labels, series })
}

/// Resolve a goal colour key to the hex code used in chart payloads.
///
/// Unknown and missing keys share the default blue.
pub fn goal_color_hex(color: Option<&str>) -> &'static str {
    match color {
        Some("success") => "#27ae60",
        Some("danger") => "#e74c3c",
        Some("warning") => "#f39c12",
        Some("info") => "#17a2b8",
        Some("secondary") => "#6c757d",
        _ => "#3498db",
    }
}

// ============================================================================
// TESTS
// ============================================================================



#[cfg(test)]
mod reporting_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{OffsetDateTime, macros::date, macros::datetime};

    use crate::{
        db::initialize,
        goal::{GoalData, NewGoal, create_goal, get_goal_statistics, get_goals_data},
        user::register_user,
    };

    use super::get_goals_chart_data;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn goal_data(current: Decimal, target: Decimal) -> GoalData {
        GoalData {
            id: 1,
            name: "Goal".to_owned(),
            description: None,
            target_amount: target,
            current_amount: current,
            target_date: date!(2026 - 01 - 01),
            icon: None,
            color: None,
        }
    }

    #[test]
    fn percentage_achieved_is_capped_and_guards_zero_target() {
        assert_eq!(goal_data(dec!(150), dec!(100)).percentage_achieved(), 100);
        assert_eq!(goal_data(dec!(50), Decimal::ZERO).percentage_achieved(), 0);
    }

    #[test]
    fn time_left_goes_negative_when_overdue() {
        let goal = goal_data(dec!(0), dec!(100));

        assert_eq!(goal.time_left(date!(2025 - 12 - 22)), 10);
        assert_eq!(goal.time_left(date!(2026 - 01 - 11)), -10);
    }

    #[test]
    fn statistics_average_progress_over_goals() {
        let goals = vec![goal_data(dec!(50), dec!(100)), goal_data(dec!(100), dec!(100))];

        let got = get_goal_statistics(&goals);

        assert_eq!(got.total_target_amount, dec!(200));
        assert_eq!(got.total_saved, dec!(150));
        assert_eq!(got.average_progress, 75);
        assert_eq!(got.total_goals, 2);
    }

    #[test]
    fn statistics_are_zero_with_no_goals() {
        let got = get_goal_statistics(&[]);

        assert_eq!(got.average_progress, 0);
        assert_eq!(got.total_goals, 0);
    }

    fn insert_history(conn: &Connection, goal_id: i64, amount: &str, date: OffsetDateTime) {
        conn.execute(
            "INSERT INTO goal_history (goal_id, amount, date) VALUES (?1, ?2, ?3)",
            rusqlite::params![goal_id, amount, date],
        )
        .unwrap();
    }

    #[test]
    fn chart_step_fills_between_snapshots() {
        let conn = get_test_connection();
        let (user, _) = register_user("foo@bar.baz", OffsetDateTime::now_utc(), &conn).unwrap();
        let goal = create_goal(
            NewGoal {
                name: "Emergency fund".to_owned(),
                description: None,
                target_amount: dec!(1000),
                current_amount: dec!(0),
                target_date: date!(2026 - 06 - 01),
                icon: None,
                color: Some("danger".to_owned()),
                user_id: user.id,
            },
            // Dated before the chart window so the creation snapshot is
            // ignored.
            datetime!(2024-06-01 09:00 UTC),
            &conn,
        )
        .unwrap();
        // Window is Jan..Dec 2025. Snapshots land in months 1 and 3 only.
        insert_history(&conn, goal.id, "100", datetime!(2025-01-15 09:00 UTC));
        insert_history(&conn, goal.id, "300", datetime!(2025-03-20 09:00 UTC));

        let got = get_goals_chart_data(user.id, date!(2025 - 12 - 10), &conn).unwrap();

        assert_eq!(got.labels.len(), 12);
        assert_eq!(got.labels[0], "Jan");
        assert_eq!(got.labels[11], "Dec");
        assert_eq!(got.series.len(), 1);
        assert_eq!(got.series[0].color, "#e74c3c");

        let want: Vec<Decimal> = [
            100, 100, 300, 300, 300, 300, 300, 300, 300, 300, 300, 300,
        ]
        .iter()
        .map(|&value| Decimal::from(value))
        .collect();
        assert_eq!(got.series[0].points, want);
    }

    #[test]
    fn chart_takes_the_largest_snapshot_within_a_month() {
        let conn = get_test_connection();
        let (user, _) = register_user("foo@bar.baz", OffsetDateTime::now_utc(), &conn).unwrap();
        let goal = create_goal(
            NewGoal {
                name: "Car".to_owned(),
                description: None,
                target_amount: dec!(5000),
                current_amount: dec!(0),
                target_date: date!(2026 - 06 - 01),
                icon: None,
                color: None,
                user_id: user.id,
            },
            datetime!(2024-06-01 09:00 UTC),
            &conn,
        )
        .unwrap();
        insert_history(&conn, goal.id, "50", datetime!(2025-11-05 09:00 UTC));
        insert_history(&conn, goal.id, "80", datetime!(2025-11-25 09:00 UTC));

        let got = get_goals_chart_data(user.id, date!(2025 - 12 - 10), &conn).unwrap();

        let points = &got.series[0].points;
        assert_eq!(points[10], dec!(80)); // November
        assert_eq!(points[11], dec!(80)); // December carries it forward
    }

    #[test]
    fn chart_reports_zero_before_the_first_snapshot() {
        let conn = get_test_connection();
        let (user, _) = register_user("foo@bar.baz", OffsetDateTime::now_utc(), &conn).unwrap();
        let goal = create_goal(
            NewGoal {
                name: "Piano".to_owned(),
                description: None,
                target_amount: dec!(2000),
                current_amount: dec!(0),
                target_date: date!(2026 - 06 - 01),
                icon: None,
                color: None,
                user_id: user.id,
            },
            datetime!(2024-06-01 09:00 UTC),
            &conn,
        )
        .unwrap();
        insert_history(&conn, goal.id, "400", datetime!(2025-06-15 09:00 UTC));

        let got = get_goals_chart_data(user.id, date!(2025 - 12 - 10), &conn).unwrap();

        let points = &got.series[0].points;
        assert_eq!(points[0], Decimal::ZERO);
        assert_eq!(points[4], Decimal::ZERO);
        assert_eq!(points[5], dec!(400));
    }

    #[test]
    fn goals_data_lists_every_goal() {
        let conn = get_test_connection();
        let (user, _) = register_user("foo@bar.baz", OffsetDateTime::now_utc(), &conn).unwrap();
        for name in ["First", "Second"] {
            create_goal(
                NewGoal {
                    name: name.to_owned(),
                    description: None,
                    target_amount: dec!(100),
                    current_amount: dec!(25),
                    target_date: date!(2026 - 06 - 01),
                    icon: None,
                    color: None,
                    user_id: user.id,
                },
                OffsetDateTime::now_utc(),
                &conn,
            )
            .unwrap();
        }

        let got = get_goals_data(user.id, &conn).unwrap();

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].name, "First");
        assert_eq!(got[0].percentage_achieved(), 25);
    }
}
