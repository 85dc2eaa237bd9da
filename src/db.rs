//! Database initialization.
//!
//! Each domain module owns its `create_*_table` function; this module
//! assembles them into a single schema so tests and binaries can set up a
//! database with one call.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, account, budget, category, goal, transaction, user};

/// Create the application tables in `connection`.
///
/// Foreign keys are switched on for the connection because ownership
/// cascades (user -> account -> transaction, goal -> history) rely on
/// `ON DELETE CASCADE`.
///
/// # Errors
/// Returns an error if any table cannot be created or there is some other
/// SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction, it is a no-op inside one.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    user::create_user_table(&transaction)?;
    account::create_account_table(&transaction)?;
    category::create_category_table(&transaction)?;
    transaction::create_transaction_table(&transaction)?;
    budget::create_budget_table(&transaction)?;
    goal::create_goal_tables(&transaction)?;

    transaction.commit()?;

    Ok(())
}
