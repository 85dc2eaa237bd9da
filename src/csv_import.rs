//! Bulk CSV import and filtered CSV export of transactions.
//!
//! Import is all-or-nothing: every row is validated before anything is
//! written, and a valid file commits all of its rows plus exactly one
//! balance recalculation in one unit of work.

use std::{collections::HashMap, fmt::Display};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior, params};
use rust_decimal::Decimal;
use time::{
    Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{
    Error, UserContext,
    account::{AccountId, recalculate_balance},
    category::{Category, CategoryId, CategoryType, list_categories},
    transaction::{TransactionFilter, get_transactions},
};

/// The columns an import file's header row must contain.
pub const REQUIRED_HEADERS: [&str; 5] = ["date", "description", "type", "amount", "category_id"];

/// A validation failure for one CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// The 1-based line number in the file, counting the header as line 1.
    pub row: usize,
    /// What was wrong with the row.
    pub message: String,
}

impl Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

// Tried in order, so ambiguous slash dates resolve as month/day/year.
const DATE_FORMATS: [&[BorrowedFormatItem]; 4] = [
    format_description!("[year]-[month]-[day]"),
    format_description!("[month]/[day]/[year]"),
    format_description!("[day]/[month]/[year]"),
    format_description!("[year]/[month]/[day]"),
];

/// Parse a date in any of the formats the import accepts: `YYYY-MM-DD`,
/// `MM/DD/YYYY`, `DD/MM/YYYY` or `YYYY/MM/DD`.
///
/// # Errors
/// This function will return an [Error::InvalidDate] if `text` matches none
/// of the accepted formats.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    for format in DATE_FORMATS {
        if let Ok(date) = Date::parse(text, format) {
            return Ok(date);
        }
    }

    Err(Error::InvalidDate(text.to_owned()))
}

/// Import transactions from CSV text into the caller's account.
///
/// Rows are validated against the caller's categories: the category must
/// exist, belong to the caller and have the same type as the row. If any
/// row is invalid nothing is imported. On success every row is inserted
/// and the balance is recalculated once, all in one unit of work.
///
/// Returns the number of transactions imported.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCsv] if the header is missing required columns or the
///   file contains no transaction rows,
/// - [Error::CsvRowErrors] listing every invalid row,
/// - or [Error::SqlError] if there is some SQL error.
pub fn import_transactions_csv(
    data: &str,
    context: &UserContext,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<usize, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?
        .clone();
    let columns = find_columns(&headers)?;

    let categories: HashMap<CategoryId, Category> =
        list_categories(context.user_id, None, connection)?
            .into_iter()
            .map(|category| (category.id, category))
            .collect();

    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (index, record) in reader.records().enumerate() {
        // Line 1 is the header, so the first data row is line 2.
        let row_number = index + 2;

        let record = match record {
            Ok(record) => record,
            Err(error) => {
                errors.push(RowError {
                    row: row_number,
                    message: format!("could not parse row: {error}"),
                });
                continue;
            }
        };

        match validate_row(&record, &columns, &categories) {
            Ok(row) => rows.push(row),
            Err(message) => errors.push(RowError {
                row: row_number,
                message,
            }),
        }
    }

    if !errors.is_empty() {
        return Err(Error::CsvRowErrors(errors));
    }

    if rows.is_empty() {
        return Err(Error::InvalidCsv(
            "no transaction rows found in the file".to_owned(),
        ));
    }

    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    for row in &rows {
        transaction.execute(
            "INSERT INTO \"transaction\" (date, description, type, amount, category_id, account_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.date,
                row.description,
                row.transaction_type.as_str(),
                row.amount.to_string(),
                row.category_id,
                context.account_id
            ],
        )?;
    }

    // One recalculation covers the whole batch.
    recalculate_balance(context.account_id, now, &transaction)?;

    transaction.commit()?;

    tracing::info!("imported {} transactions from CSV", rows.len());

    Ok(rows.len())
}

/// Export the account's transactions as CSV text, honouring the same
/// filters and newest-first ordering as the listing.
///
/// The header mirrors the import format; dates are written as
/// `YYYY-MM-DD` and amounts with two decimal places.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is some SQL error.
pub fn export_transactions_csv(
    account_id: AccountId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<String, Error> {
    let transactions = get_transactions(account_id, filter, connection)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(REQUIRED_HEADERS)
        .map_err(|error| Error::InvalidCsv(error.to_string()))?;

    for transaction in transactions {
        writer
            .write_record([
                transaction.date.to_string(),
                transaction.description.unwrap_or_default(),
                transaction.transaction_type.as_str().to_owned(),
                format!("{:.2}", transaction.amount),
                transaction.category_id.to_string(),
            ])
            .map_err(|error| Error::InvalidCsv(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::InvalidCsv(error.to_string()))
}

struct Columns {
    date: usize,
    description: usize,
    transaction_type: usize,
    amount: usize,
    category_id: usize,
}

fn find_columns(headers: &csv::StringRecord) -> Result<Columns, Error> {
    let position = |name: &str| {
        headers.iter().position(|header| header == name).ok_or_else(|| {
            Error::InvalidCsv(format!(
                "the header row must contain these columns: {}",
                REQUIRED_HEADERS.join(", ")
            ))
        })
    };

    Ok(Columns {
        date: position("date")?,
        description: position("description")?,
        transaction_type: position("type")?,
        amount: position("amount")?,
        category_id: position("category_id")?,
    })
}

struct ImportRow {
    date: Date,
    description: Option<String>,
    transaction_type: CategoryType,
    amount: Decimal,
    category_id: CategoryId,
}

fn validate_row(
    record: &csv::StringRecord,
    columns: &Columns,
    categories: &HashMap<CategoryId, Category>,
) -> Result<ImportRow, String> {
    let field = |index: usize| record.get(index).unwrap_or("").trim();

    let date_text = field(columns.date);
    let description = field(columns.description);
    let type_text = field(columns.transaction_type);
    let amount_text = field(columns.amount);
    let category_text = field(columns.category_id);

    // The description is the only optional column.
    if date_text.is_empty()
        || type_text.is_empty()
        || amount_text.is_empty()
        || category_text.is_empty()
    {
        return Err("missing required fields".to_owned());
    }

    let transaction_type = match type_text.to_lowercase().as_str() {
        "income" => CategoryType::Income,
        "expense" => CategoryType::Expense,
        other => return Err(format!("type must be 'income' or 'expense', got '{other}'")),
    };

    let amount: Decimal = amount_text
        .parse()
        .map_err(|_| format!("invalid amount '{amount_text}'"))?;
    if amount <= Decimal::ZERO {
        return Err("amount must be greater than zero".to_owned());
    }

    let category_id: CategoryId = category_text
        .parse()
        .map_err(|_| format!("invalid category ID '{category_text}'"))?;
    let category = categories
        .get(&category_id)
        .ok_or_else(|| format!("category ID {category_id} not found"))?;

    if category.category_type != transaction_type {
        return Err(Error::CategoryTypeMismatch {
            category: category.category_type,
            transaction: transaction_type,
        }
        .to_string());
    }

    let date =
        parse_date(date_text).map_err(|_| format!("invalid date '{date_text}', use YYYY-MM-DD or MM/DD/YYYY"))?;

    Ok(ImportRow {
        date,
        description: (!description.is_empty()).then(|| description.to_owned()),
        transaction_type,
        amount,
        category_id,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod import_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::OffsetDateTime;

    use crate::{
        Error, UserContext,
        account::get_account,
        category::{Category, CategoryName, CategoryType, NewCategory, create_category},
        db::initialize,
        user::register_user,
    };

    use super::import_transactions_csv;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_test_user(conn: &Connection) -> (UserContext, Category, Category) {
        let (user, account) =
            register_user("foo@bar.baz", OffsetDateTime::now_utc(), conn).unwrap();
        let context = UserContext {
            user_id: user.id,
            account_id: account.id,
        };

        let income = create_category(
            NewCategory {
                name: CategoryName::new_unchecked("Salary"),
                description: None,
                category_type: CategoryType::Income,
                icon: None,
                color: None,
                user_id: user.id,
            },
            conn,
        )
        .unwrap();
        let expense = create_category(
            NewCategory {
                name: CategoryName::new_unchecked("Food"),
                description: None,
                category_type: CategoryType::Expense,
                icon: None,
                color: None,
                user_id: user.id,
            },
            conn,
        )
        .unwrap();

        (context, income, expense)
    }

    fn count_transactions(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM \"transaction\"", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn valid_file_imports_all_rows_and_recalculates_the_balance() {
        let conn = get_test_connection();
        let (context, income, expense) = create_test_user(&conn);
        let data = format!(
            "date,description,type,amount,category_id\n\
             2025-03-01,Pay,income,500.00,{}\n\
             2025-03-02,Lunch,expense,12.50,{}\n\
             03/05/2025,,expense,7.25,{}\n",
            income.id, expense.id, expense.id
        );

        let imported =
            import_transactions_csv(&data, &context, OffsetDateTime::now_utc(), &conn).unwrap();

        assert_eq!(imported, 3);
        assert_eq!(count_transactions(&conn), 3);
        assert_eq!(
            get_account(context.account_id, &conn).unwrap().balance,
            dec!(480.25)
        );
    }

    #[test]
    fn one_bad_row_imports_nothing_and_reports_its_line_number() {
        let conn = get_test_connection();
        let (context, _income, expense) = create_test_user(&conn);

        let mut data = "date,description,type,amount,category_id\n".to_owned();
        for day in 1..=10 {
            // Row 4 (file line 5) has a negative amount.
            let amount = if day == 4 { "-5.00" } else { "5.00" };
            data.push_str(&format!(
                "2025-03-{day:02},,expense,{amount},{}\n",
                expense.id
            ));
        }

        let got = import_transactions_csv(&data, &context, OffsetDateTime::now_utc(), &conn);

        let errors = match got {
            Err(Error::CsvRowErrors(errors)) => errors,
            other => panic!("want CsvRowErrors, got {other:?}"),
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 5);
        assert_eq!(errors[0].message, "amount must be greater than zero");
        assert_eq!(count_transactions(&conn), 0);
        assert_eq!(
            get_account(context.account_id, &conn).unwrap().balance,
            dec!(0)
        );
    }

    #[test]
    fn mismatched_type_is_a_row_error() {
        let conn = get_test_connection();
        let (context, income, _) = create_test_user(&conn);
        let data = format!(
            "date,description,type,amount,category_id\n\
             2025-03-01,Pay,expense,500.00,{}\n",
            income.id
        );

        let got = import_transactions_csv(&data, &context, OffsetDateTime::now_utc(), &conn);

        let errors = match got {
            Err(Error::CsvRowErrors(errors)) => errors,
            other => panic!("want CsvRowErrors, got {other:?}"),
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 2);
        assert!(errors[0].message.contains("does not match"));
    }

    #[test]
    fn someone_elses_category_is_reported_as_not_found() {
        let conn = get_test_connection();
        let (_, income, _) = create_test_user(&conn);
        let (other_user, other_account) =
            register_user("bar@baz.qux", OffsetDateTime::now_utc(), &conn).unwrap();
        let other = UserContext {
            user_id: other_user.id,
            account_id: other_account.id,
        };
        let data = format!(
            "date,description,type,amount,category_id\n\
             2025-03-01,Pay,income,500.00,{}\n",
            income.id
        );

        let got = import_transactions_csv(&data, &other, OffsetDateTime::now_utc(), &conn);

        let errors = match got {
            Err(Error::CsvRowErrors(errors)) => errors,
            other => panic!("want CsvRowErrors, got {other:?}"),
        };
        assert!(errors[0].message.contains("not found"));
        assert_eq!(count_transactions(&conn), 0);
    }

    #[test]
    fn missing_header_column_fails_before_any_row_is_read() {
        let conn = get_test_connection();
        let (context, _, _) = create_test_user(&conn);
        let data = "date,description,amount,category_id\n2025-03-01,Pay,500.00,1\n";

        let got = import_transactions_csv(data, &context, OffsetDateTime::now_utc(), &conn);

        assert!(matches!(got, Err(Error::InvalidCsv(_))));
    }

    #[test]
    fn header_only_file_is_rejected() {
        let conn = get_test_connection();
        let (context, _, _) = create_test_user(&conn);
        let data = "date,description,type,amount,category_id\n";

        let got = import_transactions_csv(data, &context, OffsetDateTime::now_utc(), &conn);

        assert!(matches!(got, Err(Error::InvalidCsv(_))));
    }
}
