use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};
use tracing_subscriber::EnvFilter;

use fintrack_rs::{
    UserContext,
    budget::{BudgetPeriod, NewBudget, create_budget},
    category::{Category, CategoryName, CategoryType, NewCategory, create_category},
    dashboard::get_dashboard_summary,
    db::initialize,
    goal::{NewGoal, add_money_to_goal, create_goal, get_goals_chart_data, quick_add_money},
    transaction::{NewTransaction, create_transaction},
    user::register_user,
};

/// A utility for creating a database populated with demo data for manual
/// testing of the finance tracker core.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    tracing::info!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize(&conn)?;

    let now = OffsetDateTime::now_utc();
    let today = now.date();

    tracing::info!("Creating demo user...");
    let (user, account) = register_user("demo@example.com", now, &conn)?;
    let context = UserContext {
        user_id: user.id,
        account_id: account.id,
    };

    let salary = create_demo_category(&conn, user.id, "Salary", CategoryType::Income, "success")?;
    let groceries =
        create_demo_category(&conn, user.id, "Groceries", CategoryType::Expense, "danger")?;
    let transport =
        create_demo_category(&conn, user.id, "Transport", CategoryType::Expense, "info")?;

    tracing::info!("Recording three months of transactions...");
    for months_back in 0..3i64 {
        // Close enough to "one month" for demo data.
        let month_day = today - Duration::days(30 * months_back);

        create_transaction(
            NewTransaction {
                amount: "2600.00".parse()?,
                date: Some(month_day),
                description: Some("Monthly pay".to_owned()),
                category_id: salary.id,
            },
            &context,
            now,
            &conn,
        )?;
        create_transaction(
            NewTransaction {
                amount: "84.70".parse()?,
                date: Some(month_day),
                description: Some("Weekly shop".to_owned()),
                category_id: groceries.id,
            },
            &context,
            now,
            &conn,
        )?;
        create_transaction(
            NewTransaction {
                amount: "42.50".parse()?,
                date: Some(month_day),
                description: Some("Fuel".to_owned()),
                category_id: transport.id,
            },
            &context,
            now,
            &conn,
        )?;
    }

    create_budget(
        NewBudget {
            category_id: groceries.id,
            amount: "400.00".parse()?,
            period: BudgetPeriod::Monthly,
            description: Some("Keep the weekly shop in check".to_owned()),
            user_id: user.id,
        },
        &conn,
    )?;

    tracing::info!("Creating a goal with a few contributions...");
    let goal = create_goal(
        NewGoal {
            name: "Emergency fund".to_owned(),
            description: Some("Three months of expenses".to_owned()),
            target_amount: "1500.00".parse()?,
            current_amount: "0".parse()?,
            target_date: today + Duration::days(365),
            icon: Some("fas fa-shield-alt".to_owned()),
            color: Some("primary".to_owned()),
            user_id: user.id,
        },
        now,
        &conn,
    )?;
    add_money_to_goal(goal.id, "250.00".parse()?, user.id, now, &conn)?;
    quick_add_money(goal.id, 100, user.id, now, &conn)?;

    let summary = get_dashboard_summary(context.account_id, today, &conn)?;
    tracing::info!(
        "Demo account balance: {} (this month: +{} / -{})",
        summary.total_balance,
        summary.month_income,
        summary.month_expenses
    );

    let chart = get_goals_chart_data(user.id, today, &conn)?;
    println!("{}", serde_json::to_string_pretty(&chart)?);

    println!("Success!");

    Ok(())
}

fn create_demo_category(
    conn: &Connection,
    user_id: i64,
    name: &str,
    category_type: CategoryType,
    color: &str,
) -> Result<Category, Box<dyn Error>> {
    let category = create_category(
        NewCategory {
            name: CategoryName::new(name)?,
            description: None,
            category_type,
            icon: None,
            color: Some(color.to_owned()),
            user_id,
        },
        conn,
    )?;

    Ok(category)
}
