use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use financy_rs::{
    CategoryName, Email, NewCategory, PasswordHash, Transaction, TransactionType,
    ValidatedPassword, create_category, create_transaction, create_user, initialize_db,
};

/// A utility for creating a test database for the GraphQL server of financy_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

const TEST_EMAIL: &str = "demo@example.com";
const TEST_PASSWORD: &str = "test";

/// (name, description, icon, color)
const CATEGORIES: [(&str, &str, &str, &str); 8] = [
    ("Food", "Restaurants, takeaways and meals out", "Utensils", "#cc3629"),
    ("Entertainment", "Movies, games and outings", "Ticket", "#e0621d"),
    ("Investments", "Contributions and returns", "PiggyBank", "#2f9e44"),
    ("Groceries", "Supermarket shopping", "ShoppingCart", "#d99006"),
    ("Salary", "Monthly pay and bonuses", "Wallet", "#2f9e44"),
    ("Health", "Medicine, appointments and tests", "Heart", "#c9366e"),
    ("Transport", "Fuel, public transport and travel", "Car", "#3b5bdb"),
    ("Utilities", "Power, water, internet and phone", "Receipt", "#d99006"),
];

/// (days ago, description, amount, type, category name)
const TRANSACTIONS: [(i64, &str, f64, TransactionType, &str); 16] = [
    (60, "Dinner out", 89.5, TransactionType::Expense, "Food"),
    (59, "Petrol", 100.0, TransactionType::Expense, "Transport"),
    (58, "Weekly shop", 156.8, TransactionType::Expense, "Groceries"),
    (56, "Dividends", 340.25, TransactionType::Income, "Investments"),
    (56, "Rent", 1700.0, TransactionType::Expense, "Utilities"),
    (54, "Freelance job", 2500.0, TransactionType::Income, "Salary"),
    (52, "Dinner party shopping", 150.0, TransactionType::Expense, "Groceries"),
    (48, "Cinema", 88.0, TransactionType::Expense, "Entertainment"),
    (35, "Monthly salary", 5000.0, TransactionType::Income, "Salary"),
    (34, "Power bill", 180.5, TransactionType::Expense, "Utilities"),
    (33, "Internet", 99.9, TransactionType::Expense, "Utilities"),
    (32, "Supermarket", 320.75, TransactionType::Expense, "Groceries"),
    (30, "Pharmacy", 125.3, TransactionType::Expense, "Health"),
    (28, "Taxi", 45.8, TransactionType::Expense, "Transport"),
    (5, "Monthly salary", 5000.0, TransactionType::Income, "Salary"),
    (2, "Lunch", 24.0, TransactionType::Expense, "Food"),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(TEST_PASSWORD),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user("Demo User", Email::new(TEST_EMAIL)?, password_hash, &conn)?;

    println!("Creating categories...");

    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (name, description, icon, color) in CATEGORIES {
        let category = create_category(
            NewCategory {
                name: CategoryName::new(name)?,
                description: Some(description.to_owned()),
                icon: icon.to_owned(),
                color: color.to_owned(),
            },
            user.id,
            &conn,
        )?;
        category_ids.push((name, category.id));
    }

    println!("Creating transactions...");

    let today = OffsetDateTime::now_utc().date();
    for (days_ago, description, amount, transaction_type, category_name) in TRANSACTIONS {
        let category_id = category_ids
            .iter()
            .find(|(name, _)| *name == category_name)
            .map(|(_, id)| *id);

        create_transaction(
            Transaction::build(amount, today - Duration::days(days_ago), transaction_type)
                .description(Some(description.to_owned()))
                .category_id(category_id),
            user.id,
            &conn,
        )?;
    }

    println!("Success! Log in with {TEST_EMAIL} and the password \"{TEST_PASSWORD}\".");

    Ok(())
}
