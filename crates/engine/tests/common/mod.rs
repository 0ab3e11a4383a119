#![allow(dead_code)]

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement, Value};
use tempfile::TempDir;
use uuid::Uuid;

use engine::Engine;
use migration::MigratorTrait;

pub const USER: &str = "alice";
pub const OTHER_USER: &str = "bob";

/// One user with one member, two IDR accounts and two categories.
pub struct Household {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub member: Uuid,
    /// Opens with 100.00.
    pub bank: Uuid,
    /// Opens with 10.00.
    pub cash: Uuid,
    pub food: Uuid,
    pub salary: Uuid,
}

/// A second user's records, used to check isolation.
pub struct Stranger {
    pub member: Uuid,
    pub account: Uuid,
    pub category: Uuid,
}

pub async fn household() -> Household {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    seed_household(db).await
}

/// Same as [`household`], backed by a file so the pool holds several
/// connections. Keep the directory alive for the duration of the test.
pub async fn household_on_disk() -> (Household, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("dompet.db").display());
    let db = Database::connect(&url).await.unwrap();
    (seed_household(db).await, dir)
}

async fn seed_household(db: DatabaseConnection) -> Household {
    migration::Migrator::up(&db, None).await.unwrap();

    seed_user(&db, USER).await;
    let member = seed_member(&db, USER, "Alice").await;
    let bank = seed_account(&db, member, "BCA", "bank", 10_000, "IDR").await;
    let cash = seed_account(&db, member, "Wallet", "cash", 1_000, "IDR").await;
    let food = seed_category(&db, USER, "Food", "expense").await;
    let salary = seed_category(&db, USER, "Salary", "income").await;

    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    Household {
        engine,
        db,
        member,
        bank,
        cash,
        food,
        salary,
    }
}

pub async fn stranger(db: &DatabaseConnection) -> Stranger {
    seed_user(db, OTHER_USER).await;
    let member = seed_member(db, OTHER_USER, "Bob").await;
    let account = seed_account(db, member, "Mandiri", "bank", 50_000, "IDR").await;
    let category = seed_category(db, OTHER_USER, "Rent", "expense").await;
    Stranger {
        member,
        account,
        category,
    }
}

async fn exec(db: &DatabaseConnection, sql: &str, values: Vec<Value>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(backend, sql, values))
        .await
        .unwrap();
}

pub async fn seed_user(db: &DatabaseConnection, user_id: &str) {
    exec(
        db,
        "INSERT INTO users (id, name) VALUES (?, ?)",
        vec![user_id.into(), user_id.into()],
    )
    .await;
}

pub async fn seed_member(db: &DatabaseConnection, user_id: &str, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    exec(
        db,
        "INSERT INTO members (id, user_id, name) VALUES (?, ?, ?)",
        vec![id.into(), user_id.into(), name.into()],
    )
    .await;
    id
}

pub async fn seed_account(
    db: &DatabaseConnection,
    member_id: Uuid,
    name: &str,
    kind: &str,
    balance_minor: i64,
    currency: &str,
) -> Uuid {
    let id = Uuid::new_v4();
    exec(
        db,
        "INSERT INTO accounts (id, member_id, name, kind, balance_minor, currency) \
         VALUES (?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            member_id.into(),
            name.into(),
            kind.into(),
            balance_minor.into(),
            currency.into(),
        ],
    )
    .await;
    id
}

pub async fn seed_category(db: &DatabaseConnection, user_id: &str, name: &str, kind: &str) -> Uuid {
    let id = Uuid::new_v4();
    exec(
        db,
        "INSERT INTO categories (id, user_id, name, kind) VALUES (?, ?, ?, ?)",
        vec![id.into(), user_id.into(), name.into(), kind.into()],
    )
    .await;
    id
}

/// Reads the stored balance without going through the engine.
pub async fn raw_balance(db: &DatabaseConnection, account_id: Uuid) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT balance_minor FROM accounts WHERE id = ?",
            vec![account_id.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "balance_minor").unwrap()
}

pub async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}

/// Writes a balance directly, bypassing the engine and its audit log.
pub async fn tamper_balance(db: &DatabaseConnection, account_id: Uuid, delta_minor: i64) {
    exec(
        db,
        "UPDATE accounts SET balance_minor = balance_minor + ? WHERE id = ?",
        vec![delta_minor.into(), account_id.into()],
    )
    .await;
}
