#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{AccountKind, Category, Currency, Engine, NewAccountCmd, User};
use migration::MigratorTrait;
use uuid::Uuid;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .password_iterations(1_000)
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn register(engine: &Engine, email: &str) -> User {
    engine
        .register(email, "correct horse", None, Some(Currency::Eur))
        .await
        .unwrap()
}

pub async fn checking(engine: &Engine, user_id: Uuid, name: &str, balance_minor: i64) -> Uuid {
    engine
        .new_account(
            user_id,
            NewAccountCmd::new(name, AccountKind::Checking, Currency::Eur).balance_minor(balance_minor),
        )
        .await
        .unwrap()
        .id
}

pub async fn balance(engine: &Engine, user_id: Uuid, account_id: Uuid) -> i64 {
    engine.account(user_id, account_id).await.unwrap().balance_minor
}

pub async fn system_category(engine: &Engine, user_id: Uuid, name: &str) -> Category {
    engine
        .categories(user_id)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.is_system && c.name == name)
        .unwrap_or_else(|| panic!("system category {name} missing"))
}

pub fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}
