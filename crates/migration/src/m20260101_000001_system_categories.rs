//! Seeds the system categories shared by every user.

use sea_orm::{ConnectionTrait, Statement, Value};
use sea_orm_migration::prelude::*;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use super::m20260101_000000_init::Categories;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (name, icon, color)
const SYSTEM_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Salary", "briefcase", "#2e7d32"),
    ("Food & Dining", "utensils", "#ef6c00"),
    ("Transport", "car", "#1565c0"),
    ("Housing", "home", "#6d4c41"),
    ("Utilities", "bolt", "#f9a825"),
    ("Entertainment", "film", "#8e24aa"),
    ("Health", "heart", "#c62828"),
    ("Shopping", "shopping-bag", "#d81b60"),
    ("Education", "book", "#00838f"),
    ("Travel", "plane", "#0277bd"),
    ("Investments", "chart-line", "#558b2f"),
    ("Other", "tag", "#757575"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();
        for (name, icon, color) in SYSTEM_CATEGORIES {
            let values = vec![
                Uuid::new_v4().as_bytes().to_vec().into(),
                ToString::to_string(name).into(),
                name_norm(name).into(),
                ToString::to_string(icon).into(),
                ToString::to_string(color).into(),
                Value::Bool(Some(true)),
            ];
            db.execute(Statement::from_sql_and_values(
                backend,
                "INSERT INTO categories (id, user_id, name, name_norm, icon, color, parent_id, is_system) \
                 VALUES (?, NULL, ?, ?, ?, ?, NULL, ?);",
                values,
            ))
            .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Categories::Table)
                    .and_where(Expr::col(Categories::IsSystem).eq(true))
                    .and_where(Expr::col(Categories::UserId).is_null())
                    .to_owned(),
            )
            .await
    }
}

/// Same key the engine uses for duplicate-name checks.
fn name_norm(name: &str) -> String {
    let stripped: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_names_are_unique_once_normalized() {
        let mut keys: Vec<String> = SYSTEM_CATEGORIES
            .iter()
            .map(|(name, _, _)| name_norm(name))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), SYSTEM_CATEGORIES.len());
        assert_eq!(name_norm("  Food  &   Dining "), "food & dining");
    }
}
