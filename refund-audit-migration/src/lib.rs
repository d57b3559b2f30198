pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{Statement, TransactionTrait};

mod m20240101_000001_create_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_000001_create_tables::Migration)]
    }
}

pub async fn from_sql(manager: &SchemaManager<'_>, content: &str) -> Result<(), DbErr> {
    let txn = manager.get_connection().begin().await?;
    for stmt in content.split(';') {
        let stmt = stmt.trim();
        if stmt.is_empty() {
            continue;
        }
        txn.execute(Statement::from_string(
            manager.get_database_backend(),
            stmt.to_string(),
        ))
        .await
        .map_err(|e| DbErr::Migration(format!("{e}\nQuery: {stmt}")))?;
    }
    txn.commit().await
}
