//! The idempotent work-tracking store shared by every component (section 3, 5): SQLite
//! opened in write-ahead mode so that status lookups are never blocked by a writer, and
//! accessed through short transactions, one upsert per commit.

pub mod block_data;
pub mod bundles;
pub mod status;
pub mod transactions;

pub use status::{BundleStatus, TransactionStatus};

use refund_audit_migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct Store {
    db: Arc<DatabaseConnection>,
}

impl Store {
    pub async fn open(database_file: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = database_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let url = format!("sqlite://{}?mode=rwc", database_file.display());
        let db = Database::connect(&url).await?;
        db.execute(Statement::from_string(
            db.get_database_backend(),
            "PRAGMA journal_mode=WAL;".to_string(),
        ))
        .await?;
        Migrator::up(&db, None).await?;
        Ok(Self { db: Arc::new(db) })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let db = Database::connect("sqlite::memory:").await?;
        Migrator::up(&db, None).await?;
        Ok(Self { db: Arc::new(db) })
    }

    pub async fn highest_ingested_block(&self) -> anyhow::Result<Option<u64>> {
        Ok(block_data::highest_ingested(self.db.as_ref()).await?)
    }

    pub async fn upsert_block_data(
        &self,
        block_number: u64,
        transaction_count: usize,
        is_simulated: bool,
    ) -> anyhow::Result<()> {
        block_data::upsert(self.db.as_ref(), block_number, transaction_count, is_simulated)
            .await?;
        Ok(())
    }

    pub async fn mark_block_simulated(&self, block_number: u64) -> anyhow::Result<()> {
        block_data::mark_simulated(self.db.as_ref(), block_number).await?;
        Ok(())
    }

    pub async fn bundle_status(
        &self,
        bundle_id: &str,
        block_number: u64,
    ) -> anyhow::Result<Option<BundleStatus>> {
        Ok(bundles::status(self.db.as_ref(), bundle_id, block_number).await?)
    }

    pub async fn upsert_bundle_status(
        &self,
        bundle_id: &str,
        block_number: u64,
        status: BundleStatus,
        violation_detected: bool,
    ) -> anyhow::Result<()> {
        bundles::upsert_status(
            self.db.as_ref(),
            bundle_id,
            block_number,
            status,
            violation_detected,
        )
        .await?;
        Ok(())
    }

    pub async fn bundles_for_block(
        &self,
        block_number: u64,
    ) -> anyhow::Result<Vec<refund_audit_entity::processed_bundles::Model>> {
        Ok(bundles::for_block(self.db.as_ref(), block_number).await?)
    }

    pub async fn transaction_status(
        &self,
        tx_hash: &str,
    ) -> anyhow::Result<Option<TransactionStatus>> {
        Ok(transactions::status(self.db.as_ref(), tx_hash).await?)
    }

    pub async fn upsert_transaction_status(
        &self,
        tx_hash: &str,
        bundle_id: &str,
        block_number: u64,
        status: TransactionStatus,
        is_backrun: bool,
    ) -> anyhow::Result<()> {
        transactions::upsert_status(
            self.db.as_ref(),
            tx_hash,
            bundle_id,
            block_number,
            status,
            is_backrun,
        )
        .await?;
        Ok(())
    }
}
