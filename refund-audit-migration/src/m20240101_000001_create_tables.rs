use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            CREATE TABLE "block_data" (
                "block_number" BIGINT PRIMARY KEY,
                "transaction_count" INTEGER NOT NULL,
                "is_simulated" BOOLEAN NOT NULL DEFAULT FALSE
            );

            CREATE TABLE "processed_bundles" (
                "bundle_id" TEXT NOT NULL,
                "block_number" BIGINT NOT NULL,
                "status" TEXT NOT NULL,
                "violation_detected" BOOLEAN NOT NULL DEFAULT FALSE,
                "processed_at" TIMESTAMP NOT NULL,
                PRIMARY KEY ("bundle_id", "block_number")
            );

            CREATE TABLE "processed_transactions" (
                "tx_hash" TEXT PRIMARY KEY,
                "bundle_id" TEXT NOT NULL,
                "block_number" BIGINT NOT NULL,
                "status" TEXT NOT NULL,
                "is_backrun" BOOLEAN NOT NULL DEFAULT FALSE,
                "processed_at" TIMESTAMP NOT NULL
            );

            CREATE INDEX "idx_processed_bundles_block_number" ON "processed_bundles" ("block_number");
            CREATE INDEX "idx_processed_transactions_block_number" ON "processed_transactions" ("block_number");
        "#;
        crate::from_sql(manager, sql).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            DROP TABLE "processed_transactions";
            DROP TABLE "processed_bundles";
            DROP TABLE "block_data";
        "#;
        crate::from_sql(manager, sql).await
    }
}
