use super::status::TransactionStatus;
use chrono::Utc;
use refund_audit_entity::processed_transactions::{ActiveModel, Entity, Model};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};

pub async fn status(
    db: &impl ConnectionTrait,
    tx_hash: &str,
) -> Result<Option<TransactionStatus>, sea_orm::DbErr> {
    let row = Entity::find_by_id(tx_hash.to_string()).one(db).await?;
    Ok(row.and_then(|m| TransactionStatus::parse(&m.status)))
}

/// Upserts a transaction's status, honouring the same sticky-terminal invariant as
/// bundles (section 3 / 8): at most one row per hash, status monotonic toward a
/// terminal value.
pub async fn upsert_status(
    db: &impl ConnectionTrait,
    tx_hash: &str,
    bundle_id: &str,
    block_number: u64,
    status: TransactionStatus,
    is_backrun: bool,
) -> Result<(), sea_orm::DbErr> {
    if let Some(existing) = Entity::find_by_id(tx_hash.to_string()).one(db).await? {
        let accepts = TransactionStatus::parse(&existing.status)
            .map(|s| s.accepts_transition(status))
            .unwrap_or(true);
        if !accepts {
            return Ok(());
        }
        let mut active: ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.bundle_id = Set(bundle_id.to_string());
        active.block_number = Set(block_number as i64);
        active.is_backrun = Set(is_backrun);
        active.processed_at = Set(Utc::now());
        active.update(db).await?;
        return Ok(());
    }

    let model = Model {
        tx_hash: tx_hash.to_string(),
        bundle_id: bundle_id.to_string(),
        block_number: block_number as i64,
        status: status.as_str().to_string(),
        is_backrun,
        processed_at: Utc::now(),
    };
    Entity::insert(ActiveModel::from(model)).exec(db).await?;
    Ok(())
}
