use super::status::BundleStatus;
use chrono::Utc;
use refund_audit_entity::processed_bundles::{ActiveModel, Column, Entity, Model};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

pub async fn status(
    db: &impl ConnectionTrait,
    bundle_id: &str,
    block_number: u64,
) -> Result<Option<BundleStatus>, sea_orm::DbErr> {
    let row = Entity::find()
        .filter(Column::BundleId.eq(bundle_id))
        .filter(Column::BlockNumber.eq(block_number as i64))
        .one(db)
        .await?;
    Ok(row.and_then(|m| BundleStatus::parse(&m.status)))
}

/// Upserts a bundle's status, honouring the sticky-terminal invariant (section 3): once a
/// key is in a terminal state, later non-terminal observations are no-ops.
pub async fn upsert_status(
    db: &impl ConnectionTrait,
    bundle_id: &str,
    block_number: u64,
    status: BundleStatus,
    violation_detected: bool,
) -> Result<(), sea_orm::DbErr> {
    if let Some(existing) = status_model(db, bundle_id, block_number).await? {
        if BundleStatus::parse(&existing.status)
            .map(|s| s.is_terminal())
            .unwrap_or(false)
            && !status.is_terminal()
        {
            return Ok(());
        }
        let mut active: ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.violation_detected = Set(violation_detected);
        active.processed_at = Set(Utc::now());
        active.update(db).await?;
        return Ok(());
    }

    let model = Model {
        bundle_id: bundle_id.to_string(),
        block_number: block_number as i64,
        status: status.as_str().to_string(),
        violation_detected,
        processed_at: Utc::now(),
    };
    Entity::insert(ActiveModel::from(model)).exec(db).await?;
    Ok(())
}

async fn status_model(
    db: &impl ConnectionTrait,
    bundle_id: &str,
    block_number: u64,
) -> Result<Option<Model>, sea_orm::DbErr> {
    Entity::find()
        .filter(Column::BundleId.eq(bundle_id))
        .filter(Column::BlockNumber.eq(block_number as i64))
        .one(db)
        .await
}

/// All `processed_bundles` rows for a block, consulted by ingestion to confirm which
/// bundles the store itself has already reached `simulated` for before the combination
/// search is allowed to reuse a cached refund for one.
pub async fn for_block(
    db: &impl ConnectionTrait,
    block_number: u64,
) -> Result<Vec<Model>, sea_orm::DbErr> {
    Entity::find()
        .filter(Column::BlockNumber.eq(block_number as i64))
        .all(db)
        .await
}
