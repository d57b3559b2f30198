use refund_audit_entity::block_data::{ActiveModel, Column, Entity, Model};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder,
    QuerySelect,
};

pub async fn upsert(
    db: &impl ConnectionTrait,
    block_number: u64,
    transaction_count: usize,
    is_simulated: bool,
) -> Result<(), sea_orm::DbErr> {
    let model = Model {
        block_number: block_number as i64,
        transaction_count: transaction_count as i32,
        is_simulated,
    };
    let active: ActiveModel = model.into();

    Entity::insert(active)
        .on_conflict(
            OnConflict::column(Column::BlockNumber)
                .update_columns([Column::TransactionCount, Column::IsSimulated])
                .to_owned(),
        )
        .exec(db)
        .await?;
    Ok(())
}

pub async fn mark_simulated(
    db: &impl ConnectionTrait,
    block_number: u64,
) -> Result<(), sea_orm::DbErr> {
    if let Some(model) = Entity::find_by_id(block_number as i64).one(db).await? {
        let mut active: ActiveModel = model.into();
        active.is_simulated = sea_orm::Set(true);
        active.update(db).await?;
    }
    Ok(())
}

/// The highest already-ingested block number, used by the ingestion pipeline to resume
/// (section 4.3). `None` means the persistence store is empty.
pub async fn highest_ingested(db: &impl ConnectionTrait) -> Result<Option<u64>, sea_orm::DbErr> {
    let row = Entity::find()
        .order_by_desc(Column::BlockNumber)
        .limit(1)
        .one(db)
        .await?;
    Ok(row.map(|m| m.block_number as u64))
}
