use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "processed_bundles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub bundle_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub block_number: i64,
    pub status: String,
    pub violation_detected: bool,
    pub processed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
