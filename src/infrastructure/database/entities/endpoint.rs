//! Endpoint entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "endpoints")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub url: String,

    /// Status: unknown, online, offline
    pub status: String,

    pub owner_id: i64,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub status_changed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
