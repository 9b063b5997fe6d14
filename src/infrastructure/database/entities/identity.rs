//! Identity entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "identities")]
pub struct Model {
    /// Chat id assigned by the messenger, not generated here
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    #[sea_orm(nullable)]
    pub username: Option<String>,

    pub display_name: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
