//! SeaORM implementation of IdentityRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::domain::identity::{Identity, IdentityId, IdentityRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::identity;

pub struct SeaOrmIdentityRepository {
    db: DatabaseConnection,
}

impl SeaOrmIdentityRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityRepository for SeaOrmIdentityRepository {
    async fn upsert(&self, identity: Identity) -> DomainResult<()> {
        let now = Utc::now();
        let model = identity::ActiveModel {
            id: Set(identity.id.0),
            username: Set(identity.username),
            display_name: Set(identity.display_name),
            created_at: Set(now),
            updated_at: Set(now),
        };

        identity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(identity::Column::Id)
                    .update_columns([
                        identity::Column::Username,
                        identity::Column::DisplayName,
                        identity::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn find(&self, id: IdentityId) -> DomainResult<Option<Identity>> {
        let model = identity::Entity::find_by_id(id.0).one(&self.db).await?;
        Ok(model.map(|m| Identity {
            id: IdentityId(m.id),
            username: m.username,
            display_name: m.display_name,
        }))
    }
}
