//! SeaORM implementation of EndpointRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::debug;

use crate::domain::endpoint::{Endpoint, EndpointId, EndpointRepository, EndpointStatus};
use crate::domain::identity::IdentityId;
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::endpoint;
use crate::shared::validate_url;

pub struct SeaOrmEndpointRepository {
    db: DatabaseConnection,
}

impl SeaOrmEndpointRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn endpoint_from_model(model: endpoint::Model) -> Endpoint {
    Endpoint {
        id: model.id,
        url: model.url,
        owner: IdentityId(model.owner_id),
        status: EndpointStatus::from(model.status.as_str()),
        created_at: model.created_at,
        status_changed_at: model.status_changed_at,
    }
}

/// The unique index on (owner_id, url) is the final word on duplicates;
/// the pre-check in `add` only gives a nicer error in the common case.
fn write_err(e: DbErr, owner: IdentityId, url: &str) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate(owner, url),
        _ => DomainError::Persistence(e),
    }
}

fn duplicate(owner: IdentityId, url: &str) -> DomainError {
    DomainError::Duplicate(format!("{} is already watched by {}", url, owner))
}

// ── EndpointRepository impl ─────────────────────────────────────

#[async_trait]
impl EndpointRepository for SeaOrmEndpointRepository {
    async fn add(&self, owner: IdentityId, url: &str) -> DomainResult<Endpoint> {
        let url = validate_url(url)?;
        debug!(owner = %owner, url = %url, "Adding endpoint");

        let existing = endpoint::Entity::find()
            .filter(endpoint::Column::OwnerId.eq(owner.0))
            .filter(endpoint::Column::Url.eq(url.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(duplicate(owner, &url));
        }

        let model = endpoint::ActiveModel {
            id: NotSet,
            url: Set(url.clone()),
            status: Set(EndpointStatus::Unknown.to_string()),
            owner_id: Set(owner.0),
            created_at: Set(Utc::now()),
            status_changed_at: Set(None),
        };
        let saved = model
            .insert(&self.db)
            .await
            .map_err(|e| write_err(e, owner, &url))?;

        Ok(endpoint_from_model(saved))
    }

    async fn remove(&self, owner: IdentityId, url: &str) -> DomainResult<bool> {
        let result = endpoint::Entity::delete_many()
            .filter(endpoint::Column::OwnerId.eq(owner.0))
            .filter(endpoint::Column::Url.eq(url.trim()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn rename(
        &self,
        owner: IdentityId,
        old_url: &str,
        new_url: &str,
    ) -> DomainResult<bool> {
        let new_url = validate_url(new_url)?;

        let result = endpoint::Entity::update_many()
            .col_expr(endpoint::Column::Url, Expr::value(new_url.clone()))
            .col_expr(
                endpoint::Column::Status,
                Expr::value(EndpointStatus::Unknown.to_string()),
            )
            .col_expr(endpoint::Column::StatusChangedAt, Expr::value(Utc::now()))
            .filter(endpoint::Column::OwnerId.eq(owner.0))
            .filter(endpoint::Column::Url.eq(old_url.trim()))
            .exec(&self.db)
            .await
            .map_err(|e| write_err(e, owner, &new_url))?;

        Ok(result.rows_affected > 0)
    }

    async fn list_for(&self, owner: IdentityId) -> DomainResult<Vec<Endpoint>> {
        let models = endpoint::Entity::find()
            .filter(endpoint::Column::OwnerId.eq(owner.0))
            .order_by_asc(endpoint::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(endpoint_from_model).collect())
    }

    async fn list_all(&self) -> DomainResult<Vec<Endpoint>> {
        let models = endpoint::Entity::find()
            .order_by_asc(endpoint::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(endpoint_from_model).collect())
    }

    async fn set_status(
        &self,
        id: EndpointId,
        status: EndpointStatus,
    ) -> DomainResult<EndpointStatus> {
        self.write_status(id, None, status)
            .await
            .map(|previous| previous.unwrap_or(status))
    }

    async fn set_status_if_url(
        &self,
        id: EndpointId,
        url: &str,
        status: EndpointStatus,
    ) -> DomainResult<Option<EndpointStatus>> {
        self.write_status(id, Some(url), status).await
    }
}

impl SeaOrmEndpointRepository {
    /// Read-modify-write of one row in a transaction. `None` means the
    /// row no longer matches `expected_url` and nothing was written.
    async fn write_status(
        &self,
        id: EndpointId,
        expected_url: Option<&str>,
        status: EndpointStatus,
    ) -> DomainResult<Option<EndpointStatus>> {
        let txn = self.db.begin().await?;

        let row = endpoint::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Endpoint",
                field: "id",
                value: id.to_string(),
            })?;

        if expected_url.is_some_and(|url| url != row.url) {
            txn.rollback().await?;
            return Ok(None);
        }

        let previous = EndpointStatus::from(row.status.as_str());
        let mut active: endpoint::ActiveModel = row.into();
        active.status = Set(status.to_string());
        if previous != status {
            active.status_changed_at = Set(Some(Utc::now()));
        }
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(Some(previous))
    }
}
