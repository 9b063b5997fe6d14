//! In-memory registry for development and testing

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::endpoint::{Endpoint, EndpointId, EndpointRepository, EndpointStatus};
use crate::domain::identity::{Identity, IdentityId, IdentityRepository};
use crate::domain::repositories::RepositoryProvider;
use crate::domain::{DomainError, DomainResult};
use crate::shared::validate_url;

/// DashMap-backed endpoint registry.
///
/// `set_status` only takes the row's shard lock. Structural changes
/// (`add`, `remove`, `rename`) and `list_all` serialise on `structure` so
/// the (owner, url) uniqueness check and the snapshot stay consistent.
pub struct InMemoryEndpointRepository {
    rows: DashMap<EndpointId, Endpoint>,
    next_id: AtomicI32,
    structure: Mutex<()>,
}

impl InMemoryEndpointRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI32::new(1),
            structure: Mutex::new(()),
        }
    }

    fn find_id(&self, owner: IdentityId, url: &str) -> Option<EndpointId> {
        self.rows
            .iter()
            .find(|e| e.owner == owner && e.url == url)
            .map(|e| e.id)
    }

    fn sorted(&self, filter: impl Fn(&Endpoint) -> bool) -> Vec<Endpoint> {
        let mut out: Vec<Endpoint> = self
            .rows
            .iter()
            .filter(|e| filter(e.value()))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|e| e.id);
        out
    }
}

impl Default for InMemoryEndpointRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EndpointRepository for InMemoryEndpointRepository {
    async fn add(&self, owner: IdentityId, url: &str) -> DomainResult<Endpoint> {
        let url = validate_url(url)?;
        let _guard = self.structure.lock().await;

        if self.find_id(owner, &url).is_some() {
            return Err(DomainError::Duplicate(format!(
                "{} is already watched by {}",
                url, owner
            )));
        }

        let endpoint = Endpoint {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            url,
            owner,
            status: EndpointStatus::Unknown,
            created_at: Utc::now(),
            status_changed_at: None,
        };
        self.rows.insert(endpoint.id, endpoint.clone());
        Ok(endpoint)
    }

    async fn remove(&self, owner: IdentityId, url: &str) -> DomainResult<bool> {
        let _guard = self.structure.lock().await;
        Ok(match self.find_id(owner, url.trim()) {
            Some(id) => self.rows.remove(&id).is_some(),
            None => false,
        })
    }

    async fn rename(
        &self,
        owner: IdentityId,
        old_url: &str,
        new_url: &str,
    ) -> DomainResult<bool> {
        let new_url = validate_url(new_url)?;
        let _guard = self.structure.lock().await;

        let Some(id) = self.find_id(owner, old_url.trim()) else {
            return Ok(false);
        };
        if matches!(self.find_id(owner, &new_url), Some(other) if other != id) {
            return Err(DomainError::Duplicate(format!(
                "{} is already watched by {}",
                new_url, owner
            )));
        }

        Ok(match self.rows.get_mut(&id) {
            Some(mut row) => {
                row.url = new_url;
                row.status = EndpointStatus::Unknown;
                row.status_changed_at = Some(Utc::now());
                true
            }
            None => false,
        })
    }

    async fn list_for(&self, owner: IdentityId) -> DomainResult<Vec<Endpoint>> {
        Ok(self.sorted(|e| e.owner == owner))
    }

    async fn list_all(&self) -> DomainResult<Vec<Endpoint>> {
        let _guard = self.structure.lock().await;
        Ok(self.sorted(|_| true))
    }

    async fn set_status(
        &self,
        id: EndpointId,
        status: EndpointStatus,
    ) -> DomainResult<EndpointStatus> {
        let mut row = self.rows.get_mut(&id).ok_or_else(|| DomainError::NotFound {
            entity: "Endpoint",
            field: "id",
            value: id.to_string(),
        })?;

        Ok(write_status(&mut row, status))
    }

    async fn set_status_if_url(
        &self,
        id: EndpointId,
        url: &str,
        status: EndpointStatus,
    ) -> DomainResult<Option<EndpointStatus>> {
        let mut row = self.rows.get_mut(&id).ok_or_else(|| DomainError::NotFound {
            entity: "Endpoint",
            field: "id",
            value: id.to_string(),
        })?;

        if row.url != url {
            return Ok(None);
        }
        Ok(Some(write_status(&mut row, status)))
    }
}

/// Returns the status the row held before.
fn write_status(row: &mut Endpoint, status: EndpointStatus) -> EndpointStatus {
    let previous = row.status;
    row.status = status;
    if previous != status {
        row.status_changed_at = Some(Utc::now());
    }
    previous
}

#[derive(Default)]
pub struct InMemoryIdentityRepository {
    identities: DashMap<IdentityId, Identity>,
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn upsert(&self, identity: Identity) -> DomainResult<()> {
        self.identities.insert(identity.id, identity);
        Ok(())
    }

    async fn find(&self, id: IdentityId) -> DomainResult<Option<Identity>> {
        Ok(self.identities.get(&id).map(|i| i.clone()))
    }
}

/// Non-persistent provider, selected with `database.in_memory = true`
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    endpoints: InMemoryEndpointRepository,
    identities: InMemoryIdentityRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn endpoints(&self) -> &dyn EndpointRepository {
        &self.endpoints
    }

    fn identities(&self) -> &dyn IdentityRepository {
        &self.identities
    }
}
