//! Executes chat commands against the registry and renders replies

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::command::Command;
use crate::domain::{DomainError, Endpoint, EndpointStatus, Identity, RepositoryProvider};
use crate::shared::validate_url;

pub struct CommandHandler {
    repos: Arc<dyn RepositoryProvider>,
    /// Poll interval, quoted back to users when they register a site
    interval: Duration,
}

impl CommandHandler {
    pub fn new(repos: Arc<dyn RepositoryProvider>, interval: Duration) -> Self {
        Self { repos, interval }
    }

    /// Upsert the sender, run the command, and return the reply text.
    pub async fn handle(&self, identity: &Identity, text: &str) -> String {
        if let Err(e) = self.repos.identities().upsert(identity.clone()).await {
            // The endpoint rows only reference the id, so carry on.
            warn!(identity = %identity.id, error = %e, "Failed to upsert identity");
        }

        let command = Command::parse(text);
        info!(identity = %identity.id, command = ?command, "Handling chat command");

        match command {
            Command::Start => {
                "Hi! Send me a link and I will keep an eye on its availability.".to_string()
            }
            Command::Help => help_text(),
            Command::List => self.list(identity).await,
            Command::Delete { url } => self.delete(identity, &url).await,
            Command::Update { old_url, new_url } => {
                self.update(identity, &old_url, &new_url).await
            }
            Command::Register { url } => self.register(identity, &url).await,
            Command::Usage(usage) => format!("Usage: {}", usage),
            Command::Unknown(_) => {
                "Unknown command. Send /help for the list of commands.".to_string()
            }
        }
    }

    async fn list(&self, identity: &Identity) -> String {
        match self.repos.endpoints().list_for(identity.id).await {
            Ok(endpoints) if endpoints.is_empty() => "No sites found.".to_string(),
            Ok(endpoints) => endpoints
                .iter()
                .map(render_line)
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                log_failure(identity, "list endpoints", "", &e);
                "No sites found.".to_string()
            }
        }
    }

    async fn delete(&self, identity: &Identity, url: &str) -> String {
        match self.repos.endpoints().remove(identity.id, url).await {
            Ok(true) => format!("🗑️ Site {} removed.", url),
            Ok(false) => "Site not found.".to_string(),
            Err(e) => {
                log_failure(identity, "remove endpoint", url, &e);
                "Failed to remove the site.".to_string()
            }
        }
    }

    async fn update(&self, identity: &Identity, old_url: &str, new_url: &str) -> String {
        let Ok(new_url) = validate_url(new_url) else {
            return "The new URL must start with http:// or https://".to_string();
        };

        match self
            .repos
            .endpoints()
            .rename(identity.id, old_url, &new_url)
            .await
        {
            Ok(true) => format!("✏️ Site updated: {} → {}", old_url, new_url),
            Ok(false) => "Old URL not found.".to_string(),
            Err(DomainError::Duplicate(_)) => format!("You are already watching {}.", new_url),
            Err(e) => {
                log_failure(identity, "rename endpoint", old_url, &e);
                "Failed to update the URL.".to_string()
            }
        }
    }

    async fn register(&self, identity: &Identity, url: &str) -> String {
        let Ok(url) = validate_url(url) else {
            return "Please send a valid URL starting with http:// or https://".to_string();
        };

        match self.repos.endpoints().add(identity.id, &url).await {
            Ok(endpoint) => {
                info!(
                    identity = %identity.id,
                    endpoint_id = endpoint.id,
                    url = %endpoint.url,
                    "Endpoint registered"
                );
                format!(
                    "Added the site to your list! I will check it every {}.",
                    describe_interval(self.interval)
                )
            }
            Err(DomainError::Duplicate(_)) => "This site is already on your list.".to_string(),
            Err(e) => {
                log_failure(identity, "add endpoint", &url, &e);
                "Failed to add the URL.".to_string()
            }
        }
    }
}

/// Rejections the registry explains itself are warnings; the rest are
/// real failures.
fn log_failure(identity: &Identity, action: &str, url: &str, e: &DomainError) {
    if e.is_user_error() {
        warn!(identity = %identity.id, url, error = %e, "Could not {}", action);
    } else {
        error!(identity = %identity.id, url, error = %e, "Failed to {}", action);
    }
}

fn render_line(endpoint: &Endpoint) -> String {
    let marker = match endpoint.status {
        EndpointStatus::Online => "🟢 online",
        EndpointStatus::Offline => "🔴 down",
        EndpointStatus::Unknown => "⚪ not checked yet",
    };
    format!("{} — {}", endpoint.url, marker)
}

fn help_text() -> String {
    [
        "Send me a URL (http:// or https://) to start watching it.",
        "/list — your sites and their status",
        "/delete <url> — stop watching a site",
        "/update <old_url> <new_url> — change a watched URL",
    ]
    .join("\n")
}

fn describe_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    match secs {
        60 => "minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "second".to_string(),
        s => format!("{} seconds", s),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::{
        DomainResult, EndpointId, EndpointRepository, IdentityId, IdentityRepository,
    };
    use crate::infrastructure::storage::{
        InMemoryEndpointRepository, InMemoryIdentityRepository, InMemoryRepositoryProvider,
    };

    fn setup() -> (CommandHandler, Arc<InMemoryRepositoryProvider>, Identity) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let handler = CommandHandler::new(repos.clone(), Duration::from_secs(300));
        (handler, repos, Identity::new(100, "Ann").with_username("ann"))
    }

    #[tokio::test]
    async fn every_interaction_upserts_the_identity() {
        let (handler, repos, ann) = setup();
        handler.handle(&ann, "/start").await;

        let stored = repos.identities().find(IdentityId(100)).await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Ann");
        assert_eq!(stored.username.as_deref(), Some("ann"));
    }

    #[tokio::test]
    async fn register_then_list() {
        let (handler, _repos, ann) = setup();

        let reply = handler.handle(&ann, "https://example.com").await;
        assert_eq!(reply, "Added the site to your list! I will check it every 5 minutes.");

        let reply = handler.handle(&ann, "/list").await;
        assert_eq!(reply, "https://example.com — ⚪ not checked yet");
    }

    #[tokio::test]
    async fn invalid_url_never_reaches_the_registry() {
        let (handler, repos, ann) = setup();

        let reply = handler.handle(&ann, "ftp://x.com").await;
        assert!(reply.starts_with("Please send a valid URL"));
        assert!(repos.endpoints().list_all().await.unwrap().is_empty());
    }

    /// Registry that counts every write it is asked to make
    #[derive(Default)]
    struct CountingProvider {
        endpoints: CountingEndpoints,
        identities: InMemoryIdentityRepository,
    }

    #[derive(Default)]
    struct CountingEndpoints {
        inner: InMemoryEndpointRepository,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl EndpointRepository for CountingEndpoints {
        async fn add(&self, owner: IdentityId, url: &str) -> DomainResult<Endpoint> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.add(owner, url).await
        }
        async fn remove(&self, owner: IdentityId, url: &str) -> DomainResult<bool> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.remove(owner, url).await
        }
        async fn rename(&self, owner: IdentityId, old: &str, new: &str) -> DomainResult<bool> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.rename(owner, old, new).await
        }
        async fn list_for(&self, owner: IdentityId) -> DomainResult<Vec<Endpoint>> {
            self.inner.list_for(owner).await
        }
        async fn list_all(&self) -> DomainResult<Vec<Endpoint>> {
            self.inner.list_all().await
        }
        async fn set_status(
            &self,
            id: EndpointId,
            status: EndpointStatus,
        ) -> DomainResult<EndpointStatus> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_status(id, status).await
        }
        async fn set_status_if_url(
            &self,
            id: EndpointId,
            url: &str,
            status: EndpointStatus,
        ) -> DomainResult<Option<EndpointStatus>> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_status_if_url(id, url, status).await
        }
    }

    impl RepositoryProvider for CountingProvider {
        fn endpoints(&self) -> &dyn EndpointRepository {
            &self.endpoints
        }
        fn identities(&self) -> &dyn IdentityRepository {
            &self.identities
        }
    }

    #[tokio::test]
    async fn malformed_urls_are_rejected_before_any_registry_write() {
        let repos = Arc::new(CountingProvider::default());
        let handler = CommandHandler::new(repos.clone(), Duration::from_secs(300));
        let ann = Identity::new(100, "Ann");
        repos.endpoints().add(ann.id, "https://old.example").await.unwrap();
        let before = repos.endpoints.writes.load(Ordering::SeqCst);

        for text in ["ftp://x.com", "http://", "https://a b.example"] {
            assert_eq!(
                handler.handle(&ann, text).await,
                "Please send a valid URL starting with http:// or https://",
                "{}",
                text
            );
        }
        assert_eq!(
            handler
                .handle(&ann, "/update https://old.example ftp://new.example")
                .await,
            "The new URL must start with http:// or https://"
        );

        assert_eq!(repos.endpoints.writes.load(Ordering::SeqCst), before);
        let urls: Vec<_> = repos
            .endpoints()
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.url)
            .collect();
        assert_eq!(urls, vec!["https://old.example"]);
    }

    #[tokio::test]
    async fn urls_are_stored_trimmed() {
        let (handler, repos, ann) = setup();
        handler.handle(&ann, "  https://example.com  ").await;
        assert_eq!(
            repos.endpoints().list_all().await.unwrap()[0].url,
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn duplicate_registration_is_reported() {
        let (handler, _repos, ann) = setup();
        handler.handle(&ann, "https://example.com").await;
        let reply = handler.handle(&ann, "https://example.com").await;
        assert_eq!(reply, "This site is already on your list.");
    }

    #[tokio::test]
    async fn list_renders_status_markers() {
        let (handler, repos, ann) = setup();
        let up = repos.endpoints().add(ann.id, "https://up.example").await.unwrap();
        let down = repos.endpoints().add(ann.id, "https://down.example").await.unwrap();
        repos.endpoints().set_status(up.id, EndpointStatus::Online).await.unwrap();
        repos.endpoints().set_status(down.id, EndpointStatus::Offline).await.unwrap();

        let reply = handler.handle(&ann, "/list").await;
        assert_eq!(
            reply,
            "https://up.example — 🟢 online\nhttps://down.example — 🔴 down"
        );
    }

    #[tokio::test]
    async fn list_is_per_owner() {
        let (handler, _repos, ann) = setup();
        let bob = Identity::new(200, "Bob");
        handler.handle(&ann, "https://example.com").await;
        assert_eq!(handler.handle(&bob, "/list").await, "No sites found.");
    }

    #[tokio::test]
    async fn delete_flow() {
        let (handler, _repos, ann) = setup();
        handler.handle(&ann, "https://example.com").await;

        assert_eq!(
            handler.handle(&ann, "/delete https://example.com").await,
            "🗑️ Site https://example.com removed."
        );
        assert_eq!(
            handler.handle(&ann, "/delete https://example.com").await,
            "Site not found."
        );
        assert_eq!(handler.handle(&ann, "/delete").await, "Usage: /delete <url>");
    }

    #[tokio::test]
    async fn update_flow() {
        let (handler, repos, ann) = setup();
        handler.handle(&ann, "https://old.example").await;
        handler.handle(&ann, "https://taken.example").await;

        assert_eq!(
            handler
                .handle(&ann, "/update https://old.example ftp://new.example")
                .await,
            "The new URL must start with http:// or https://"
        );
        assert_eq!(
            handler
                .handle(&ann, "/update https://old.example https://taken.example")
                .await,
            "You are already watching https://taken.example."
        );
        assert_eq!(
            handler
                .handle(&ann, "/update https://nope.example https://new.example")
                .await,
            "Old URL not found."
        );
        assert_eq!(
            handler
                .handle(&ann, "/update https://old.example https://new.example")
                .await,
            "✏️ Site updated: https://old.example → https://new.example"
        );

        let urls: Vec<_> = repos
            .endpoints()
            .list_for(ann.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.url)
            .collect();
        assert_eq!(urls, vec!["https://new.example", "https://taken.example"]);
    }

    #[test]
    fn interval_wording() {
        assert_eq!(describe_interval(Duration::from_secs(300)), "5 minutes");
        assert_eq!(describe_interval(Duration::from_secs(60)), "minute");
        assert_eq!(describe_interval(Duration::from_secs(90)), "90 seconds");
    }
}
