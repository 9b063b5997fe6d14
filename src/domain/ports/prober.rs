//! Health probe port

use std::time::Duration;

use async_trait::async_trait;

/// Binary availability of an endpoint as seen by one probe.
///
/// DNS failures, refused connections, TLS errors, timeouts and non-2xx
/// responses all collapse into `Unreachable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reachable => "reachable",
            Self::Unreachable => "unreachable",
        }
    }
}

/// Performs a single reachability check. Implementations never retry and
/// must return within `timeout` even if the transport hangs.
#[async_trait]
pub trait HealthProber: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}
