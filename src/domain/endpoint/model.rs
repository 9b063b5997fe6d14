//! Endpoint domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::IdentityId;

pub type EndpointId = i32;

/// Last-known reachability of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    /// Never probed, or reset by a rename
    #[default]
    Unknown,
    Online,
    Offline,
}

impl EndpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EndpointStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

/// A monitored URL owned by an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub id: EndpointId,
    pub url: String,
    pub owner: IdentityId,
    pub status: EndpointStatus,
    pub created_at: DateTime<Utc>,
    /// When `status` last changed value
    pub status_changed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_storage_strings() {
        for status in [
            EndpointStatus::Unknown,
            EndpointStatus::Online,
            EndpointStatus::Offline,
        ] {
            assert_eq!(EndpointStatus::from(status.as_str()), status);
        }
    }

    #[test]
    fn unrecognised_status_reads_as_unknown() {
        assert_eq!(EndpointStatus::from("Online"), EndpointStatus::Online);
        assert_eq!(EndpointStatus::from("garbage"), EndpointStatus::Unknown);
    }
}
