//! Status transition engine
//!
//! [`decide`] is the pure state machine. [`TransitionEngine`] applies its
//! decisions: it is the only code that writes `Endpoint::status`.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::domain::{
    DomainResult, Endpoint, EndpointStatus, Notification, ProbeOutcome, RepositoryProvider,
};
use crate::notifications::{AlertEvent, Event, SharedEventBus, StatusChangedEvent};

/// What a single probe result means for an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub new_status: EndpointStatus,
    pub notify: bool,
}

/// Which transitions alert a human. Outages always do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyPolicy {
    /// Also alert on offline → online
    pub on_recovery: bool,
}

/// Decide with the default (outage-only) policy.
pub fn transition(endpoint: &Endpoint, outcome: ProbeOutcome) -> Decision {
    decide(endpoint.status, outcome, NotifyPolicy::default())
}

pub fn decide(current: EndpointStatus, outcome: ProbeOutcome, policy: NotifyPolicy) -> Decision {
    use crate::domain::EndpointStatus::*;

    match (outcome, current) {
        (ProbeOutcome::Reachable, Online) => Decision {
            new_status: Online,
            notify: false,
        },
        (ProbeOutcome::Reachable, Offline) => Decision {
            new_status: Online,
            notify: policy.on_recovery,
        },
        (ProbeOutcome::Reachable, Unknown) => Decision {
            new_status: Online,
            notify: false,
        },
        (ProbeOutcome::Unreachable, Offline) => Decision {
            new_status: Offline,
            notify: false,
        },
        (ProbeOutcome::Unreachable, Online | Unknown) => Decision {
            new_status: Offline,
            notify: true,
        },
    }
}

/// Result of applying one probe to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub decision: Decision,
    /// A status change was written and announced
    pub changed: bool,
    /// The alert that was published, if any
    pub alert: Option<Notification>,
}

impl Applied {
    fn unchanged(decision: Decision) -> Self {
        Self {
            decision,
            changed: false,
            alert: None,
        }
    }

    pub fn notified(&self) -> bool {
        self.alert.is_some()
    }
}

pub struct TransitionEngine {
    repos: Arc<dyn RepositoryProvider>,
    event_bus: SharedEventBus,
    policy: NotifyPolicy,
}

impl TransitionEngine {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        event_bus: SharedEventBus,
        policy: NotifyPolicy,
    ) -> Self {
        Self {
            repos,
            event_bus,
            policy,
        }
    }

    pub fn policy(&self) -> NotifyPolicy {
        self.policy
    }

    /// Apply `outcome` to `endpoint` as it was read when its probe was
    /// dispatched.
    ///
    /// The write only lands if the row still has the URL that was probed;
    /// a result for a renamed row is dropped. If the row already held the
    /// new status when written (an overlapping tick got there first),
    /// nothing is announced, so the same outage never alerts twice.
    pub async fn apply(
        &self,
        endpoint: &Endpoint,
        outcome: ProbeOutcome,
    ) -> DomainResult<Applied> {
        let decision = decide(endpoint.status, outcome, self.policy);

        if decision.new_status == endpoint.status {
            return Ok(Applied::unchanged(decision));
        }

        let stored = self
            .repos
            .endpoints()
            .set_status_if_url(endpoint.id, &endpoint.url, decision.new_status)
            .await?;

        let Some(stored) = stored else {
            debug!(
                endpoint_id = endpoint.id,
                url = %endpoint.url,
                "Endpoint renamed while its probe was in flight, result dropped"
            );
            return Ok(Applied::unchanged(decision));
        };

        if stored == decision.new_status {
            debug!(
                endpoint_id = endpoint.id,
                status = %stored,
                "Status already written by an overlapping tick"
            );
            return Ok(Applied::unchanged(decision));
        }
        if stored != endpoint.status {
            warn!(
                endpoint_id = endpoint.id,
                dispatched = %endpoint.status,
                stored = %stored,
                "Status moved while the probe was in flight"
            );
        }

        // Alert on what the row actually held, not on the dispatch snapshot.
        let notify = decide(stored, outcome, self.policy).notify;

        counter!("uptime_transitions_total", "to" => decision.new_status.as_str()).increment(1);
        info!(
            endpoint_id = endpoint.id,
            url = %endpoint.url,
            owner = %endpoint.owner,
            "📶 Status changed: {} → {}",
            stored,
            decision.new_status
        );

        let now = Utc::now();
        self.event_bus
            .publish(Event::EndpointStatusChanged(StatusChangedEvent {
                endpoint_id: endpoint.id,
                url: endpoint.url.clone(),
                owner: endpoint.owner,
                previous: stored,
                current: decision.new_status,
                timestamp: now,
            }));

        let mut alert = None;
        if notify {
            let event = AlertEvent {
                endpoint_id: endpoint.id,
                url: endpoint.url.clone(),
                owner: endpoint.owner,
                timestamp: now,
            };
            let event = match decision.new_status {
                EndpointStatus::Online => Event::EndpointRecovered(event),
                _ => Event::EndpointDown(event),
            };
            alert = event.notification();
            self.event_bus.publish(event);
        }

        Ok(Applied {
            decision,
            changed: true,
            alert,
        })
    }
}
