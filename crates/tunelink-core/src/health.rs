//! Startup reachability check.

use std::time::Duration;

use crate::gateway::PlayerGateway;

/// Fixed-interval poll with a max-attempts cutoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(1),
        }
    }
}

/// Poll the backend until it answers. Each attempt waits one interval first.
pub async fn wait_for_backend(gateway: &dyn PlayerGateway, policy: HealthPolicy) -> bool {
    for attempt in 1..=policy.attempts {
        tokio::time::sleep(policy.interval).await;
        if gateway.ping().await {
            tracing::info!(attempt, "backend is reachable");
            return true;
        }
        tracing::debug!(attempt, max = policy.attempts, "backend not reachable yet");
    }
    tracing::warn!(attempts = policy.attempts, "backend never became reachable");
    false
}
