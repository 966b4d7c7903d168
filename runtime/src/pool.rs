//! Writer + replica pool set with health-probed, policy-resolved read
//! routing and failover (spec §4.6).

use crate::policy::{resolve_policy, PolicyRegistry, RoutingOverride};
use deadpool_postgres::{Object, Pool};
use erm_core::ErmError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Mirrors spec §3's `ReplicaPool.last-status = {checked-at, healthy, lag,
/// read-only, err}` as five independent fields, rather than folding
/// "probe succeeded" and "server reports a read-only standby" into one bool.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub checked_at: Option<Instant>,
    pub healthy: bool,
    pub lag: Duration,
    pub read_only: bool,
    pub err: Option<String>,
}

impl Default for HealthStatus {
    fn default() -> Self {
        HealthStatus { checked_at: None, healthy: false, lag: Duration::MAX, read_only: false, err: None }
    }
}

impl HealthStatus {
    fn is_stale(&self, interval: Duration) -> bool {
        match self.checked_at {
            None => true,
            Some(at) => at.elapsed() > interval,
        }
    }
}

/// Clamp a driver-reported lag into a `Duration`. Negative, NaN, infinite, or
/// otherwise unrepresentable readings collapse to `Duration::MAX` rather than
/// panicking `Duration::from_secs_f64` would on out-of-range input.
fn clamp_lag(seconds: f64) -> Duration {
    if !seconds.is_finite() || seconds < 0.0 {
        return Duration::MAX;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

pub struct Replica {
    pub name: String,
    pub max_follower_lag: Duration,
    pool: Pool,
    status: Mutex<HealthStatus>,
}

impl Replica {
    pub fn new(name: impl Into<String>, pool: Pool, max_follower_lag: Duration) -> Self {
        Replica {
            name: name.into(),
            max_follower_lag,
            pool,
            status: Mutex::new(HealthStatus::default()),
        }
    }

    /// Re-checks health if the cached status is stale, per the per-replica
    /// lock spec §4.6/§5 calls for: a re-entry within the interval returns
    /// the cached status without probing.
    async fn refresh_if_stale(&self, interval: Duration) -> Result<HealthStatus, ErmError> {
        {
            let guard = self.status.lock().expect("replica health lock poisoned");
            if !guard.is_stale(interval) {
                return Ok(guard.clone());
            }
        }

        let probed = probe(&self.pool).await;
        let status = match probed {
            Ok((read_only, lag_seconds)) => HealthStatus {
                checked_at: Some(Instant::now()),
                healthy: true,
                lag: clamp_lag(lag_seconds),
                read_only,
                err: None,
            },
            Err(e) => {
                tracing::warn!(replica = %self.name, error = %e, "replica health probe failed");
                HealthStatus {
                    checked_at: Some(Instant::now()),
                    healthy: false,
                    lag: Duration::MAX,
                    read_only: false,
                    err: Some(e.to_string()),
                }
            }
        };
        let mut guard = self.status.lock().expect("replica health lock poisoned");
        *guard = status.clone();
        Ok(status)
    }
}

async fn probe(pool: &Pool) -> Result<(bool, f64), ErmError> {
    let client = pool.get().await.map_err(|e| ErmError::Database(e.to_string()))?;
    let row = client
        .query_one(
            "SELECT pg_is_in_recovery(), COALESCE(EXTRACT(EPOCH FROM (now() - pg_last_xact_replay_timestamp())), 0)",
            &[],
        )
        .await
        .map_err(|e| ErmError::Database(e.to_string()))?;
    let in_recovery: bool = row.get(0);
    let lag_seconds: f64 = row.get(1);
    Ok((in_recovery, lag_seconds))
}

pub struct PoolSet {
    pub writer: Pool,
    pub replicas: Vec<Replica>,
    pub policies: PolicyRegistry,
    pub health_check_interval: Duration,
}

/// Where a checked-out connection came from, kept for the observer's
/// routing attributes.
pub struct RoutedConnection {
    pub client: Object,
    pub replica: bool,
    pub target: String,
}

impl PoolSet {
    pub async fn acquire_for_read(
        &self,
        override_: Option<&RoutingOverride>,
    ) -> Result<RoutedConnection, ErmError> {
        if matches!(override_, Some(RoutingOverride::ForcePrimary)) {
            return self.acquire_writer().await;
        }

        let resolved = resolve_policy(&self.policies, override_);
        let Some(policy) = resolved else {
            return self.acquire_writer().await;
        };
        let policy = policy.as_ref();

        for replica in &self.replicas {
            let status = replica.refresh_if_stale(self.health_check_interval).await?;
            let unhealthy = !status.healthy;
            let read_only_unmet = policy.require_read_only && !status.read_only;
            if unhealthy || read_only_unmet {
                continue;
            }
            let effective_max_lag = policy.max_lag.max(replica.max_follower_lag);
            if status.lag > effective_max_lag {
                continue;
            }

            if let Ok(client) = replica.pool.get().await {
                return Ok(RoutedConnection { client, replica: true, target: replica.name.clone() });
            }
        }

        self.acquire_writer().await
    }

    pub async fn acquire_writer(&self) -> Result<RoutedConnection, ErmError> {
        let client = self.writer.get().await.map_err(|e| ErmError::Database(e.to_string()))?;
        Ok(RoutedConnection { client, replica: false, target: "writer".to_string() })
    }

    /// Retry a failed replica read on the writer, annotated per §4.6. The
    /// policy's `disable_fallback` gates this.
    pub async fn failover_to_writer(&self, policy_allows_fallback: bool) -> Result<RoutedConnection, ErmError> {
        if !policy_allows_fallback {
            return Err(ErmError::Database("replica query failed and fallback is disabled".to_string()));
        }
        self.acquire_writer().await
    }
}

/// Guards the deferred single-row failover path (spec §4.6, §5): fires at
/// most once per call even if `Scan` were somehow invoked concurrently.
pub struct FailoverLatch(AtomicBool);

impl FailoverLatch {
    pub fn new() -> Self {
        FailoverLatch(AtomicBool::new(false))
    }

    /// Returns `true` the first time it's called; `false` every time after.
    pub fn try_fire(&self) -> bool {
        self.0.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }
}

impl Default for FailoverLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failover_latch_fires_exactly_once() {
        let latch = FailoverLatch::new();
        assert!(latch.try_fire());
        assert!(!latch.try_fire());
        assert!(!latch.try_fire());
    }

    #[test]
    fn health_status_is_stale_when_never_checked() {
        let status = HealthStatus::default();
        assert!(status.is_stale(Duration::from_secs(5)));
    }

    #[test]
    fn clamp_lag_never_panics_on_a_failed_probe_sentinel() {
        assert_eq!(clamp_lag(f64::MAX), Duration::MAX);
        assert_eq!(clamp_lag(f64::INFINITY), Duration::MAX);
        assert_eq!(clamp_lag(f64::NAN), Duration::MAX);
        assert_eq!(clamp_lag(-1.0), Duration::MAX);
    }

    #[test]
    fn clamp_lag_passes_ordinary_readings_through() {
        assert_eq!(clamp_lag(2.5), Duration::from_secs_f64(2.5));
    }
}
