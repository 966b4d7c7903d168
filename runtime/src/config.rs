//! Serde-deserializable mirror of spec §6's `database.*`/`observability.*`/
//! `extensions.*` config shape, consumed directly by `erm-cli`'s `toml`
//! loader — no intermediate translation struct between the config file and
//! what [`crate::pool::PoolSet`]/[`crate::policy::PolicyRegistry`] build from.

use crate::policy::{PolicyRegistry, RoutingPolicy};
use crate::pool::{PoolSet, Replica};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use erm_core::ErmError;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_conns: usize,
    pub min_conns: usize,
    pub max_conn_lifetime_secs: Option<u64>,
    pub max_conn_idle_time_secs: Option<u64>,
    pub health_check_period_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_conns: 10,
            min_conns: 0,
            max_conn_lifetime_secs: None,
            max_conn_idle_time_secs: None,
            health_check_period_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplicaConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub read_only: bool,
    #[serde(default)]
    pub max_follower_lag_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub read_only: bool,
    pub max_lag_secs: u64,
    pub disable_fallback: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig { read_only: true, max_lag_secs: 5, disable_fallback: false }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub default_policy: Option<String>,
    pub policies: HashMap<String, PolicyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool: PoolConfig,
    pub replicas: Vec<ReplicaConfig>,
    pub routing: RoutingConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: String::new(),
            pool: PoolConfig::default(),
            replicas: Vec::new(),
            routing: RoutingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrmObservabilityConfig {
    pub query_logging: bool,
    pub emit_spans: bool,
    pub correlation_ids: bool,
}

impl Default for OrmObservabilityConfig {
    fn default() -> Self {
        OrmObservabilityConfig { query_logging: false, emit_spans: false, correlation_ids: false }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub orm: OrmObservabilityConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    pub postgis: bool,
    pub pgvector: bool,
    pub timescaledb: bool,
}

impl RoutingConfig {
    pub fn to_registry(&self) -> PolicyRegistry {
        let mut registry = PolicyRegistry::default();
        for (name, cfg) in &self.policies {
            registry.register(
                name.clone(),
                RoutingPolicy {
                    max_lag: Duration::from_secs(cfg.max_lag_secs),
                    require_read_only: cfg.read_only,
                    disable_fallback: cfg.disable_fallback,
                },
            );
        }
        if let Some(default_name) = &self.default_policy {
            registry.set_default(default_name.clone());
        }
        registry
    }
}

fn build_pool(url: &str, pool: &PoolConfig) -> Result<Pool, ErmError> {
    let pg_config = tokio_postgres::Config::from_str(url)
        .map_err(|e| ErmError::Database(e.to_string()))?;
    let manager = Manager::from_config(
        pg_config,
        tokio_postgres::NoTls,
        ManagerConfig { recycling_method: RecyclingMethod::Fast },
    );
    Pool::builder(manager)
        .max_size(pool.max_conns.max(1))
        .build()
        .map_err(|e| ErmError::Database(e.to_string()))
}

impl PoolSet {
    /// Build writer + replica `deadpool_postgres::Pool`s and a resolved
    /// [`PolicyRegistry`] from a [`DatabaseConfig`] — the one place a config
    /// file's `database.*` section turns into live connection pools.
    pub fn from_config(config: &DatabaseConfig) -> Result<PoolSet, ErmError> {
        let writer = build_pool(&config.url, &config.pool)?;

        let mut replicas = Vec::with_capacity(config.replicas.len());
        for replica_cfg in &config.replicas {
            let pool = build_pool(&replica_cfg.url, &config.pool)?;
            let max_lag = Duration::from_secs(replica_cfg.max_follower_lag_secs.unwrap_or(5));
            replicas.push(Replica::new(replica_cfg.name.clone(), pool, max_lag));
        }

        Ok(PoolSet {
            writer,
            replicas,
            policies: config.routing.to_registry(),
            health_check_interval: Duration::from_secs(config.pool.health_check_period_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_config_builds_registry_with_default_policy() {
        let mut policies = HashMap::new();
        policies.insert(
            "reporting".to_string(),
            PolicyConfig { read_only: true, max_lag_secs: 10, disable_fallback: false },
        );
        let routing = RoutingConfig { default_policy: Some("reporting".to_string()), policies };
        let registry = routing.to_registry();
        assert!(registry.default_policy().is_some());
        assert_eq!(registry.default_policy().unwrap().max_lag, Duration::from_secs(10));
    }

    #[test]
    fn pool_config_defaults_match_spec_baseline() {
        let pool = PoolConfig::default();
        assert_eq!(pool.max_conns, 10);
        assert_eq!(pool.health_check_period_secs, 30);
    }
}
