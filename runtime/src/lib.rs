//! Writer/replica pool routing, the query observer, and the validation
//! registry — the parts of erm that stay running for the life of a process
//! (spec §4.6, §4.7, §4.8).

pub mod config;
pub mod observer;
pub mod policy;
pub mod pool;
pub mod query;
pub mod validation;

pub use config::{
    DatabaseConfig, ExtensionsConfig, ObservabilityConfig, OrmObservabilityConfig, PolicyConfig,
    PoolConfig, ReplicaConfig, RoutingConfig,
};
pub use observer::{CorrelationIdProvider, Logger, Observation, Observer, QueryLog};
pub use policy::{PolicyRegistry, ResolvedPolicy, RoutingOverride, RoutingPolicy};
pub use pool::{FailoverLatch, PoolSet, Replica, RoutedConnection};
pub use query::{Query, QueryRow};
pub use validation::{Rule, StringRule, ValidationRegistry};

pub use erm_core::Registry as EntityRegistry;
