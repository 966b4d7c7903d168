//! Named routing policies and per-call context overrides (spec §4.6).

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    pub max_lag: Duration,
    pub require_read_only: bool,
    pub disable_fallback: bool,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        RoutingPolicy {
            max_lag: Duration::from_secs(5),
            require_read_only: true,
            disable_fallback: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct PolicyRegistry {
    named: HashMap<String, RoutingPolicy>,
    default_name: Option<String>,
}

impl PolicyRegistry {
    pub fn register(&mut self, name: impl Into<String>, policy: RoutingPolicy) {
        self.named.insert(name.into(), policy);
    }

    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_name = Some(name.into());
    }

    pub fn get(&self, name: &str) -> Option<&RoutingPolicy> {
        self.named.get(name)
    }

    pub fn default_policy(&self) -> Option<&RoutingPolicy> {
        self.default_name.as_ref().and_then(|name| self.named.get(name))
    }
}

/// Per-call override a caller can set on a [`crate::observer::QueryContext`].
#[derive(Debug, Clone)]
pub enum RoutingOverride {
    ForcePrimary,
    UsePolicy(String),
    UseReplica(RoutingPolicy),
}

/// Resolve the effective policy: explicit options > named-policy context >
/// default-policy. Returns `None` when nothing resolves, meaning "use the
/// writer" per spec §4.6 step 2.
pub fn resolve_policy<'a>(
    registry: &'a PolicyRegistry,
    override_: Option<&'a RoutingOverride>,
) -> Option<ResolvedPolicy<'a>> {
    match override_ {
        Some(RoutingOverride::ForcePrimary) => None,
        Some(RoutingOverride::UseReplica(policy)) => Some(ResolvedPolicy::Owned(policy.clone())),
        Some(RoutingOverride::UsePolicy(name)) => registry.get(name).map(ResolvedPolicy::Borrowed),
        None => registry.default_policy().map(ResolvedPolicy::Borrowed),
    }
}

pub enum ResolvedPolicy<'a> {
    Borrowed(&'a RoutingPolicy),
    Owned(RoutingPolicy),
}

impl<'a> ResolvedPolicy<'a> {
    pub fn as_ref(&self) -> &RoutingPolicy {
        match self {
            ResolvedPolicy::Borrowed(p) => p,
            ResolvedPolicy::Owned(p) => p,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_primary_overrides_everything() {
        let mut registry = PolicyRegistry::default();
        registry.register("reporting", RoutingPolicy::default());
        registry.set_default("reporting");
        assert!(resolve_policy(&registry, Some(&RoutingOverride::ForcePrimary)).is_none());
    }

    #[test]
    fn falls_back_to_default_policy_when_no_override() {
        let mut registry = PolicyRegistry::default();
        registry.register("reporting", RoutingPolicy::default());
        registry.set_default("reporting");
        assert!(resolve_policy(&registry, None).is_some());
    }

    #[test]
    fn no_default_and_no_override_resolves_to_writer() {
        let registry = PolicyRegistry::default();
        assert!(resolve_policy(&registry, None).is_none());
    }
}
