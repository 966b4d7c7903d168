//! Code emitter and idempotent artifact tracker for erm (spec §4.3).
//!
//! Three plans share one [`artifact::ArtifactTracker`]: `orm` (typed
//! client/model/registry, [`client`]), `graphql` (schema/resolvers/
//! dataloaders, [`graphql`]), and `migrations` (forward/rollback SQL,
//! [`sql`]).

pub mod artifact;
pub mod client;
pub mod graphql;
pub mod sql;

pub use artifact::{ArtifactTracker, Manifest, PlanSummary, PlannedFile, WriteOutcome};
pub use client::{emit_client, ClientFile};
pub use graphql::{emit_graphql, GraphqlFiles};
pub use sql::{emit_migration, MigrationFiles};
