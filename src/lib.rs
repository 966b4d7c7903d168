//! # erm
//!
//! Declarative entity schema -> Postgres data-access layer + Relay-compliant
//! GraphQL server. This crate is a thin facade over the workspace members;
//! application code typically depends on the member crates directly, but
//! this re-export lets a single `erm = { .. }` dependency reach everything.

pub use erm_codegen as codegen;
pub use erm_core as core;
pub use erm_differ as differ;
pub use erm_loader as loader;
pub use erm_migrate as migrate;
pub use erm_query as query;
pub use erm_runtime as runtime;

/// Commonly used items across all of `erm`'s subsystems.
pub mod prelude {
    pub use erm_core::{
        Annotations, Cascade, Edge, EdgeKind, Entity, Field, FieldType, Index, QuerySpec, Registry,
    };
    pub use erm_core::{ErmError, Result};
    pub use erm_query::{SelectSpec, Value};
    pub use erm_runtime::{Observer, PoolSet, Query, ValidationRegistry};
}
