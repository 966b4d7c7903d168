//! erm-core — schema intermediate representation, canonical snapshots, and
//! the shared error type consumed by every other `erm` crate.
//!
//! This crate holds no I/O and no SQL dialect knowledge beyond the closed
//! [`FieldType`] vocabulary; it is the value-type backbone that the loader,
//! differ, codegen, migration engine, and runtime all build on.

pub mod error;
pub mod ir;
pub mod naming;
pub mod registry;
pub mod snapshot;

pub use error::{ErmError, FieldError, Result};
pub use ir::{
    AggregateFn, Annotations, Cascade, Computed, CompareOp, Edge, EdgeKind, Entity, Field,
    FieldType, Index, IndexMethod, NamedAggregate, NamedOrder, NamedPredicate,
    PolymorphicTarget, QuerySpec, SortDirection,
};
pub use naming::{pluralize, singularize, to_snake_case};
pub use registry::{EdgeSpec, EntitySpec, Registry};
pub use snapshot::{
    ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, SchemaSnapshot, TableSnapshot,
};
