//! Migration discovery, planning, and transactional apply/rollback against
//! Postgres (spec §4.4). Operates directly on a `tokio_postgres::Client` so
//! it has no dependency on the runtime's pool/routing layer — callers check
//! a connection out of whichever pool is appropriate and hand it in.

pub mod discovery;
pub mod engine;
pub mod version;

pub use discovery::{discover, Migration};
pub use engine::{apply, plan, rollback, MigrateOptions, Plan};
