//! PostgreSQL connection pooling for the mail repository.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
