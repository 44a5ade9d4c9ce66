//! Small helpers shared by the orchestrator and backends

pub mod identifier;

pub use identifier::escape_as_identifier;
