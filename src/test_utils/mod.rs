//! Test doubles for exercising statements and the database facade without a server.

pub mod memory;
#[cfg(feature = "test-utils-postgres")]
pub mod postgres;
pub mod test_helpers;

pub use memory::{
    BindCall, GONE_AWAY, MemoryBackend, MemoryConnection, MemoryConnector, MemoryStatement, Script,
};
pub use test_helpers::{column_names, text_row};
