//! Live table schemas

pub mod catalog;
pub mod types;

pub use catalog::{find_table, table_exists, table_schema};
pub use types::*;
