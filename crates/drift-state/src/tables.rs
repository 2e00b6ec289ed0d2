//! redb table definitions for the drift state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types).

use redb::TableDefinition;

/// Deployment plans keyed by plan name.
pub const PLANS: TableDefinition<&str, &[u8]> = TableDefinition::new("plans");

/// Task records keyed by zero-padded task id (lexicographic == numeric order).
pub const TASKS: TableDefinition<&str, &[u8]> = TableDefinition::new("tasks");
