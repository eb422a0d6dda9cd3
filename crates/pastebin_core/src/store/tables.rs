//! redb table definitions for the paste store.

use redb::TableDefinition;

/// Canonical paste rows keyed by short id (`Paste`, bincode-encoded).
pub const PASTES: TableDefinition<&str, &[u8]> = TableDefinition::new("pastes");

/// Recency index ordered by reverse-nanos of `created_at`, then short id.
pub const PASTES_BY_CREATED: TableDefinition<(u64, &str), ()> =
    TableDefinition::new("pastes_by_created");
