//! `SQLite` schema definitions for pushroute.
//!
//! The store is a flat key-value table, mirroring the device key-value
//! storage the mobile client stages intents in.

/// SQL statement to create the key-value table.
pub const CREATE_ITEMS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS items (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_ITEMS_TABLE, CREATE_METADATA_TABLE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_items_table_keyed_by_key() {
        assert!(CREATE_ITEMS_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_ITEMS_TABLE.contains("value TEXT NOT NULL"));
        assert!(CREATE_ITEMS_TABLE.contains("updated_at TEXT NOT NULL"));
    }
}
