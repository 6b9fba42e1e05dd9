//! Index file schema definitions

/// Index schema version
pub const SCHEMA_VERSION: u32 = 1;

/// SQL for creating the records table: one row per chunk, vector and
/// metadata side by side so the index is never half-visible
pub const CREATE_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    seq INTEGER PRIMARY KEY,
    text TEXT NOT NULL,
    page INTEGER,
    vector BLOB NOT NULL
);
"#;

/// SQL for creating the meta table
pub const CREATE_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Meta keys
pub const META_SCHEMA_VERSION: &str = "schema_version";
pub const META_DOCUMENT_ID: &str = "document_id";
pub const META_DIMENSION: &str = "dimension";
pub const META_CREATED_AT: &str = "created_at";
