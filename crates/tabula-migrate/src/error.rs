//! Error types for the migration engine.

use std::path::PathBuf;

/// Errors that can occur while diffing schemas, planning migrations or
/// synthesizing DDL.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A default-value literal does not match its column's semantic type.
    #[error("Invalid default value '{value}' for {sql_type} column '{table}.{column}'")]
    InvalidDefaultValue {
        /// Table display name.
        table: String,
        /// Column storage name.
        column: String,
        /// The rejected literal.
        value: String,
        /// The column's semantic type name.
        sql_type: String,
    },

    /// A foreign key references a table that is not in the target schema.
    #[error("Foreign key on '{table}.{column}' references unknown table '{references_table}'")]
    UnknownForeignKeyTable {
        /// Referencing table display name.
        table: String,
        /// Referencing column storage name.
        column: String,
        /// Stable id of the missing referenced table.
        references_table: String,
    },

    /// A foreign key references a column that does not exist in the
    /// referenced table.
    #[error(
        "Foreign key on '{table}.{column}' references unknown column \
         '{references_table}.{references_column}'"
    )]
    UnknownForeignKeyColumn {
        /// Referencing table display name.
        table: String,
        /// Referencing column storage name.
        column: String,
        /// Referenced table stable id.
        references_table: String,
        /// The missing referenced column.
        references_column: String,
    },

    /// Internal inconsistency between diff output and the target schema.
    #[error("Invalid planning state: {0}")]
    InvalidState(String),

    /// The active dialect cannot express a migration at all.
    #[error("Dialect '{dialect}' cannot express {kind} for table '{table}'")]
    UnsupportedMigration {
        /// Dialect name.
        dialect: String,
        /// Migration kind name.
        kind: String,
        /// Table display name.
        table: String,
    },

    /// A migration set for this schema version has already been recorded.
    #[error("Schema version {0} has already been planned")]
    VersionAlreadyPlanned(u32),

    /// No migration set is recorded at the given path.
    #[error("No recorded migration set at {}", .0.display())]
    HistoryEntryNotFound(PathBuf),

    /// IO error (reading/writing persisted migration sets).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
