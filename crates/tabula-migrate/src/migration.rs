//! Migration records.
//!
//! A [`Migration`] is one atomic schema-change instruction derived from a
//! diff run. Migrations are immutable once constructed and their order within
//! a [`MigrationSet`] is the contract the planner guarantees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::SchemaSnapshot;

/// Extras key: comma-joined list of column names that exist in both the old
/// and new table definition, needed to rebuild a table.
pub const EXTRA_EXISTING_COLUMNS: &str = "existing_columns";
/// Extras key: JSON-encoded current foreign key set of a table.
pub const EXTRA_FOREIGN_KEYS: &str = "foreign_keys";
/// Extras key: new default value literal.
pub const EXTRA_DEFAULT_VALUE: &str = "default_value";
/// Extras key: previous table display name.
pub const EXTRA_PREV_NAME: &str = "prev_name";
/// Extras key: current table display name.
pub const EXTRA_CURR_NAME: &str = "curr_name";
/// Extras key: previous primary key columns (sorted, comma-joined).
pub const EXTRA_PREV_PK_COLUMNS: &str = "prev_pk_col_names";
/// Extras key: current primary key columns (sorted, comma-joined).
pub const EXTRA_CURR_PK_COLUMNS: &str = "curr_pk_col_names";
/// Extras key: previous primary key conflict policy.
pub const EXTRA_PREV_PK_ON_CONFLICT: &str = "prev_pk_on_conflict";
/// Extras key: current primary key conflict policy.
pub const EXTRA_CURR_PK_ON_CONFLICT: &str = "curr_pk_on_conflict";

/// The kind of schema change a migration performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationKind {
    /// Create a table with its full final definition.
    CreateTable,
    /// Drop a table absent from the target schema.
    DropTable,
    /// Rename a table whose stable id is unchanged.
    RenameTable,
    /// Add a plain column to an existing table.
    AlterTableAddColumn,
    /// Add a unique column to an existing table.
    AlterTableAddUnique,
    /// Create a unique index over a column added in this run.
    AddUniqueIndex,
    /// Create a non-unique index.
    AddIndex,
    /// Add a UNIQUE constraint to a pre-existing column.
    MakeColumnUnique,
    /// Add a column that carries a foreign key reference.
    AddForeignKeyReference,
    /// Replace a table's foreign key set.
    UpdateForeignKeys,
    /// Replace a table's primary key definition.
    UpdatePrimaryKey,
    /// Change a column's default value.
    ChangeDefaultValue,
}

impl MigrationKind {
    /// Returns the canonical SCREAMING_SNAKE_CASE name of this kind.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateTable => "CREATE_TABLE",
            Self::DropTable => "DROP_TABLE",
            Self::RenameTable => "RENAME_TABLE",
            Self::AlterTableAddColumn => "ALTER_TABLE_ADD_COLUMN",
            Self::AlterTableAddUnique => "ALTER_TABLE_ADD_UNIQUE",
            Self::AddUniqueIndex => "ADD_UNIQUE_INDEX",
            Self::AddIndex => "ADD_INDEX",
            Self::MakeColumnUnique => "MAKE_COLUMN_UNIQUE",
            Self::AddForeignKeyReference => "ADD_FOREIGN_KEY_REFERENCE",
            Self::UpdateForeignKeys => "UPDATE_FOREIGN_KEYS",
            Self::UpdatePrimaryKey => "UPDATE_PRIMARY_KEY",
            Self::ChangeDefaultValue => "CHANGE_DEFAULT_VALUE",
        }
    }
}

/// One atomic, ordered schema-change instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// What this migration does.
    pub kind: MigrationKind,
    /// Display name of the affected table.
    pub table_name: String,
    /// Storage name of the affected column, for column-scoped kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    /// Ancillary data needed to synthesize the migration.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl Migration {
    /// Creates a table-scoped migration.
    #[must_use]
    pub fn table(kind: MigrationKind, table_name: impl Into<String>) -> Self {
        Self {
            kind,
            table_name: table_name.into(),
            column_name: None,
            extras: BTreeMap::new(),
        }
    }

    /// Creates a column-scoped migration.
    #[must_use]
    pub fn column(
        kind: MigrationKind,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            table_name: table_name.into(),
            column_name: Some(column_name.into()),
            extras: BTreeMap::new(),
        }
    }

    /// Attaches an extras entry.
    #[must_use]
    pub fn extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extras.insert(key.to_string(), value.into());
        self
    }

    /// Looks up an extras entry.
    #[must_use]
    pub fn get_extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    /// Returns a human-readable description of this migration.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.column_name {
            Some(column) => format!(
                "{} on '{}.{}'",
                self.kind.name(),
                self.table_name,
                column
            ),
            None => format!("{} on '{}'", self.kind.name(), self.table_name),
        }
    }
}

/// The complete output of one diff/plan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationSet {
    /// Schema version this set migrates the database to.
    pub db_version: u32,
    /// Migrations in execution order.
    pub migrations: Vec<Migration>,
    /// The schema these migrations produce; the next run's base.
    pub target_schema: SchemaSnapshot,
}

impl MigrationSet {
    /// Creates a migration set.
    #[must_use]
    pub fn new(db_version: u32, migrations: Vec<Migration>, target_schema: SchemaSnapshot) -> Self {
        Self {
            db_version,
            migrations,
            target_schema,
        }
    }

    /// Returns true when the run produced no migrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}
