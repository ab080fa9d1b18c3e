//! Schema snapshot types.
//!
//! These types describe the full structure of a schema at one version. A
//! snapshot is built once per diff run (either by the schema-extraction
//! collaborator or by loading a persisted one) and never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default literal accepted for "current time" timestamp defaults.
pub const CURRENT_TIME_SENTINEL: &str = "CURRENT_TIMESTAMP";

/// Storage name of the implicit identifier column used when a table declares
/// no primary key of its own.
pub const IMPLICIT_ID_COLUMN: &str = "id";

/// Semantic column types supported by the migration system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// Boolean, stored as 0/1.
    Bool,
    /// Integer (32-bit).
    Int,
    /// Big integer (64-bit).
    Long,
    /// Floating point (single precision).
    Float,
    /// Floating point (double precision).
    Double,
    /// Arbitrary-precision integer.
    BigInt,
    /// Arbitrary-precision decimal.
    BigDecimal,
    /// Text/string.
    Text,
    /// Byte sequence.
    Blob,
    /// Point in time.
    Timestamp,
}

impl SqlType {
    /// Returns true for primitive-like kinds that can never hold NULL.
    ///
    /// Nullability of a column is derived from this: primitive columns are
    /// NOT NULL, everything else is nullable.
    #[must_use]
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Long | Self::Float | Self::Double
        )
    }

    /// Returns the semantic type name used in error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::BigInt => "BigInt",
            Self::BigDecimal => "BigDecimal",
            Self::Text => "Text",
            Self::Blob => "Blob",
            Self::Timestamp => "Timestamp",
        }
    }

    /// Checks a default-value literal against this type's syntax.
    #[must_use]
    pub fn validate_default(self, literal: &str) -> bool {
        match self {
            Self::Bool => matches!(
                literal.to_ascii_lowercase().as_str(),
                "0" | "1" | "true" | "false"
            ),
            Self::Int | Self::Long | Self::BigInt => literal.parse::<i128>().is_ok(),
            Self::Float | Self::Double | Self::BigDecimal => literal.parse::<f64>().is_ok(),
            Self::Text | Self::Blob => true,
            Self::Timestamp => {
                literal.eq_ignore_ascii_case(CURRENT_TIME_SENTINEL) || !literal.is_empty()
            }
        }
    }
}

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForeignKeyAction {
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
    /// Restrict (checked immediately).
    Restrict,
    /// No action.
    #[default]
    NoAction,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// Single-column foreign key reference attached to a [`Column`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnReference {
    /// Stable id of the referenced table.
    pub references_table: String,
    /// Storage name of the referenced column.
    pub references_column: String,
    /// Action on update.
    #[serde(default)]
    pub on_update: ForeignKeyAction,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
}

impl ColumnReference {
    /// Creates a reference with default actions.
    #[must_use]
    pub fn new(
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            references_table: references_table.into(),
            references_column: references_column.into(),
            on_update: ForeignKeyAction::NoAction,
            on_delete: ForeignKeyAction::NoAction,
        }
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Source identifier (field/method name) the column was declared as.
    pub identifier: String,
    /// Storage name, unique within its table.
    pub name: String,
    /// Semantic type.
    pub sql_type: SqlType,
    /// Default value literal, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Whether the column carries a UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Whether the column is indexed. Implied by `unique`.
    #[serde(default)]
    pub indexed: bool,
    /// Single-column foreign key reference, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ColumnReference>,
}

impl Column {
    /// Creates a new column. The identifier doubles as the storage name.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        let name = name.into();
        Self {
            identifier: name.clone(),
            name,
            sql_type,
            default_value: None,
            unique: false,
            indexed: false,
            foreign_key: None,
        }
    }

    /// Sets a distinct source identifier.
    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Sets the default value literal.
    #[must_use]
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default_value = Some(literal.into());
        self
    }

    /// Marks the column unique. Unique columns are always indexed.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.indexed = true;
        self
    }

    /// Marks the column indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Attaches a foreign key reference.
    #[must_use]
    pub fn references(mut self, reference: ColumnReference) -> Self {
        self.foreign_key = Some(reference);
        self
    }

    /// Whether the column accepts NULL. Derived from the semantic type.
    #[must_use]
    pub fn nullable(&self) -> bool {
        !self.sql_type.is_primitive()
    }

    /// Whether the column is indexed, accounting for the unique implication.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.indexed || self.unique
    }
}

/// Composite foreign key spanning one or more local columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Local column storage names.
    pub columns: Vec<String>,
    /// Stable id of the referenced table.
    pub references_table: String,
    /// Referenced column storage names, positionally matching `columns`.
    pub references_columns: Vec<String>,
    /// Action on update.
    #[serde(default)]
    pub on_update: ForeignKeyAction,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
}

/// One raw column-level declaration of a composite foreign key, as produced
/// by the schema-extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeKeyPart {
    /// Grouping key shared by all parts of one composite key.
    pub composite_id: String,
    /// Local column storage name.
    pub column: String,
    /// Stable id of the referenced table.
    pub references_table: String,
    /// Referenced column storage name.
    pub references_column: String,
    /// Action on update.
    #[serde(default)]
    pub on_update: ForeignKeyAction,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
}

/// Folds raw per-column composite key declarations into multi-column
/// [`ForeignKey`] values.
///
/// Parts are grouped by composite id first, then each group is folded in
/// declaration order. Grouping is deterministic: groups come out sorted by
/// composite id.
#[must_use]
pub fn fold_composite_keys(parts: &[CompositeKeyPart]) -> Vec<ForeignKey> {
    let mut groups: BTreeMap<&str, Vec<&CompositeKeyPart>> = BTreeMap::new();
    for part in parts {
        groups.entry(&part.composite_id).or_default().push(part);
    }

    groups
        .into_values()
        .map(|group| {
            let first = group[0];
            ForeignKey {
                columns: group.iter().map(|p| p.column.clone()).collect(),
                references_table: first.references_table.clone(),
                references_columns: group
                    .iter()
                    .map(|p| p.references_column.clone())
                    .collect(),
                on_update: first.on_update,
                on_delete: first.on_delete,
            }
        })
        .collect()
}

/// Complete definition of one table at one schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Stable identifier, constant across renames.
    pub qualified_class_name: String,
    /// Display name used in DDL.
    pub table_name: String,
    /// Columns keyed by storage name.
    #[serde(default)]
    pub column_info_map: BTreeMap<String, Column>,
    /// Primary key column names. Empty means the implicit identifier column.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Conflict-resolution policy for the primary key. Empty means the
    /// database default.
    #[serde(default)]
    pub primary_key_on_conflict: String,
    /// Composite foreign keys spanning multiple local columns.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// Static seed data reference, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_data: Option<String>,
}

impl Table {
    /// Creates a new table definition.
    #[must_use]
    pub fn new(stable_id: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            qualified_class_name: stable_id.into(),
            table_name: table_name.into(),
            column_info_map: BTreeMap::new(),
            primary_key: Vec::new(),
            primary_key_on_conflict: String::new(),
            foreign_keys: Vec::new(),
            seed_data: None,
        }
    }

    /// Adds a column, keyed by its storage name.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.column_info_map.insert(column.name.clone(), column);
        self
    }

    /// Sets the primary key column names.
    #[must_use]
    pub fn primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = columns;
        self
    }

    /// Sets the primary key conflict policy.
    #[must_use]
    pub fn primary_key_on_conflict(mut self, policy: impl Into<String>) -> Self {
        self.primary_key_on_conflict = policy.into();
        self
    }

    /// Adds a composite foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Sets the seed data reference.
    #[must_use]
    pub fn seed_data(mut self, reference: impl Into<String>) -> Self {
        self.seed_data = Some(reference.into());
        self
    }

    /// Gets a column by storage name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.column_info_map.get(name)
    }

    /// Returns the effective primary key columns, falling back to the
    /// implicit identifier column when none are declared.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<String> {
        if self.primary_key.is_empty() {
            vec![IMPLICIT_ID_COLUMN.to_string()]
        } else {
            self.primary_key.clone()
        }
    }

    /// Returns the primary key as a sorted comma-joined string, the
    /// canonical form used for comparison between versions.
    #[must_use]
    pub fn primary_key_joined(&self) -> String {
        let mut columns = self.primary_key_columns();
        columns.sort();
        columns.join(",")
    }

    /// Whether the primary key is the implicit identifier column.
    #[must_use]
    pub fn has_implicit_primary_key(&self) -> bool {
        self.primary_key.is_empty() && self.get_column(IMPLICIT_ID_COLUMN).is_none()
    }

    /// Returns column storage names in sorted order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.column_info_map.keys().cloned().collect()
    }

    /// Stable ids of tables this table references through any foreign key.
    #[must_use]
    pub fn referenced_tables(&self) -> Vec<String> {
        let mut refs: Vec<String> = self
            .column_info_map
            .values()
            .filter_map(|c| c.foreign_key.as_ref())
            .map(|r| r.references_table.clone())
            .chain(self.foreign_keys.iter().map(|fk| fk.references_table.clone()))
            .collect();
        refs.sort();
        refs.dedup();
        refs
    }
}

/// Immutable mapping from stable table identifier to [`Table`], describing
/// the full schema at one version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// All tables, keyed by stable id.
    pub tables: BTreeMap<String, Table>,
}

impl SchemaSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, keyed by its stable id.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables
            .insert(table.qualified_class_name.clone(), table);
        self
    }

    /// Gets a table by stable id.
    #[must_use]
    pub fn get_table(&self, stable_id: &str) -> Option<&Table> {
        self.tables.get(stable_id)
    }

    /// Returns true when the snapshot holds no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of tables in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Iterates tables in stable-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.tables.iter()
    }
}
