//! Schema diff generation.
//!
//! This module compares two schema snapshots and produces typed diffs for
//! table-level changes plus directly-emitted migrations for additive
//! column-level changes. Tables are matched by stable id, so a display-name
//! change is detected as a rename and never as a drop+create pair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::migration::{
    Migration, MigrationKind, EXTRA_DEFAULT_VALUE, EXTRA_EXISTING_COLUMNS, EXTRA_FOREIGN_KEYS,
};
use crate::schema::{Column, ForeignKey, SchemaSnapshot, Table, IMPLICIT_ID_COLUMN};

/// A before/after value pair for one changed table attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Value in the base snapshot.
    pub prev: String,
    /// Value in the target snapshot.
    pub curr: String,
}

impl AttributeChange {
    fn new(prev: impl Into<String>, curr: impl Into<String>) -> Self {
        Self {
            prev: prev.into(),
            curr: curr.into(),
        }
    }
}

/// The set of changed attributes for one table transition.
///
/// Multiple changed attributes merge into a single `CHANGED` diff carrying
/// all of them, never one diff per attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChanges {
    /// Display name changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<AttributeChange>,
    /// Primary key column set changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk_columns: Option<AttributeChange>,
    /// Primary key conflict policy changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk_on_conflict: Option<AttributeChange>,
    /// Column names shared by both versions, needed when the change forces
    /// a table rebuild.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_columns: Option<String>,
}

impl TableChanges {
    /// Returns true when no attribute changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.pk_columns.is_none() && self.pk_on_conflict.is_none()
    }

    /// Whether the primary key definition changed in any way.
    #[must_use]
    pub fn primary_key_changed(&self) -> bool {
        self.pk_columns.is_some() || self.pk_on_conflict.is_some()
    }
}

/// A structural difference between two snapshots for a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaDiff {
    /// The table exists only in the target snapshot.
    Created {
        /// Display name of the new table.
        table_name: String,
    },
    /// The table exists only in the base snapshot.
    Dropped {
        /// Display name of the removed table.
        table_name: String,
    },
    /// The table exists in both snapshots with attribute changes.
    Changed {
        /// Current display name of the table.
        table_name: String,
        /// The merged set of changed attributes.
        changes: TableChanges,
    },
}

impl SchemaDiff {
    /// Display name of the affected table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::Created { table_name }
            | Self::Dropped { table_name }
            | Self::Changed { table_name, .. } => table_name,
        }
    }

    /// The string-keyed before/after attribute map of a `CHANGED` diff.
    #[must_use]
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut attributes = BTreeMap::new();
        if let Self::Changed { changes, .. } = self {
            if let Some(name) = &changes.name {
                attributes.insert("prev_name".to_string(), name.prev.clone());
                attributes.insert("curr_name".to_string(), name.curr.clone());
            }
            if let Some(pk) = &changes.pk_columns {
                attributes.insert("prev_pk_col_names".to_string(), pk.prev.clone());
                attributes.insert("curr_pk_col_names".to_string(), pk.curr.clone());
            }
            if let Some(policy) = &changes.pk_on_conflict {
                attributes.insert("prev_pk_on_conflict".to_string(), policy.prev.clone());
                attributes.insert("curr_pk_on_conflict".to_string(), policy.curr.clone());
            }
        }
        attributes
    }
}

/// The complete output of one diff run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDiffSet {
    /// Table-level diffs, keyed by stable table id.
    pub table_diffs: BTreeMap<String, Vec<SchemaDiff>>,
    /// Additive column-level changes, emitted directly as migrations since
    /// they need no destructive rewrite.
    pub column_migrations: Vec<Migration>,
}

impl SchemaDiffSet {
    /// Returns true when the two snapshots were structurally identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table_diffs.is_empty() && self.column_migrations.is_empty()
    }
}

/// Compares two schema snapshots.
#[derive(Debug, Default)]
pub struct DiffGenerator;

impl DiffGenerator {
    /// Creates a new diff generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compares `base` against `target` and returns the changes needed to
    /// transform one into the other.
    ///
    /// The target snapshot is validated first; a malformed default literal
    /// or an unresolvable foreign key aborts the run before any diff is
    /// produced.
    pub fn generate(&self, base: &SchemaSnapshot, target: &SchemaSnapshot) -> Result<SchemaDiffSet> {
        validate_snapshot(target)?;

        let mut diff_set = SchemaDiffSet::default();

        // Tables present only in target: creation is total, so no
        // column/index/FK diffs are emitted for them.
        for (stable_id, table) in target.iter() {
            if base.get_table(stable_id).is_none() {
                diff_set.table_diffs.insert(
                    stable_id.clone(),
                    vec![SchemaDiff::Created {
                        table_name: table.table_name.clone(),
                    }],
                );
            }
        }

        // Tables present only in base.
        for (stable_id, table) in base.iter() {
            if target.get_table(stable_id).is_none() {
                diff_set.table_diffs.insert(
                    stable_id.clone(),
                    vec![SchemaDiff::Dropped {
                        table_name: table.table_name.clone(),
                    }],
                );
            }
        }

        // Tables present in both, matched by stable id.
        for (stable_id, target_table) in target.iter() {
            let Some(base_table) = base.get_table(stable_id) else {
                continue;
            };

            let changes = diff_table(base_table, target_table);
            if !changes.is_empty() {
                diff_set.table_diffs.insert(
                    stable_id.clone(),
                    vec![SchemaDiff::Changed {
                        table_name: target_table.table_name.clone(),
                        changes,
                    }],
                );
            }

            diff_columns(base_table, target_table, &mut diff_set.column_migrations);
        }

        Ok(diff_set)
    }
}

/// Compares the table-level attributes of two versions of one table.
fn diff_table(base: &Table, target: &Table) -> TableChanges {
    let mut changes = TableChanges::default();

    if base.table_name != target.table_name {
        changes.name = Some(AttributeChange::new(
            base.table_name.clone(),
            target.table_name.clone(),
        ));
    }

    // Primary keys compare as sorted comma-joined strings for determinism.
    if base.primary_key_joined() != target.primary_key_joined() {
        changes.pk_columns = Some(AttributeChange::new(
            base.primary_key_joined(),
            target.primary_key_joined(),
        ));
    }

    if base.primary_key_on_conflict != target.primary_key_on_conflict {
        changes.pk_on_conflict = Some(AttributeChange::new(
            base.primary_key_on_conflict.clone(),
            target.primary_key_on_conflict.clone(),
        ));
    }

    if changes.primary_key_changed() {
        changes.existing_columns = Some(shared_columns(base, target));
    }

    changes
}

/// Emits migrations for additive column-level changes on a table that
/// exists in both snapshots.
fn diff_columns(base: &Table, target: &Table, migrations: &mut Vec<Migration>) {
    let table_name = &target.table_name;
    let mut foreign_keys_changed = base.foreign_keys != target.foreign_keys;

    for (column_name, column) in &target.column_info_map {
        match base.get_column(column_name) {
            None => emit_new_column(table_name, column, migrations),
            Some(base_column) => {
                if base_column.sql_type != column.sql_type {
                    // Column retyping is deliberately unsupported.
                    debug!(
                        table = %table_name,
                        column = %column_name,
                        "ignoring column type change"
                    );
                }

                if !base_column.unique && column.unique {
                    migrations.push(
                        Migration::column(MigrationKind::MakeColumnUnique, table_name, column_name)
                            .extra(EXTRA_EXISTING_COLUMNS, shared_columns(base, target)),
                    );
                } else if !base_column.is_indexed() && column.is_indexed() {
                    migrations.push(Migration::column(
                        MigrationKind::AddIndex,
                        table_name,
                        column_name,
                    ));
                }

                if base_column.default_value != column.default_value {
                    migrations.push(
                        Migration::column(
                            MigrationKind::ChangeDefaultValue,
                            table_name,
                            column_name,
                        )
                        .extra(
                            EXTRA_DEFAULT_VALUE,
                            column.default_value.clone().unwrap_or_default(),
                        )
                        .extra(EXTRA_EXISTING_COLUMNS, shared_columns(base, target)),
                    );
                }

                if base_column.foreign_key != column.foreign_key {
                    foreign_keys_changed = true;
                }
            }
        }
    }

    for column_name in base.column_info_map.keys() {
        if target.get_column(column_name).is_none() {
            // Column removal is deliberately unsupported.
            debug!(table = %table_name, column = %column_name, "ignoring removed column");
        }
    }

    if foreign_keys_changed {
        migrations.push(
            Migration::table(MigrationKind::UpdateForeignKeys, table_name)
                .extra(EXTRA_EXISTING_COLUMNS, shared_columns(base, target))
                .extra(EXTRA_FOREIGN_KEYS, encode_foreign_keys(target)),
        );
    }
}

/// Emits migrations for a column present only in the target version.
fn emit_new_column(table_name: &str, column: &Column, migrations: &mut Vec<Migration>) {
    if column.foreign_key.is_some() {
        migrations.push(Migration::column(
            MigrationKind::AddForeignKeyReference,
            table_name,
            &column.name,
        ));
        // The REFERENCES clause rides inline on the ADD COLUMN, but a
        // UNIQUE constraint cannot; it travels as an index migration, the
        // same as for a plain new column.
        if column.unique {
            migrations.push(Migration::column(
                MigrationKind::AddUniqueIndex,
                table_name,
                &column.name,
            ));
        } else if column.is_indexed() {
            migrations.push(Migration::column(
                MigrationKind::AddIndex,
                table_name,
                &column.name,
            ));
        }
        return;
    }

    if column.unique {
        // SQLite cannot add a UNIQUE column in one ALTER, so the addition
        // and the index travel as two migrations.
        migrations.push(Migration::column(
            MigrationKind::AlterTableAddUnique,
            table_name,
            &column.name,
        ));
        migrations.push(Migration::column(
            MigrationKind::AddUniqueIndex,
            table_name,
            &column.name,
        ));
        return;
    }

    migrations.push(Migration::column(
        MigrationKind::AlterTableAddColumn,
        table_name,
        &column.name,
    ));
    if column.is_indexed() {
        migrations.push(Migration::column(
            MigrationKind::AddIndex,
            table_name,
            &column.name,
        ));
    }
}

/// Comma-joined sorted list of column names present in both versions, used
/// by the rebuild pattern to copy data across.
fn shared_columns(base: &Table, target: &Table) -> String {
    let shared: Vec<&str> = base
        .column_info_map
        .keys()
        .filter(|name| target.get_column(name).is_some())
        .map(String::as_str)
        .collect();
    shared.join(",")
}

/// JSON encoding of a table's full current foreign key set (column-level
/// references folded in as single-column keys).
fn encode_foreign_keys(table: &Table) -> String {
    let mut keys: Vec<ForeignKey> = table
        .column_info_map
        .values()
        .filter_map(|column| {
            column.foreign_key.as_ref().map(|reference| ForeignKey {
                columns: vec![column.name.clone()],
                references_table: reference.references_table.clone(),
                references_columns: vec![reference.references_column.clone()],
                on_update: reference.on_update,
                on_delete: reference.on_delete,
            })
        })
        .collect();
    keys.extend(table.foreign_keys.iter().cloned());
    keys.sort();
    serde_json::to_string(&keys).unwrap_or_default()
}

/// Validates every default literal and foreign key of the target snapshot.
fn validate_snapshot(target: &SchemaSnapshot) -> Result<()> {
    for (_, table) in target.iter() {
        for column in table.column_info_map.values() {
            if let Some(literal) = &column.default_value {
                if !column.sql_type.validate_default(literal) {
                    return Err(MigrateError::InvalidDefaultValue {
                        table: table.table_name.clone(),
                        column: column.name.clone(),
                        value: literal.clone(),
                        sql_type: column.sql_type.name().to_string(),
                    });
                }
            }
            if let Some(reference) = &column.foreign_key {
                resolve_reference(
                    target,
                    table,
                    &column.name,
                    &reference.references_table,
                    &reference.references_column,
                )?;
            }
        }
        for fk in &table.foreign_keys {
            for (local, referenced) in fk.columns.iter().zip(&fk.references_columns) {
                resolve_reference(target, table, local, &fk.references_table, referenced)?;
            }
        }
    }
    Ok(())
}

/// Checks that a referenced table and column exist in the target snapshot.
fn resolve_reference(
    target: &SchemaSnapshot,
    table: &Table,
    column: &str,
    references_table: &str,
    references_column: &str,
) -> Result<()> {
    let Some(referenced) = target.get_table(references_table) else {
        return Err(MigrateError::UnknownForeignKeyTable {
            table: table.table_name.clone(),
            column: column.to_string(),
            references_table: references_table.to_string(),
        });
    };

    let implicit = references_column == IMPLICIT_ID_COLUMN && referenced.has_implicit_primary_key();
    if !implicit && referenced.get_column(references_column).is_none() {
        return Err(MigrateError::UnknownForeignKeyColumn {
            table: table.table_name.clone(),
            column: column.to_string(),
            references_table: references_table.to_string(),
            references_column: references_column.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnReference, SqlType};

    fn users_table() -> Table {
        Table::new("com.example.User", "user")
            .column(Column::new("id", SqlType::Long))
            .column(Column::new("email", SqlType::Text))
            .primary_key(vec!["id".to_string()])
    }

    fn generate(base: &SchemaSnapshot, target: &SchemaSnapshot) -> SchemaDiffSet {
        DiffGenerator::new().generate(base, target).unwrap()
    }

    #[test]
    fn test_noop_diff_is_empty() {
        let snapshot = SchemaSnapshot::new().table(users_table());
        let diff = generate(&snapshot, &snapshot);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_created_table_has_no_column_migrations() {
        let base = SchemaSnapshot::new();
        let target = SchemaSnapshot::new().table(
            users_table()
                .column(Column::new("nickname", SqlType::Text).indexed())
                .column(Column::new("token", SqlType::Text).unique()),
        );

        let diff = generate(&base, &target);
        assert_eq!(diff.table_diffs.len(), 1);
        assert!(matches!(
            diff.table_diffs["com.example.User"][0],
            SchemaDiff::Created { .. }
        ));
        assert!(diff.column_migrations.is_empty());
    }

    #[test]
    fn test_dropped_table() {
        let base = SchemaSnapshot::new().table(users_table());
        let target = SchemaSnapshot::new();

        let diff = generate(&base, &target);
        assert!(matches!(
            diff.table_diffs["com.example.User"][0],
            SchemaDiff::Dropped { .. }
        ));
    }

    #[test]
    fn test_rename_is_not_drop_and_create() {
        let base = SchemaSnapshot::new().table(Table::new("com.example.T1", "t1"));
        let target = SchemaSnapshot::new().table(Table::new("com.example.T1", "t1_renamed"));

        let diff = generate(&base, &target);
        assert_eq!(diff.table_diffs.len(), 1);
        match &diff.table_diffs["com.example.T1"][0] {
            SchemaDiff::Changed { changes, .. } => {
                let name = changes.name.as_ref().unwrap();
                assert_eq!(name.prev, "t1");
                assert_eq!(name.curr, "t1_renamed");
                assert!(changes.pk_columns.is_none());
            }
            other => panic!("expected Changed, got {other:?}"),
        }
    }

    #[test]
    fn test_merged_primary_key_diff() {
        let base = SchemaSnapshot::new().table(
            Table::new("com.example.T1", "t1")
                .column(Column::new("a", SqlType::Long))
                .column(Column::new("b", SqlType::Long))
                .primary_key(vec!["a".to_string()]),
        );
        let target = SchemaSnapshot::new().table(
            Table::new("com.example.T1", "t1")
                .column(Column::new("a", SqlType::Long))
                .column(Column::new("b", SqlType::Long))
                .primary_key(vec!["a".to_string(), "b".to_string()])
                .primary_key_on_conflict("REPLACE"),
        );

        let diff = generate(&base, &target);
        let diffs = &diff.table_diffs["com.example.T1"];
        assert_eq!(diffs.len(), 1, "both PK subtypes merge into one diff");

        let attributes = diffs[0].attributes();
        assert_eq!(attributes["prev_pk_col_names"], "a");
        assert_eq!(attributes["curr_pk_col_names"], "a,b");
        assert_eq!(attributes["prev_pk_on_conflict"], "");
        assert_eq!(attributes["curr_pk_on_conflict"], "REPLACE");
    }

    #[test]
    fn test_new_column_emits_migration_directly() {
        let base = SchemaSnapshot::new().table(users_table());
        let target = SchemaSnapshot::new()
            .table(users_table().column(Column::new("age", SqlType::Int).default_value("0")));

        let diff = generate(&base, &target);
        assert!(diff.table_diffs.is_empty());
        assert_eq!(diff.column_migrations.len(), 1);
        assert_eq!(
            diff.column_migrations[0].kind,
            MigrationKind::AlterTableAddColumn
        );
        assert_eq!(diff.column_migrations[0].column_name.as_deref(), Some("age"));
    }

    #[test]
    fn test_new_unique_column_emits_add_unique_and_index() {
        let base = SchemaSnapshot::new().table(users_table());
        let target = SchemaSnapshot::new()
            .table(users_table().column(Column::new("token", SqlType::Text).unique()));

        let diff = generate(&base, &target);
        let kinds: Vec<MigrationKind> = diff.column_migrations.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MigrationKind::AlterTableAddUnique,
                MigrationKind::AddUniqueIndex
            ]
        );
    }

    #[test]
    fn test_new_column_with_foreign_key() {
        let base = SchemaSnapshot::new()
            .table(users_table())
            .table(Table::new("com.example.Org", "org"));
        let target = SchemaSnapshot::new()
            .table(users_table().column(
                Column::new("org_id", SqlType::Long)
                    .references(ColumnReference::new("com.example.Org", "id")),
            ))
            .table(Table::new("com.example.Org", "org"));

        let diff = generate(&base, &target);
        assert_eq!(diff.column_migrations.len(), 1);
        assert_eq!(
            diff.column_migrations[0].kind,
            MigrationKind::AddForeignKeyReference
        );
    }

    #[test]
    fn test_new_unique_foreign_key_column_keeps_unique_index() {
        let base = SchemaSnapshot::new()
            .table(users_table())
            .table(Table::new("com.example.Profile", "profile"));
        let target = SchemaSnapshot::new()
            .table(users_table().column(
                Column::new("profile_id", SqlType::Long)
                    .unique()
                    .references(ColumnReference::new("com.example.Profile", "id")),
            ))
            .table(Table::new("com.example.Profile", "profile"));

        let diff = generate(&base, &target);
        let kinds: Vec<MigrationKind> = diff.column_migrations.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MigrationKind::AddForeignKeyReference,
                MigrationKind::AddUniqueIndex
            ]
        );
    }

    #[test]
    fn test_new_indexed_foreign_key_column_keeps_index() {
        let base = SchemaSnapshot::new()
            .table(users_table())
            .table(Table::new("com.example.Org", "org"));
        let target = SchemaSnapshot::new()
            .table(users_table().column(
                Column::new("org_id", SqlType::Long)
                    .indexed()
                    .references(ColumnReference::new("com.example.Org", "id")),
            ))
            .table(Table::new("com.example.Org", "org"));

        let diff = generate(&base, &target);
        let kinds: Vec<MigrationKind> = diff.column_migrations.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MigrationKind::AddForeignKeyReference, MigrationKind::AddIndex]
        );
    }

    #[test]
    fn test_existing_column_made_unique_emits_only_make_unique() {
        let base = SchemaSnapshot::new().table(users_table());
        let target = SchemaSnapshot::new().table(
            Table::new("com.example.User", "user")
                .column(Column::new("id", SqlType::Long))
                .column(Column::new("email", SqlType::Text).unique())
                .primary_key(vec!["id".to_string()]),
        );

        let diff = generate(&base, &target);
        assert_eq!(diff.column_migrations.len(), 1);
        assert_eq!(
            diff.column_migrations[0].kind,
            MigrationKind::MakeColumnUnique
        );
        assert_eq!(
            diff.column_migrations[0].get_extra(EXTRA_EXISTING_COLUMNS),
            Some("email,id")
        );
    }

    #[test]
    fn test_existing_column_made_indexed() {
        let base = SchemaSnapshot::new().table(users_table());
        let target = SchemaSnapshot::new().table(
            Table::new("com.example.User", "user")
                .column(Column::new("id", SqlType::Long))
                .column(Column::new("email", SqlType::Text).indexed())
                .primary_key(vec!["id".to_string()]),
        );

        let diff = generate(&base, &target);
        assert_eq!(diff.column_migrations.len(), 1);
        assert_eq!(diff.column_migrations[0].kind, MigrationKind::AddIndex);
    }

    #[test]
    fn test_default_value_change() {
        let base = SchemaSnapshot::new()
            .table(users_table().column(Column::new("age", SqlType::Int).default_value("0")));
        let target = SchemaSnapshot::new()
            .table(users_table().column(Column::new("age", SqlType::Int).default_value("21")));

        let diff = generate(&base, &target);
        assert_eq!(diff.column_migrations.len(), 1);
        let migration = &diff.column_migrations[0];
        assert_eq!(migration.kind, MigrationKind::ChangeDefaultValue);
        assert_eq!(migration.get_extra(EXTRA_DEFAULT_VALUE), Some("21"));
    }

    #[test]
    fn test_foreign_key_change_carries_full_extras() {
        let org = Table::new("com.example.Org", "org");
        let base = SchemaSnapshot::new()
            .table(users_table().column(Column::new("org_id", SqlType::Long)))
            .table(org.clone());
        let target = SchemaSnapshot::new()
            .table(users_table().column(
                Column::new("org_id", SqlType::Long)
                    .references(ColumnReference::new("com.example.Org", "id")),
            ))
            .table(org);

        let diff = generate(&base, &target);
        assert_eq!(diff.column_migrations.len(), 1);
        let migration = &diff.column_migrations[0];
        assert_eq!(migration.kind, MigrationKind::UpdateForeignKeys);
        assert_eq!(
            migration.get_extra(EXTRA_EXISTING_COLUMNS),
            Some("email,id,org_id")
        );
        let keys: Vec<ForeignKey> =
            serde_json::from_str(migration.get_extra(EXTRA_FOREIGN_KEYS).unwrap()).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].references_table, "com.example.Org");
    }

    #[test]
    fn test_column_removal_is_ignored() {
        let base = SchemaSnapshot::new()
            .table(users_table().column(Column::new("legacy", SqlType::Text)));
        let target = SchemaSnapshot::new().table(users_table());

        let diff = generate(&base, &target);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_invalid_default_rejected_before_diffing() {
        let base = SchemaSnapshot::new();
        let target = SchemaSnapshot::new()
            .table(users_table().column(Column::new("age", SqlType::Int).default_value("ten")));

        let err = DiffGenerator::new().generate(&base, &target).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidDefaultValue { .. }));
    }

    #[test]
    fn test_unresolved_foreign_key_rejected() {
        let base = SchemaSnapshot::new();
        let target = SchemaSnapshot::new().table(users_table().column(
            Column::new("org_id", SqlType::Long)
                .references(ColumnReference::new("com.example.Missing", "id")),
        ));

        let err = DiffGenerator::new().generate(&base, &target).unwrap_err();
        assert!(matches!(err, MigrateError::UnknownForeignKeyTable { .. }));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let base = SchemaSnapshot::new().table(users_table());
        let target = SchemaSnapshot::new().table(
            users_table()
                .column(Column::new("age", SqlType::Int))
                .column(Column::new("nickname", SqlType::Text).indexed()),
        );

        let first = serde_json::to_string(&generate(&base, &target)).unwrap();
        let second = serde_json::to_string(&generate(&base, &target)).unwrap();
        assert_eq!(first, second);
    }
}
