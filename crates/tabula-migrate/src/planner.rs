//! Migration planning.
//!
//! Expands a diff set into an ordered list of atomic migrations, assigns the
//! next schema version and packages the result with the target snapshot.

use tracing::{debug, info};

use crate::depsort::sort_by_dependencies;
use crate::diff::{SchemaDiff, SchemaDiffSet};
use crate::error::{MigrateError, Result};
use crate::migration::{
    Migration, MigrationKind, MigrationSet, EXTRA_CURR_NAME, EXTRA_CURR_PK_COLUMNS,
    EXTRA_CURR_PK_ON_CONFLICT, EXTRA_EXISTING_COLUMNS, EXTRA_PREV_NAME, EXTRA_PREV_PK_COLUMNS,
    EXTRA_PREV_PK_ON_CONFLICT,
};
use crate::schema::SchemaSnapshot;

/// Expands diffs into an ordered [`MigrationSet`].
#[derive(Debug, Default)]
pub struct MigrationPlanner;

impl MigrationPlanner {
    /// Creates a new planner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Produces the ordered migration set for one diff run.
    ///
    /// Ordering guarantees:
    /// 1. `CREATE_TABLE` migrations come first, in dependency order over the
    ///    target schema, so a table is created only after every table it
    ///    references.
    /// 2. A table created in this run gets no other migration.
    /// 3. Structural migrations for existing tables follow, in a stable
    ///    per-table order (rename, primary key, then column changes).
    /// 4. `DROP_TABLE` migrations come last, once per dropped table.
    ///
    /// The new schema version is a single increment over
    /// `source_db_version`, regardless of how many migrations are produced.
    pub fn plan(
        &self,
        diff_set: &SchemaDiffSet,
        target: &SchemaSnapshot,
        source_db_version: u32,
    ) -> Result<MigrationSet> {
        let mut migrations = Vec::new();

        // Created tables, ordered by the dependency sorter applied to the
        // full target schema.
        let created: Vec<&str> = diff_set
            .table_diffs
            .iter()
            .filter(|(_, diffs)| diffs.iter().any(|d| matches!(d, SchemaDiff::Created { .. })))
            .map(|(id, _)| id.as_str())
            .collect();

        for stable_id in &created {
            if target.get_table(stable_id).is_none() {
                return Err(MigrateError::InvalidState(format!(
                    "table '{stable_id}' is marked created but missing from the target schema"
                )));
            }
        }

        let target_tables: Vec<_> = target.iter().map(|(_, t)| t).collect();
        for table in sort_by_dependencies(&target_tables) {
            if created.contains(&table.qualified_class_name.as_str()) {
                migrations.push(Migration::table(
                    MigrationKind::CreateTable,
                    &table.table_name,
                ));
            }
        }

        // Changed tables, in stable-id order: rename before the primary key
        // rebuild so later statements address the current name.
        for diffs in diff_set.table_diffs.values() {
            for diff in diffs {
                let SchemaDiff::Changed {
                    table_name,
                    changes,
                } = diff
                else {
                    continue;
                };

                if let Some(name) = &changes.name {
                    migrations.push(
                        Migration::table(MigrationKind::RenameTable, table_name)
                            .extra(EXTRA_PREV_NAME, &name.prev)
                            .extra(EXTRA_CURR_NAME, &name.curr),
                    );
                }

                if changes.primary_key_changed() {
                    let mut migration =
                        Migration::table(MigrationKind::UpdatePrimaryKey, table_name).extra(
                            EXTRA_EXISTING_COLUMNS,
                            changes.existing_columns.clone().unwrap_or_default(),
                        );
                    if let Some(pk) = &changes.pk_columns {
                        migration = migration
                            .extra(EXTRA_PREV_PK_COLUMNS, &pk.prev)
                            .extra(EXTRA_CURR_PK_COLUMNS, &pk.curr);
                    }
                    if let Some(policy) = &changes.pk_on_conflict {
                        migration = migration
                            .extra(EXTRA_PREV_PK_ON_CONFLICT, &policy.prev)
                            .extra(EXTRA_CURR_PK_ON_CONFLICT, &policy.curr);
                    }
                    migrations.push(migration);
                }
            }
        }

        // Additive column migrations from the diff stage, already in a
        // deterministic per-table order.
        migrations.extend(diff_set.column_migrations.iter().cloned());

        // Dropped tables last, sorted by display name.
        let mut dropped: Vec<&str> = diff_set
            .table_diffs
            .values()
            .flatten()
            .filter_map(|diff| match diff {
                SchemaDiff::Dropped { table_name } => Some(table_name.as_str()),
                _ => None,
            })
            .collect();
        dropped.sort_unstable();
        for table_name in dropped {
            migrations.push(Migration::table(MigrationKind::DropTable, table_name));
        }

        let db_version = source_db_version + 1;
        info!(
            db_version,
            migrations = migrations.len(),
            "planned migration set"
        );
        for migration in &migrations {
            debug!(migration = %migration.description(), "planned");
        }

        Ok(MigrationSet::new(db_version, migrations, target.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffGenerator;
    use crate::schema::{Column, ColumnReference, SqlType, Table};

    fn plan(base: &SchemaSnapshot, target: &SchemaSnapshot, version: u32) -> MigrationSet {
        let diff = DiffGenerator::new().generate(base, target).unwrap();
        MigrationPlanner::new().plan(&diff, target, version).unwrap()
    }

    #[test]
    fn test_noop_plan_still_bumps_version() {
        let snapshot = SchemaSnapshot::new().table(
            Table::new("com.example.User", "user").column(Column::new("id", SqlType::Long)),
        );

        let set = plan(&snapshot, &snapshot, 3);
        assert!(set.is_empty());
        assert_eq!(set.db_version, 4);
        assert_eq!(set.target_schema, snapshot);
    }

    #[test]
    fn test_creation_is_total() {
        let base = SchemaSnapshot::new();
        let target = SchemaSnapshot::new().table(
            Table::new("com.example.T1", "t1")
                .column(Column::new("name", SqlType::Text).indexed())
                .column(Column::new("token", SqlType::Text).unique()),
        );

        let set = plan(&base, &target, 0);
        assert_eq!(set.db_version, 1);
        assert_eq!(set.migrations.len(), 1);
        assert_eq!(set.migrations[0].kind, MigrationKind::CreateTable);
        assert_eq!(set.migrations[0].table_name, "t1");
    }

    #[test]
    fn test_foreign_key_on_create_ordering() {
        let base = SchemaSnapshot::new();
        let target = SchemaSnapshot::new()
            .table(
                Table::new("com.example.X", "x").column(
                    Column::new("y_id", SqlType::Long)
                        .references(ColumnReference::new("com.example.Y", "id")),
                ),
            )
            .table(Table::new("com.example.Y", "y"));

        let set = plan(&base, &target, 0);
        let tables: Vec<&str> = set.migrations.iter().map(|m| m.table_name.as_str()).collect();
        assert_eq!(tables, vec!["y", "x"]);
    }

    #[test]
    fn test_rename_yields_single_rename_migration() {
        let base = SchemaSnapshot::new().table(Table::new("com.example.T1", "t1"));
        let target = SchemaSnapshot::new().table(Table::new("com.example.T1", "t1_renamed"));

        let set = plan(&base, &target, 1);
        assert_eq!(set.migrations.len(), 1);
        let migration = &set.migrations[0];
        assert_eq!(migration.kind, MigrationKind::RenameTable);
        assert_eq!(migration.get_extra(EXTRA_PREV_NAME), Some("t1"));
        assert_eq!(migration.get_extra(EXTRA_CURR_NAME), Some("t1_renamed"));
    }

    #[test]
    fn test_primary_key_change_carries_both_attribute_pairs() {
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

        let set = plan(&base, &target, 2);
        assert_eq!(set.migrations.len(), 1);
        let migration = &set.migrations[0];
        assert_eq!(migration.kind, MigrationKind::UpdatePrimaryKey);
        assert_eq!(migration.get_extra(EXTRA_PREV_PK_COLUMNS), Some("a"));
        assert_eq!(migration.get_extra(EXTRA_CURR_PK_COLUMNS), Some("a,b"));
        assert_eq!(migration.get_extra(EXTRA_CURR_PK_ON_CONFLICT), Some("REPLACE"));
        assert_eq!(migration.get_extra(EXTRA_EXISTING_COLUMNS), Some("a,b"));
    }

    #[test]
    fn test_drop_emitted_once_and_last() {
        let base = SchemaSnapshot::new()
            .table(Table::new("com.example.Old", "old"))
            .table(Table::new("com.example.Keep", "keep"));
        let target = SchemaSnapshot::new()
            .table(Table::new("com.example.Keep", "keep").column(Column::new("c", SqlType::Int)))
            .table(Table::new("com.example.New", "new"));

        let set = plan(&base, &target, 5);
        let last = set.migrations.last().unwrap();
        assert_eq!(last.kind, MigrationKind::DropTable);
        assert_eq!(last.table_name, "old");
        let drops = set
            .migrations
            .iter()
            .filter(|m| m.kind == MigrationKind::DropTable)
            .count();
        assert_eq!(drops, 1);
    }

    #[test]
    fn test_created_table_missing_from_target_is_fatal() {
        let base = SchemaSnapshot::new();
        let target = SchemaSnapshot::new().table(Table::new("com.example.T1", "t1"));
        let mut diff = DiffGenerator::new().generate(&base, &target).unwrap();

        // Simulate an inconsistent diff referring to a nonexistent table.
        let diffs = diff.table_diffs.remove("com.example.T1").unwrap();
        diff.table_diffs.insert("com.example.Ghost".to_string(), diffs);

        let err = MigrationPlanner::new().plan(&diff, &target, 0).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidState(_)));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let base = SchemaSnapshot::new().table(Table::new("com.example.Keep", "keep"));
        let target = SchemaSnapshot::new()
            .table(
                Table::new("com.example.Keep", "keep")
                    .column(Column::new("a", SqlType::Int))
                    .column(Column::new("b", SqlType::Text).indexed()),
            )
            .table(Table::new("com.example.New", "new"));

        let first = serde_json::to_string(&plan(&base, &target, 7)).unwrap();
        let second = serde_json::to_string(&plan(&base, &target, 7)).unwrap();
        assert_eq!(first, second);
    }
}
