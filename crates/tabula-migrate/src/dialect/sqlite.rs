//! SQLite dialect.
//!
//! SQLite has limited ALTER TABLE support: columns cannot be altered in
//! place, constraints cannot be added after creation and a UNIQUE clause is
//! not allowed in ADD COLUMN. Migrations whose semantics require any of
//! that use the rebuild pattern: copy the rows into a temp table, drop the
//! table, re-create it from the target definition and copy the rows back.

use crate::error::{MigrateError, Result};
use crate::migration::{
    Migration, MigrationKind, EXTRA_CURR_NAME, EXTRA_EXISTING_COLUMNS, EXTRA_PREV_NAME,
};
use crate::schema::{SchemaSnapshot, SqlType, Table};

use super::MigrationDialect;

/// Storage name of the timestamp column refreshed by the update trigger.
const MODIFIED_COLUMN: &str = "modified";

/// SQLite migration dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Finds a table in the target snapshot by display name.
    fn target_table<'a>(&self, target: &'a SchemaSnapshot, table_name: &str) -> Result<&'a Table> {
        target
            .iter()
            .map(|(_, table)| table)
            .find(|table| table.table_name == table_name)
            .ok_or_else(|| {
                MigrateError::InvalidState(format!(
                    "table '{table_name}' not found in target schema"
                ))
            })
    }

    /// Full synthesis of one table: the CREATE TABLE statement, index
    /// statements for indexed non-unique columns and the modified-timestamp
    /// trigger when the table declares one.
    fn create_table_statements(
        &self,
        table: &Table,
        target: &SchemaSnapshot,
    ) -> Result<Vec<String>> {
        let mut body = Vec::new();

        if table.has_implicit_primary_key() {
            body.push(format!(
                "{} INTEGER PRIMARY KEY AUTOINCREMENT",
                self.quote_identifier("id")
            ));
        }

        for column in table.column_info_map.values() {
            body.push(self.column_definition(column, target, true)?);
        }

        if !table.has_implicit_primary_key() {
            let quoted: Vec<String> = table
                .primary_key_columns()
                .iter()
                .map(|c| self.quote_identifier(c))
                .collect();
            let mut clause = format!("PRIMARY KEY ({})", quoted.join(", "));
            if !table.primary_key_on_conflict.is_empty() {
                clause.push_str(&format!(" ON CONFLICT {}", table.primary_key_on_conflict));
            }
            body.push(clause);
        }

        for fk in &table.foreign_keys {
            let parent = target.get_table(&fk.references_table).ok_or_else(|| {
                MigrateError::InvalidState(format!(
                    "composite foreign key on '{}' references unknown table '{}'",
                    table.table_name, fk.references_table
                ))
            })?;
            let local: Vec<String> = fk.columns.iter().map(|c| self.quote_identifier(c)).collect();
            let referenced: Vec<String> = fk
                .references_columns
                .iter()
                .map(|c| self.quote_identifier(c))
                .collect();
            body.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({}) ON UPDATE {} ON DELETE {}",
                local.join(", "),
                self.quote_identifier(&parent.table_name),
                referenced.join(", "),
                fk.on_update.as_sql(),
                fk.on_delete.as_sql()
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} ({})",
            self.quote_identifier(&table.table_name),
            body.join(", ")
        )];

        for column in table.column_info_map.values() {
            if column.is_indexed() && !column.unique {
                statements.push(self.create_index_sql(&table.table_name, &column.name, false));
            }
        }

        if let Some(trigger) = self.modified_trigger_sql(table) {
            statements.push(trigger);
        }

        Ok(statements)
    }

    /// Trigger refreshing the `modified` timestamp column on every update,
    /// emitted only when the table declares such a column.
    fn modified_trigger_sql(&self, table: &Table) -> Option<String> {
        let column = table.get_column(MODIFIED_COLUMN)?;
        if column.sql_type != SqlType::Timestamp {
            return None;
        }

        let conditions: Vec<String> = table
            .primary_key_columns()
            .iter()
            .map(|pk| {
                format!(
                    "{col} = NEW.{col}",
                    col = self.quote_identifier(pk)
                )
            })
            .collect();

        Some(format!(
            "CREATE TRIGGER IF NOT EXISTS {trigger} AFTER UPDATE ON {table} FOR EACH ROW \
             BEGIN UPDATE {table} SET {col} = CURRENT_TIMESTAMP WHERE {cond}; END",
            trigger = self.quote_identifier(&format!("{}_modified_trigger", table.table_name)),
            table = self.quote_identifier(&table.table_name),
            col = self.quote_identifier(MODIFIED_COLUMN),
            cond = conditions.join(" AND ")
        ))
    }

    fn create_index_sql(&self, table_name: &str, column_name: &str, unique: bool) -> String {
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote_identifier(&format!("idx_{table_name}_{column_name}")),
            self.quote_identifier(table_name),
            self.quote_identifier(column_name)
        )
    }

    fn add_column_sql(
        &self,
        migration: &Migration,
        target: &SchemaSnapshot,
    ) -> Result<String> {
        let table = self.target_table(target, &migration.table_name)?;
        let column_name = migration.column_name.as_deref().ok_or_else(|| {
            MigrateError::InvalidState(format!(
                "{} for '{}' is missing a column name",
                migration.kind.name(),
                migration.table_name
            ))
        })?;
        let column = table.get_column(column_name).ok_or_else(|| {
            MigrateError::InvalidState(format!(
                "column '{}.{column_name}' not found in target schema",
                migration.table_name
            ))
        })?;

        // SQLite rejects UNIQUE inside ADD COLUMN; uniqueness arrives via
        // the paired unique-index migration.
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(&table.table_name),
            self.column_definition(column, target, false)?
        ))
    }

    /// The five-step rebuild used for changes SQLite cannot apply in place.
    fn rebuild_statements(
        &self,
        migration: &Migration,
        target: &SchemaSnapshot,
    ) -> Result<Vec<String>> {
        let table = self.target_table(target, &migration.table_name)?;
        let existing = migration
            .get_extra(EXTRA_EXISTING_COLUMNS)
            .ok_or_else(|| {
                MigrateError::InvalidState(format!(
                    "{} for '{}' is missing the existing column list",
                    migration.kind.name(),
                    migration.table_name
                ))
            })?;

        let table_ident = self.quote_identifier(&table.table_name);
        let temp_ident = self.quote_identifier(&format!("temp_{}", table.table_name));

        if existing.is_empty() {
            // Nothing to carry over; drop and re-create is enough.
            let mut statements = vec![format!("DROP TABLE {table_ident}")];
            statements.extend(self.create_table_statements(table, target)?);
            return Ok(statements);
        }

        let columns: Vec<String> = existing
            .split(',')
            .map(|c| self.quote_identifier(c))
            .collect();
        let column_list = columns.join(", ");

        let mut statements = vec![
            format!("CREATE TEMP TABLE {temp_ident} AS SELECT {column_list} FROM {table_ident}"),
            format!("DROP TABLE {table_ident}"),
        ];
        statements.extend(self.create_table_statements(table, target)?);
        statements.push(format!(
            "INSERT INTO {table_ident} ({column_list}) SELECT {column_list} FROM {temp_ident}"
        ));
        statements.push(format!("DROP TABLE {temp_ident}"));

        Ok(statements)
    }
}

impl MigrationDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn statements(&self, migration: &Migration, target: &SchemaSnapshot) -> Result<Vec<String>> {
        match migration.kind {
            MigrationKind::CreateTable => {
                let table = self.target_table(target, &migration.table_name)?;
                self.create_table_statements(table, target)
            }

            MigrationKind::DropTable => Ok(vec![format!(
                "DROP TABLE {}",
                self.quote_identifier(&migration.table_name)
            )]),

            MigrationKind::RenameTable => {
                let prev = migration.get_extra(EXTRA_PREV_NAME).ok_or_else(|| {
                    MigrateError::InvalidState(format!(
                        "RENAME_TABLE for '{}' is missing the previous name",
                        migration.table_name
                    ))
                })?;
                let curr = migration
                    .get_extra(EXTRA_CURR_NAME)
                    .unwrap_or(&migration.table_name);
                Ok(vec![format!(
                    "ALTER TABLE {} RENAME TO {}",
                    self.quote_identifier(prev),
                    self.quote_identifier(curr)
                )])
            }

            MigrationKind::AlterTableAddColumn
            | MigrationKind::AlterTableAddUnique
            | MigrationKind::AddForeignKeyReference => {
                Ok(vec![self.add_column_sql(migration, target)?])
            }

            MigrationKind::AddUniqueIndex | MigrationKind::AddIndex => {
                let column_name = migration.column_name.as_deref().ok_or_else(|| {
                    MigrateError::InvalidState(format!(
                        "{} for '{}' is missing a column name",
                        migration.kind.name(),
                        migration.table_name
                    ))
                })?;
                Ok(vec![self.create_index_sql(
                    &migration.table_name,
                    column_name,
                    migration.kind == MigrationKind::AddUniqueIndex,
                )])
            }

            // None of these can be expressed in place in SQLite.
            MigrationKind::MakeColumnUnique
            | MigrationKind::UpdateForeignKeys
            | MigrationKind::UpdatePrimaryKey
            | MigrationKind::ChangeDefaultValue => self.rebuild_statements(migration, target),
        }
    }

    fn type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Bool | SqlType::Int | SqlType::Long => "INTEGER",
            SqlType::Float | SqlType::Double => "REAL",
            SqlType::BigInt | SqlType::BigDecimal => "NUMERIC",
            SqlType::Text | SqlType::Timestamp => "TEXT",
            SqlType::Blob => "BLOB",
        }
    }

    fn supports_alter_column(&self) -> bool {
        false
    }

    fn supports_add_constraint(&self) -> bool {
        false
    }
}
