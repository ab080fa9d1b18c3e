//! Database dialect implementations.
//!
//! Each dialect knows how to turn a [`Migration`] into literal DDL for one
//! target database, including workarounds for alterations the database
//! cannot express in place.

mod sqlite;

pub use sqlite::SqliteDialect;

use crate::error::{MigrateError, Result};
use crate::migration::{Migration, MigrationSet};
use crate::schema::{Column, ForeignKeyAction, SchemaSnapshot, SqlType, CURRENT_TIME_SENTINEL};

/// Trait for dialect-specific DDL synthesis.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates the DDL statements for one migration, without trailing
    /// semicolons.
    fn statements(&self, migration: &Migration, target: &SchemaSnapshot) -> Result<Vec<String>>;

    /// Returns the storage type name for the given semantic type.
    fn type_name(&self, sql_type: SqlType) -> &'static str;

    /// Whether this dialect can alter a column in place.
    fn supports_alter_column(&self) -> bool;

    /// Whether this dialect can add a constraint after table creation.
    fn supports_add_constraint(&self) -> bool;

    /// Translates a full migration set into ordered DDL statements, each
    /// terminated with `;`, safe to execute in sequence inside a single
    /// transaction.
    fn synthesize(&self, set: &MigrationSet) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        for migration in &set.migrations {
            for statement in self.statements(migration, &set.target_schema)? {
                statements.push(format!("{statement};"));
            }
        }
        Ok(statements)
    }

    /// Quotes an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{name}\"")
    }

    /// Renders a default-value literal.
    ///
    /// Literals are single-quoted with embedded quotes doubled; the
    /// current-time sentinel on timestamp columns renders as an unquoted
    /// expression.
    fn render_default(&self, sql_type: SqlType, literal: &str) -> String {
        if sql_type == SqlType::Timestamp && literal.eq_ignore_ascii_case(CURRENT_TIME_SENTINEL) {
            CURRENT_TIME_SENTINEL.to_string()
        } else {
            format!("'{}'", literal.replace('\'', "''"))
        }
    }

    /// Generates one column definition clause.
    ///
    /// `inline_unique` controls whether a UNIQUE constraint may appear in
    /// the definition; dialects that forbid it in `ADD COLUMN` pass `false`
    /// and supply uniqueness through an index instead.
    fn column_definition(
        &self,
        column: &Column,
        target: &SchemaSnapshot,
        inline_unique: bool,
    ) -> Result<String> {
        let mut parts = vec![
            self.quote_identifier(&column.name),
            self.type_name(column.sql_type).to_string(),
        ];

        if !column.nullable() {
            parts.push("NOT NULL".to_string());
        }

        if inline_unique && column.unique {
            parts.push("UNIQUE".to_string());
        }

        if let Some(literal) = &column.default_value {
            parts.push(format!(
                "DEFAULT {}",
                self.render_default(column.sql_type, literal)
            ));
        }

        if let Some(reference) = &column.foreign_key {
            let parent = target
                .get_table(&reference.references_table)
                .ok_or_else(|| {
                    MigrateError::InvalidState(format!(
                        "foreign key on column '{}' references unknown table '{}'",
                        column.name, reference.references_table
                    ))
                })?;
            let mut clause = format!(
                "REFERENCES {}({})",
                self.quote_identifier(&parent.table_name),
                self.quote_identifier(&reference.references_column)
            );
            if reference.on_update != ForeignKeyAction::NoAction {
                clause.push_str(&format!(" ON UPDATE {}", reference.on_update.as_sql()));
            }
            if reference.on_delete != ForeignKeyAction::NoAction {
                clause.push_str(&format!(" ON DELETE {}", reference.on_delete.as_sql()));
            }
            parts.push(clause);
        }

        Ok(parts.join(" "))
    }
}
