//! Schema diffing and migration generation for SQLite-backed schemas.
//!
//! `tabula-migrate` compares two immutable schema snapshots and turns the
//! difference into an ordered set of migrations, then synthesizes executable
//! DDL through a database dialect:
//!
//! - **Schema** - Snapshot model: tables keyed by a stable id, columns,
//!   primary keys, foreign keys
//! - **DiffGenerator** - Detects created, dropped and changed tables, and
//!   emits additive column changes directly as migrations
//! - **MigrationPlanner** - Expands diffs into atomic migrations with a
//!   guaranteed execution order and a single version increment per run
//! - **Dialect** - Database-specific SQL generation, including the
//!   temp-copy rebuild pattern for alterations SQLite cannot express in
//!   place
//! - **MigrationHistory** - Records each planned set on disk; the latest
//!   recorded target schema is the base for the next run
//!
//! # Example
//!
//! ```rust
//! use tabula_migrate::prelude::*;
//!
//! let base = SchemaSnapshot::new();
//! let target = SchemaSnapshot::new().table(
//!     Table::new("com.example.User", "user")
//!         .column(Column::new("id", SqlType::Long))
//!         .column(Column::new("email", SqlType::Text).unique())
//!         .primary_key(vec!["id".to_string()]),
//! );
//!
//! let diff = DiffGenerator::new().generate(&base, &target)?;
//! let set = MigrationPlanner::new().plan(&diff, &target, 0)?;
//! assert_eq!(set.db_version, 1);
//!
//! let sql = SqliteDialect::new().synthesize(&set)?;
//! assert!(sql[0].starts_with("CREATE TABLE"));
//! # Ok::<(), tabula_migrate::error::MigrateError>(())
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the diff between the recorded schema and a target snapshot
//! tabula-migrate diff --target schema.json
//!
//! # Plan migrations, print the SQL and record the set
//! tabula-migrate plan --target schema.json
//!
//! # List recorded migration sets
//! tabula-migrate show-history
//! ```

pub mod depsort;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod history;
pub mod migration;
pub mod planner;
pub mod schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::depsort::sort_by_dependencies;
    pub use crate::dialect::{MigrationDialect, SqliteDialect};
    pub use crate::diff::{DiffGenerator, SchemaDiff, SchemaDiffSet, TableChanges};
    pub use crate::error::{MigrateError, Result};
    pub use crate::history::MigrationHistory;
    pub use crate::migration::{Migration, MigrationKind, MigrationSet};
    pub use crate::planner::MigrationPlanner;
    pub use crate::schema::{
        Column, ColumnReference, ForeignKey, ForeignKeyAction, SchemaSnapshot, SqlType, Table,
    };
}
