//! House database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary at build time using include_str!.
//! Each migration is a tuple of (name, sql_content).
//! Migrations are sorted by name and applied in order.

/// All house migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// When adding a migration, create NNN_description.sql and add it here in order.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_house_schema.sql", include_str!("001_house_schema.sql")),
];
