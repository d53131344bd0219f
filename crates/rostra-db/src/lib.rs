//! # Rostra DB
//!
//! Database pool initialization and schema migrations for the Rostra API,
//! using SQLx with PostgreSQL.
//!
//! # Example
//!
//! ```ignore
//! use rostra_db::{init_db_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = init_db_pool(10).await;
//!     run_migrations(&pool).await.expect("migrations failed");
//! }
//! ```

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use std::env;

/// Schema migrations embedded from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Initializes a PostgreSQL connection pool.
///
/// Reads the database URL from the `DATABASE_URL` environment variable.
/// The returned pool is cheaply cloneable and is meant to live in the
/// application state.
///
/// # Panics
///
/// Panics if:
/// - `DATABASE_URL` environment variable is not set
/// - Connection to the database fails
pub async fn init_db_pool(max_connections: u32) -> PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

/// Applies any pending migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;
    tracing::info!(migrations = MIGRATOR.iter().count(), "Database migrations applied");
    Ok(())
}

/// Returns true when `err` is a unique-constraint violation on `constraint`.
///
/// Used to tell an identifier collision apart from, say, a duplicate email.
pub fn is_unique_violation_on(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

// Re-export PgPool for convenience
pub use sqlx::PgPool;
