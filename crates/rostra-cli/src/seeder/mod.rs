//! Database seeding for development and manual testing.

pub mod models;
pub mod users;

pub use models::{SeedConfig, UserSeed};
pub use users::{clear_users, generate_users, insert_users, seed_users};

use rostra_config::IdAllocationConfig;
use sqlx::PgPool;
use std::time::Instant;

/// Seeds users for every role and prints a summary.
pub async fn seed_all(
    db: &PgPool,
    config: SeedConfig,
    id_config: &IdAllocationConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🌱 Starting database seeding...");

    let inserted = seed_users(db, &config, id_config).await?;

    println!(
        "\n✅ Seeded {} users in {:?} (password: {})",
        inserted,
        start_time.elapsed(),
        config.password
    );
    Ok(())
}

/// Removes all seeded users.
pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let deleted = clear_users(db).await?;
    println!("\n✅ Cleared {} seeded users", deleted);
    Ok(())
}
