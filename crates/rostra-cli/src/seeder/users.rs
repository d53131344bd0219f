//! Fake user generation and insertion.

use fake::Fake;
use fake::faker::name::en::*;
use rayon::prelude::*;
use rostra_config::IdAllocationConfig;
use rostra_ids::{IdAllocator, PgCounterStore, Year};
use rostra_models::UserRole;
use rostra_models::profiles::{
    DEFAULT_COURSE, DEFAULT_DEPARTMENT, DEFAULT_SPECIALIZATION, DEFAULT_YEAR_LEVEL,
};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;
use uuid::Uuid;

use super::models::{SeedConfig, UserSeed};

/// Generates users for every role in parallel.
pub fn generate_users(config: &SeedConfig, password_hash: &str) -> Vec<UserSeed> {
    let plan = [
        (UserRole::Admin, config.admins),
        (UserRole::Teacher, config.teachers),
        (UserRole::Student, config.students),
    ];

    plan.par_iter()
        .flat_map(|&(role, count)| {
            (0..count)
                .into_par_iter()
                .map(move |idx| generate_user(role, idx, password_hash))
        })
        .collect()
}

fn generate_user(role: UserRole, idx: usize, password_hash: &str) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();

    // The role+index suffix keeps emails unique within one run
    let email = format!(
        "{}.{}+{}{}@example.com",
        first_name.to_lowercase(),
        last_name.to_lowercase(),
        role,
        idx
    );

    UserSeed {
        name: format!("{} {}", first_name, last_name),
        email,
        password_hash: password_hash.to_string(),
        role,
    }
}

/// Inserts users and their profiles in a single transaction, allocating
/// identifiers from the counter store. Emails that already exist are
/// skipped without consuming an identifier.
pub async fn insert_users(
    db: &PgPool,
    users: &[UserSeed],
    id_config: &IdAllocationConfig,
) -> Result<usize, Box<dyn std::error::Error>> {
    let allocator = IdAllocator::new(id_config.max_attempts, id_config.backoff);
    let year = Year::current()?;
    let mut tx = db.begin().await?;
    let mut inserted = 0;

    for user in users {
        let Some(user_id) = insert_user(&mut tx, user).await? else {
            continue;
        };

        match user.role {
            UserRole::Admin => {
                sqlx::query("INSERT INTO admins (user_id) VALUES ($1)")
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
            UserRole::Teacher | UserRole::Student => {
                let class = user.role.entity_class().ok_or("role has no identifier")?;
                let mut store = PgCounterStore::new(&mut *tx, id_config.lock_timeout);
                let identifier = allocator.allocate(&mut store, class, year).await?;

                if user.role == UserRole::Teacher {
                    sqlx::query(
                        "INSERT INTO teachers (user_id, employee_id, department, specialization)
                         VALUES ($1, $2, $3, $4)",
                    )
                    .bind(user_id)
                    .bind(identifier.to_string())
                    .bind(DEFAULT_DEPARTMENT)
                    .bind(DEFAULT_SPECIALIZATION)
                    .execute(&mut *tx)
                    .await?;
                } else {
                    sqlx::query(
                        "INSERT INTO students (user_id, student_id, course, year_level)
                         VALUES ($1, $2, $3, $4)",
                    )
                    .bind(user_id)
                    .bind(identifier.to_string())
                    .bind(DEFAULT_COURSE)
                    .bind(DEFAULT_YEAR_LEVEL)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
        inserted += 1;
    }

    tx.commit().await?;
    Ok(inserted)
}

async fn insert_user(
    tx: &mut Transaction<'_, Postgres>,
    user: &UserSeed,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO users (name, email, password, role)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .fetch_optional(&mut **tx)
    .await
}

/// Seeds fake users of every role.
pub async fn seed_users(
    db: &PgPool,
    config: &SeedConfig,
    id_config: &IdAllocationConfig,
) -> Result<usize, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "👥 Seeding {} users ({} admins, {} teachers, {} students)...",
        config.total(),
        config.admins,
        config.teachers,
        config.students
    );

    // Seed users share one password, so hash it once at a low cost
    let hash_start = Instant::now();
    let password_hash = bcrypt::hash(&config.password, 4)
        .map_err(|e| format!("Failed to hash password: {}", e))?;
    println!("   ✓ Hashed password in {:?}", hash_start.elapsed());

    let users = generate_users(config, &password_hash);
    let inserted = insert_users(db, &users, id_config).await?;

    println!(
        "   ✓ Inserted {} users in {:?}",
        inserted,
        start_time.elapsed()
    );
    if inserted < users.len() {
        println!("   ⚠️  Skipped {} duplicate emails", users.len() - inserted);
    }

    Ok(inserted)
}

/// Deletes every user with an `@example.com` email. Profile rows cascade;
/// `id_counters` is left alone, so their identifiers are never reissued.
pub async fn clear_users(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded users...");

    let deleted = sqlx::query("DELETE FROM users WHERE email LIKE '%@example.com'")
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} users in {:?}",
        deleted,
        start_time.elapsed()
    );

    Ok(deleted)
}
