//! Seeding configuration and generated rows.

use rostra_models::UserRole;

/// Seed data for one user. Teachers and students get their profile and
/// identifier at insert time.
pub struct UserSeed {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// How many users of each role to create.
#[derive(Clone, Debug)]
pub struct SeedConfig {
    pub admins: usize,
    pub teachers: usize,
    pub students: usize,
    pub password: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admins: 1,
            teachers: 10,
            students: 20,
            password: "password123".to_string(),
        }
    }
}

impl SeedConfig {
    pub fn total(&self) -> usize {
        self.admins + self.teachers + self.students
    }
}
