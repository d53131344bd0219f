//! # Rostra CLI
//!
//! Administration and seeding utilities for Rostra development databases.
//!
//! ```ignore
//! use rostra_cli::seeder::{seed_all, SeedConfig};
//!
//! seed_all(&pool, SeedConfig::default()).await?;
//! ```

pub mod seeder;
