//! # Rostra Core
//!
//! Foundational types shared by every Rostra crate:
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`pagination`]: `page`/`per_page` query parameters and response metadata
//! - [`password`]: bcrypt password hashing and verification
//! - [`serde`]: Custom serde deserialization helpers for query parameters
//!
//! # Example
//!
//! ```ignore
//! use rostra_core::errors::AppError;
//! use rostra_core::password::{hash_password, verify_password};
//!
//! let error = AppError::not_found(anyhow::anyhow!("User not found"));
//!
//! let hash = hash_password("secure_password")?;
//! assert!(verify_password("secure_password", &hash)?);
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod serde;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
