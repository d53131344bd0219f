//! # Rostra Auth
//!
//! Access tokens for the Rostra API.
//!
//! - [`claims`]: the JWT claim structure
//! - [`jwt`]: token creation and verification
//!
//! Tokens carry the user's role and a `ver` claim. The auth middleware
//! compares `ver` with the user's current `token_version`; logging out
//! bumps that version, which revokes every token issued before it.
//!
//! # Example
//!
//! ```ignore
//! use rostra_auth::{create_access_token, verify_token};
//! use rostra_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(user_id, "user@example.com", "teacher", 0, &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.role, "teacher");
//! ```

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
