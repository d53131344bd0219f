//! # Rostra Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`jwt`]: JWT authentication configuration
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`ids`]: Sequential identifier allocation configuration
//! - [`server`]: Listener and database pool configuration
//!
//! # Example
//!
//! ```ignore
//! use rostra_config::{CorsConfig, IdAllocationConfig, JwtConfig, ServerConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let id_config = IdAllocationConfig::from_env();
//! let server_config = ServerConfig::from_env();
//! ```

pub mod cors;
pub mod ids;
pub mod jwt;
pub mod server;

pub use cors::CorsConfig;
pub use ids::{IdAllocationConfig, IdStrategy};
pub use jwt::JwtConfig;
pub use server::ServerConfig;
