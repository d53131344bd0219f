use rostra_config::{CorsConfig, JwtConfig, ServerConfig};
use rostra_db::{PgPool, init_db_pool};

use crate::modules::users::registration::IdentifierIssuer;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub ids: IdentifierIssuer,
}

pub async fn init_app_state(server_config: &ServerConfig) -> AppState {
    AppState {
        db: init_db_pool(server_config.max_connections).await,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        ids: IdentifierIssuer::from_env(),
    }
}
