use dotenvy::dotenv;
use rostra::logging::init_tracing;
use rostra::metrics::init_metrics;
use rostra::router::init_router;
use rostra::state::init_app_state;
use rostra_config::ServerConfig;
use rostra_db::run_migrations;

#[tokio::main]
async fn main() {
    dotenv().ok();

    init_tracing();
    let metrics_handle = init_metrics();

    let server_config = ServerConfig::from_env();
    let state = init_app_state(&server_config).await;

    run_migrations(&state.db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!(
        strategy = %state.ids.strategy(),
        max_attempts = state.ids.max_attempts(),
        "Identifier allocation configured"
    );

    let app = init_router(state, metrics_handle);

    let address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind listener");

    tracing::info!(%address, "Server running");
    tracing::info!("Swagger UI available at http://{}/swagger-ui", address);
    tracing::info!("Scalar UI available at http://{}/scalar", address);

    axum::serve(listener, app).await.expect("Server error");
}
