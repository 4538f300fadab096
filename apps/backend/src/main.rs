use actix_web::{web, App, HttpServer};
use tracing::{error, info};
use zen_backend::config::AppConfig;
use zen_backend::infra::state::StateBuilder;
use zen_backend::middleware::{
    cors_middleware, RateLimits, RequestTrace, StructuredLogger, TraceSpan,
};
use zen_backend::routes;
use zen_backend::telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment
    // (docker env_file, or `set -a; . ./.env; set +a` locally).
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let state = match StateBuilder::from_config(&config).build().await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build application state");
            std::process::exit(1);
        }
    };

    info!(
        host = %config.host,
        port = config.port,
        store = state.store_backend,
        "starting Zen backend"
    );

    let data = web::Data::new(state);
    let limits = RateLimits::enabled();
    let cors_origins = config.cors_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware(&cors_origins))
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data.clone())
            .configure(|cfg| routes::configure(cfg, &limits))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
