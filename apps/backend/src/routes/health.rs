use actix_web::{web, HttpResponse};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::state::app_state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    app_version: &'static str,
    store: &'static str,
    store_status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    time: OffsetDateTime,
}

/// 200 when the store answers a ping, 503 otherwise.
async fn health(state: web::Data<AppState>) -> HttpResponse {
    let reachable = match state.subjects.ping().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "health check: store unreachable");
            false
        }
    };
    let body = HealthResponse {
        status: if reachable { "ok" } else { "degraded" },
        app_version: env!("CARGO_PKG_VERSION"),
        store: state.store_backend,
        store_status: if reachable { "ok" } else { "unreachable" },
        time: OffsetDateTime::now_utc(),
    };
    if reachable {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
