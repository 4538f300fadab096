use actix_cors::Cors;
use actix_web::http::header;

const LOCAL_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// CORS for the configured front-end origins. Credentials are allowed so the
/// browser can send the auth cookie, which rules out a wildcard origin.
pub fn cors_middleware(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .expose_headers(vec![
            header::HeaderName::from_static("x-trace-id"),
            header::HeaderName::from_static("x-request-id"),
        ])
        .supports_credentials()
        .max_age(3600);

    usable_origins(origins)
        .into_iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

/// Trimmed http(s) origins from config. `null`, blanks and other schemes are
/// dropped; an empty result falls back to the local dev server.
fn usable_origins(origins: &[String]) -> Vec<&str> {
    let usable: Vec<&str> = origins
        .iter()
        .map(|s| s.trim())
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .collect();
    if usable.is_empty() {
        LOCAL_ORIGINS.to_vec()
    } else {
        usable
    }
}
