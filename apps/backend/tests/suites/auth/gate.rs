use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{test, web, HttpResponse};
use serde_json::json;
use time::OffsetDateTime;
use zen_backend::domain::Role;
use zen_backend::middleware::{AuthGate, Policy, RoleGate};
use zen_backend::services::CredentialService;
use zen_backend::{CurrentSubject, SecurityConfig};

use crate::common::{assert_problem, assert_unauthorized, read_json};
use crate::support::factory::{seed_admin, seed_subject};
use crate::support::{create_test_app, test_state_builder};

async fn whoami(current: CurrentSubject) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "externalId": current.external_id,
        "customerId": current.customer_id,
        "role": current.role,
    }))
}

fn guarded_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/_test")
            .service(
                web::resource("/owned/{customer_id}")
                    .wrap(RoleGate::new(Policy::roles([Role::Admin]).or_owner("customer_id")))
                    .wrap(AuthGate)
                    .route(web::get().to(whoami)),
            )
            .service(
                web::resource("/me")
                    .wrap(AuthGate)
                    .route(web::get().to(whoami)),
            ),
    );
}

#[actix_web::test]
async fn bearer_header_attaches_identity() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let seeded = seed_subject(&state, None).await;
    let app = create_test_app(state).with_routes(guarded_routes).build().await;

    let req = test::TestRequest::get()
        .uri("/_test/me")
        .insert_header(seeded.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["customerId"], seeded.customer_id().as_str());
    assert_eq!(body["externalId"], seeded.subject.external_id.as_str());
    assert_eq!(body["role"], "user");
    Ok(())
}

#[actix_web::test]
async fn missing_credentials_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let app = create_test_app(state).with_routes(guarded_routes).build().await;

    let req = test::TestRequest::get().uri("/_test/me").to_request();
    assert_unauthorized(test::call_service(&app, req).await).await;
    Ok(())
}

#[actix_web::test]
async fn malformed_headers_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let app = create_test_app(state).with_routes(guarded_routes).build().await;

    for value in ["Token abc", "Bearer", "Bearer ", "Bearer a b", "bearer abc"] {
        let req = test::TestRequest::get()
            .uri("/_test/me")
            .insert_header(("Authorization", value))
            .to_request();
        assert_unauthorized(test::call_service(&app, req).await).await;
    }
    Ok(())
}

#[actix_web::test]
async fn cookie_carrier_is_the_fallback() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let seeded = seed_subject(&state, None).await;
    let app = create_test_app(state).with_routes(guarded_routes).build().await;

    let req = test::TestRequest::get()
        .uri("/_test/me")
        .cookie(Cookie::new("token", seeded.token.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // The header wins over a junk cookie...
    let req = test::TestRequest::get()
        .uri("/_test/me")
        .insert_header(seeded.bearer())
        .cookie(Cookie::new("token", "junk"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // ...and a bad header never falls back to a good cookie.
    let req = test::TestRequest::get()
        .uri("/_test/me")
        .insert_header(("Authorization", "Basic Zm9vOmJhcg=="))
        .cookie(Cookie::new("token", seeded.token.clone()))
        .to_request();
    assert_unauthorized(test::call_service(&app, req).await).await;
    Ok(())
}

#[actix_web::test]
async fn expired_forged_and_revoked_tokens_look_alike() -> Result<(), Box<dyn std::error::Error>>
{
    let state = test_state_builder().build().await?;
    let seeded = seed_subject(&state, None).await;
    let subject = &seeded.subject;
    let now = OffsetDateTime::now_utc();

    let expired = state
        .credentials
        .issue(
            &subject.external_id,
            subject.customer_id.as_str(),
            subject.role,
            Some(Duration::from_secs(60)),
            now - Duration::from_secs(120),
        )?
        .token;

    let foreign = CredentialService::new(
        SecurityConfig::new(b"some-other-signing-key".to_vec()),
        std::sync::Arc::new(zen_backend::adapters::memory::MemoryRevocationLedger::new()),
    );
    let forged = foreign
        .issue(&subject.external_id, subject.customer_id.as_str(), Role::Admin, None, now)?
        .token;

    let revoked = state
        .credentials
        .issue(&subject.external_id, subject.customer_id.as_str(), subject.role, None, now)?
        .token;
    state.credentials.revoke(&revoked, now).await?;

    let app = create_test_app(state).with_routes(guarded_routes).build().await;
    for token in [expired, forged, revoked, "not.a.jwt".to_string()] {
        let req = test::TestRequest::get()
            .uri("/_test/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        assert_unauthorized(test::call_service(&app, req).await).await;
    }
    Ok(())
}

#[actix_web::test]
async fn role_gate_allows_admins_and_owners_only() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let owner = seed_subject(&state, None).await;
    let other = seed_subject(&state, None).await;
    let admin = seed_admin(&state).await;
    let app = create_test_app(state).with_routes(guarded_routes).build().await;

    let uri = format!("/_test/owned/{}", owner.customer_id());

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(owner.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(admin.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(other.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::FORBIDDEN,
        "FORBIDDEN",
    )
    .await;

    // Authentication is checked before authorization.
    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_unauthorized(test::call_service(&app, req).await).await;
    Ok(())
}
