use actix_web::http::StatusCode;
use actix_web::test;
use backend_test_support::unique_helpers::unique_email;
use serde_json::json;
use zen_backend::repos::{LoginMethod, SessionFilter};

use crate::common::{assert_problem, assert_unauthorized, auth_cookie, read_json};
use crate::support::factory::{seed_subject, set_password};
use crate::support::{create_test_app, test_state_builder};

#[actix_web::test]
async fn correct_password_signs_in() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let email = unique_email("login");
    let seeded = seed_subject(&state, Some(&email)).await;
    set_password(&state, &seeded.subject, "Corr3ctHorse").await;
    let app = create_test_app(state.clone()).with_prod_routes().build().await;

    // Lookup is on the normalized email.
    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": format!("  {}  ", email.to_uppercase()), "password": "Corr3ctHorse" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(auth_cookie(&resp).is_some());

    let body = read_json(resp).await;
    assert_eq!(body["customerId"], seeded.customer_id().as_str());
    assert_eq!(body["isNewUser"], false);
    assert_eq!(body["user"]["hasPassword"], true);

    let filter = SessionFilter {
        external_id: None,
        email: Some(email),
    };
    let sessions = state.sessions.list_sessions(&filter, None).await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].login_method, LoginMethod::Password);
    Ok(())
}

#[actix_web::test]
async fn every_login_failure_is_the_same_401() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let with_password = unique_email("login");
    let seeded = seed_subject(&state, Some(&with_password)).await;
    set_password(&state, &seeded.subject, "Corr3ctHorse").await;
    let without_password = unique_email("login");
    seed_subject(&state, Some(&without_password)).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let attempts = [
        (with_password.as_str(), "wrong-Passw0rd"),
        (without_password.as_str(), "Corr3ctHorse"),
        ("nobody@example.test", "Corr3ctHorse"),
    ];
    for (email, password) in attempts {
        let req = test::TestRequest::post()
            .uri("/api/users/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        assert_unauthorized(test::call_service(&app, req).await).await;
    }
    Ok(())
}

#[actix_web::test]
async fn blank_fields_are_400() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": " ", "password": "" }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "VALIDATION_ERROR",
    )
    .await;
    Ok(())
}
