use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test;
use futures_util::future::join;
use serde_json::json;
use zen_backend::state::security_config::RevocationFailMode;

use super::{fixture, fixture_from, request_reset};
use crate::common::{assert_problem, read_json};
use crate::support::fakes::{FailingLedger, RecordingMailer};
use crate::support::test_state::test_security;
use crate::support::{create_test_app, test_state_builder};

const NEW_PASSWORD: &str = "N3wPassword";

#[actix_web::test]
async fn link_token_resets_once_and_enables_login() {
    let fx = fixture().await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;
    let token = fx.mailer.link_token_for(&fx.email);
    let code = fx.mailer.code_for(&fx.email);

    let req = test::TestRequest::post()
        .uri("/api/password-reset/reset")
        .set_json(json!({ "token": token, "newPassword": NEW_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        read_json(resp).await["message"],
        "Password has been reset successfully"
    );

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": fx.email, "password": NEW_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["customerId"], fx.subject.customer_id().as_str());

    // Single use: the token is spent and the pending code was purged.
    let req = test::TestRequest::post()
        .uri("/api/password-reset/reset")
        .set_json(json!({ "token": token, "newPassword": "An0therPassword" }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "INVALID_RESET_TOKEN",
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/password-reset/verify-otp")
        .set_json(json!({ "email": fx.email, "otp": code }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "INVALID_CODE",
    )
    .await;
}

#[actix_web::test]
async fn confirm_token_from_code_completes_the_reset() {
    let fx = fixture().await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;

    let req = test::TestRequest::post()
        .uri("/api/password-reset/verify-otp")
        .set_json(json!({ "email": fx.email, "otp": fx.mailer.code_for(&fx.email) }))
        .to_request();
    let confirm = read_json(test::call_service(&app, req).await).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    for expected in [StatusCode::OK, StatusCode::BAD_REQUEST] {
        let req = test::TestRequest::post()
            .uri("/api/password-reset/reset")
            .set_json(json!({ "token": confirm, "newPassword": NEW_PASSWORD }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), expected);
    }
}

#[actix_web::test]
async fn code_alone_resets_once() {
    let fx = fixture().await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;
    let code = fx.mailer.code_for(&fx.email);

    let req = test::TestRequest::post()
        .uri("/api/password-reset/reset-combined")
        .set_json(json!({ "otp": code, "newPassword": NEW_PASSWORD }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/password-reset/reset-combined")
        .set_json(json!({ "otp": code, "newPassword": "An0therPassword" }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "INVALID_CODE",
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": fx.email, "password": NEW_PASSWORD }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn token_wins_when_both_proofs_are_sent() {
    let fx = fixture().await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;

    let req = test::TestRequest::post()
        .uri("/api/password-reset/reset-combined")
        .set_json(json!({
            "token": fx.mailer.link_token_for(&fx.email),
            "otp": "not-a-code",
            "newPassword": NEW_PASSWORD,
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn missing_proof_is_400() {
    let fx = fixture().await;
    let app = create_test_app(fx.state).with_prod_routes().build().await;

    for body in [
        json!({ "newPassword": NEW_PASSWORD }),
        json!({ "token": " ", "otp": "", "newPassword": NEW_PASSWORD }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/password-reset/reset-combined")
            .set_json(body)
            .to_request();
        assert_problem(
            test::call_service(&app, req).await,
            StatusCode::BAD_REQUEST,
            "MISSING_RESET_PROOF",
        )
        .await;
    }
}

#[actix_web::test]
async fn weak_password_does_not_spend_the_proof() {
    let fx = fixture().await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;
    let code = fx.mailer.code_for(&fx.email);

    let req = test::TestRequest::post()
        .uri("/api/password-reset/reset-combined")
        .set_json(json!({ "otp": code, "newPassword": "short" }))
        .to_request();
    let problem = assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "WEAK_PASSWORD",
    )
    .await;
    assert!(problem.detail.contains("8 characters"));

    let req = test::TestRequest::post()
        .uri("/api/password-reset/reset-combined")
        .set_json(json!({ "otp": code, "newPassword": NEW_PASSWORD }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn reset_for_a_deleted_subject_is_descriptive() {
    let fx = fixture().await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;
    fx.state
        .subjects
        .delete(&fx.subject.subject.customer_id)
        .await
        .expect("delete subject");

    let req = test::TestRequest::post()
        .uri("/api/password-reset/reset")
        .set_json(json!({
            "token": fx.mailer.link_token_for(&fx.email),
            "newPassword": NEW_PASSWORD,
        }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "SUBJECT_NOT_FOUND",
    )
    .await;
}

#[actix_web::test]
async fn emailed_token_replayed_through_combined_route_is_refused() {
    let fx = fixture().await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;
    let token = fx.mailer.link_token_for(&fx.email);

    for (password, expected) in [
        (NEW_PASSWORD, StatusCode::OK),
        ("An0therPassword", StatusCode::BAD_REQUEST),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/password-reset/reset-combined")
            .set_json(json!({ "token": token, "newPassword": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        if expected == StatusCode::OK {
            assert_eq!(resp.status(), StatusCode::OK);
        } else {
            assert_problem(resp, expected, "INVALID_RESET_TOKEN").await;
        }
    }

    // The replay did not overwrite the first password.
    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": fx.email, "password": NEW_PASSWORD }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn concurrent_combined_resets_with_one_token_succeed_once() {
    let fx = fixture().await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;
    let token = fx.mailer.link_token_for(&fx.email);

    let first = test::TestRequest::post()
        .uri("/api/password-reset/reset-combined")
        .set_json(json!({ "token": token, "newPassword": "F1rstPassword" }))
        .to_request();
    let second = test::TestRequest::post()
        .uri("/api/password-reset/reset-combined")
        .set_json(json!({ "token": token, "newPassword": "S3condPassword" }))
        .to_request();
    let (a, b) = join(
        test::call_service(&app, first),
        test::call_service(&app, second),
    )
    .await;

    let (winner, loser, password) = match (a.status(), b.status()) {
        (StatusCode::OK, _) => (a, b, "F1rstPassword"),
        (_, StatusCode::OK) => (b, a, "S3condPassword"),
        other => panic!("expected one success, got {other:?}"),
    };
    assert_eq!(winner.status(), StatusCode::OK);
    assert_problem(loser, StatusCode::BAD_REQUEST, "INVALID_RESET_TOKEN").await;

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": fx.email, "password": password }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn ledger_outage_during_reset_does_not_set_the_password() {
    // Fail-open still lets the token verify; only the spend can fail.
    let builder = test_state_builder()
        .with_security(test_security().with_fail_mode(RevocationFailMode::Open))
        .with_ledger(Arc::new(FailingLedger));
    let fx = fixture_from(builder, RecordingMailer::default()).await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;

    let req = test::TestRequest::post()
        .uri("/api/password-reset/reset")
        .set_json(json!({
            "token": fx.mailer.link_token_for(&fx.email),
            "newPassword": NEW_PASSWORD,
        }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::INTERNAL_SERVER_ERROR,
        "STORE_UNAVAILABLE",
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": fx.email, "password": NEW_PASSWORD }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}
