use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use time::OffsetDateTime;

use super::{fixture, request_reset};
use crate::common::{assert_problem, read_json};
use crate::support::create_test_app;

#[actix_web::test]
async fn correct_code_yields_a_confirm_token_once() {
    let fx = fixture().await;
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;
    request_reset(&app, &fx.email).await;
    let code = fx.mailer.code_for(&fx.email);

    // A wrong guess does not burn the pending code.
    let wrong = if code == "000000" { "000001" } else { "000000" };
    let req = test::TestRequest::post()
        .uri("/api/password-reset/verify-otp")
        .set_json(json!({ "email": fx.email, "otp": wrong }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "INVALID_CODE",
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/password-reset/verify-otp")
        .set_json(json!({ "email": fx.email, "otp": code }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["message"], "OTP verified");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

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
async fn expired_code_is_rejected_then_gone() {
    let fx = fixture().await;
    let eleven_minutes_ago = OffsetDateTime::now_utc() - Duration::from_secs(11 * 60);
    fx.state
        .recovery
        .request_reset(&fx.email, eleven_minutes_ago)
        .await
        .expect("request reset");
    let code = fx.mailer.code_for(&fx.email);
    let app = create_test_app(fx.state.clone()).with_prod_routes().build().await;

    let req = test::TestRequest::post()
        .uri("/api/password-reset/verify-otp")
        .set_json(json!({ "email": fx.email, "otp": code }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "EXPIRED_CODE",
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

    // The emailed link expired with it.
    let token = fx.mailer.link_token_for(&fx.email);
    let req = test::TestRequest::get()
        .uri(&format!("/api/password-reset/verify-token?token={token}"))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "INVALID_RESET_TOKEN",
    )
    .await;
}

#[actix_web::test]
async fn verify_token_accepts_only_reset_links() {
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

    for token in [confirm.as_str(), fx.subject.token.as_str(), "garbage"] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/password-reset/verify-token?token={token}"))
            .to_request();
        assert_problem(
            test::call_service(&app, req).await,
            StatusCode::BAD_REQUEST,
            "INVALID_RESET_TOKEN",
        )
        .await;
    }

    let req = test::TestRequest::get()
        .uri("/api/password-reset/verify-token")
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "BAD_REQUEST",
    )
    .await;
}
