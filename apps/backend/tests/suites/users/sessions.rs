use actix_web::http::StatusCode;
use actix_web::test;
use backend_test_support::unique_helpers::unique_email;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::common::{assert_problem, assert_unauthorized, read_json};
use crate::support::factory::{seed_admin, seed_subject};
use crate::support::{create_test_app, test_state_builder};

#[actix_web::test]
async fn admins_list_sessions_newest_first() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let first = seed_subject(&state, None).await;
    let second = seed_subject(&state, None).await;
    let admin = seed_admin(&state).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::get()
        .uri("/api/users/sessions")
        .insert_header(admin.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;

    // The admin's own session was recorded by its seeding exchange.
    assert_eq!(body["count"], 3);
    let sessions = body["sessions"].as_array().unwrap();
    let last_logins: Vec<OffsetDateTime> = sessions
        .iter()
        .map(|s| OffsetDateTime::parse(s["lastLogin"].as_str().unwrap(), &Rfc3339).unwrap())
        .collect();
    assert!(last_logins.windows(2).all(|pair| pair[0] >= pair[1]));

    let ids: Vec<&str> = sessions
        .iter()
        .map(|s| s["externalId"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&first.subject.external_id.as_str()));
    assert!(ids.contains(&second.subject.external_id.as_str()));
    assert_eq!(sessions[0]["loginMethod"], "identity_provider");
    Ok(())
}

#[actix_web::test]
async fn filters_and_limits_apply() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let email = unique_email("sessions");
    let target = seed_subject(&state, Some(&email)).await;
    seed_subject(&state, None).await;
    let admin = seed_admin(&state).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/sessions?uid={}", target.subject.external_id))
        .insert_header(admin.bearer())
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["sessions"][0]["customerId"], target.customer_id().as_str());

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/sessions?email={}", email.to_uppercase()))
        .insert_header(admin.bearer())
        .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["sessions"][0]["email"], email.as_str());

    let req = test::TestRequest::get()
        .uri("/api/users/sessions?limit=2")
        .insert_header(admin.bearer())
        .to_request();
    assert_eq!(read_json(test::call_service(&app, req).await).await["count"], 2);
    Ok(())
}

#[actix_web::test]
async fn bad_limits_are_400() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let admin = seed_admin(&state).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::get()
        .uri("/api/users/sessions?limit=0")
        .insert_header(admin.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "VALIDATION_ERROR",
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/users/sessions?limit=lots")
        .insert_header(admin.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "BAD_REQUEST",
    )
    .await;
    Ok(())
}

#[actix_web::test]
async fn plain_users_cannot_list_sessions() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let user = seed_subject(&state, None).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::get()
        .uri("/api/users/sessions")
        .insert_header(user.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::FORBIDDEN,
        "FORBIDDEN",
    )
    .await;

    let req = test::TestRequest::get().uri("/api/users/sessions").to_request();
    assert_unauthorized(test::call_service(&app, req).await).await;
    Ok(())
}
