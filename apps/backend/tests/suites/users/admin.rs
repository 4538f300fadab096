use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use time::OffsetDateTime;
use zen_backend::domain::Role;

use crate::common::{assert_problem, read_json};
use crate::support::factory::{seed_admin, seed_subject};
use crate::support::{create_test_app, test_state_builder};

#[actix_web::test]
async fn role_change_applies_from_the_next_token() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let target = seed_subject(&state, None).await;
    let admin = seed_admin(&state).await;
    let app = create_test_app(state.clone()).with_prod_routes().build().await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}/role", target.customer_id()))
        .insert_header(admin.bearer())
        .set_json(json!({ "role": "admin" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["role"], "admin");

    // Tokens already out keep the role they were issued with.
    let claims = state
        .credentials
        .verify(&target.token, OffsetDateTime::now_utc())
        .await?;
    assert_eq!(claims.role, Role::User);

    let req = test::TestRequest::post()
        .uri("/api/auth/refresh-token")
        .insert_header(target.bearer())
        .to_request();
    let refreshed = read_json(test::call_service(&app, req).await).await;
    let claims = state
        .credentials
        .verify(refreshed["token"].as_str().unwrap(), OffsetDateTime::now_utc())
        .await?;
    assert_eq!(claims.role, Role::User, "refresh carries the old claims over");

    let stored = state
        .subjects
        .find_by_customer_id(&target.subject.customer_id)
        .await?
        .unwrap();
    assert_eq!(stored.role, Role::Admin);
    Ok(())
}

#[actix_web::test]
async fn unknown_role_is_400() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let target = seed_subject(&state, None).await;
    let admin = seed_admin(&state).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}/role", target.customer_id()))
        .insert_header(admin.bearer())
        .set_json(json!({ "role": "root" }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "INVALID_ROLE",
    )
    .await;
    Ok(())
}

#[actix_web::test]
async fn only_admins_change_roles_or_delete() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let owner = seed_subject(&state, None).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    // Owning the record is not enough here.
    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}/role", owner.customer_id()))
        .insert_header(owner.bearer())
        .set_json(json!({ "role": "admin" }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::FORBIDDEN,
        "FORBIDDEN",
    )
    .await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}", owner.customer_id()))
        .insert_header(owner.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::FORBIDDEN,
        "FORBIDDEN",
    )
    .await;
    Ok(())
}

#[actix_web::test]
async fn admin_delete_removes_the_subject() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let target = seed_subject(&state, None).await;
    let admin = seed_admin(&state).await;
    let app = create_test_app(state.clone()).with_prod_routes().build().await;
    let uri = format!("/api/users/{}", target.customer_id());

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(admin.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(admin.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::NOT_FOUND,
        "SUBJECT_NOT_FOUND",
    )
    .await;

    assert!(state
        .subjects
        .find_by_external_id(&target.subject.external_id)
        .await?
        .is_none());

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(admin.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::NOT_FOUND,
        "SUBJECT_NOT_FOUND",
    )
    .await;
    Ok(())
}
