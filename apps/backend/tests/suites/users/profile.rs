use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use zen_backend::domain::RolePermissions;

use crate::common::{assert_problem, read_json};
use crate::support::factory::{seed_admin, seed_subject};
use crate::support::{create_test_app, test_state_builder};

#[actix_web::test]
async fn owners_read_and_rename_themselves() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let owner = seed_subject(&state, None).await;
    let app = create_test_app(state).with_prod_routes().build().await;
    let uri = format!("/api/users/{}", owner.customer_id());

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(owner.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["customerId"], owner.customer_id().as_str());
    assert_eq!(body["displayName"], "Test Subject");
    assert!(body.get("passwordHash").is_none());

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(owner.bearer())
        .set_json(json!({ "displayName": "  Grace  " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["displayName"], "Grace");

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(owner.bearer())
        .set_json(json!({ "displayName": "x".repeat(101) }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "VALIDATION_ERROR",
    )
    .await;
    Ok(())
}

#[actix_web::test]
async fn strangers_are_forbidden_admins_are_not() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let owner = seed_subject(&state, None).await;
    let stranger = seed_subject(&state, None).await;
    let admin = seed_admin(&state).await;
    let app = create_test_app(state).with_prod_routes().build().await;
    let uri = format!("/api/users/{}", owner.customer_id());

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(stranger.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::FORBIDDEN,
        "FORBIDDEN",
    )
    .await;

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(admin.bearer())
        .set_json(json!({ "displayName": "Renamed by admin" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["displayName"], "Renamed by admin");
    Ok(())
}

#[actix_web::test]
async fn owner_access_still_needs_profile_permission() -> Result<(), Box<dyn std::error::Error>> {
    let roles = RolePermissions::from_json(r#"{"user": [], "admin": ["subjects:manage"]}"#)?;
    let state = test_state_builder().with_roles(roles).build().await?;
    let owner = seed_subject(&state, None).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", owner.customer_id()))
        .insert_header(owner.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::FORBIDDEN,
        "INSUFFICIENT_ROLE",
    )
    .await;
    Ok(())
}

#[actix_web::test]
async fn unknown_and_malformed_ids() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let admin = seed_admin(&state).await;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::get()
        .uri("/api/users/ZEN000101000000001")
        .insert_header(admin.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::NOT_FOUND,
        "SUBJECT_NOT_FOUND",
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/users/not-an-id")
        .insert_header(admin.bearer())
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "VALIDATION_ERROR",
    )
    .await;
    Ok(())
}
