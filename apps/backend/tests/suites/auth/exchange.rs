use actix_web::http::StatusCode;
use actix_web::test;
use backend_test_support::unique_helpers::{unique_email, unique_external_id};
use serde_json::json;
use zen_backend::domain::CustomerId;
use zen_backend::repos::{LoginMethod, SessionFilter};

use crate::common::{assert_problem, assert_unauthorized, auth_cookie, read_json};
use crate::support::fakes::{fake_assertion, UNREACHABLE_ASSERTION};
use crate::support::{create_test_app, test_state_builder};

#[actix_web::test]
async fn first_exchange_creates_subject_and_session() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let app = create_test_app(state.clone()).with_prod_routes().build().await;

    let ext = unique_external_id();
    let email = unique_email("exchange");
    let req = test::TestRequest::post()
        .uri("/api/users/authenticate")
        .set_json(json!({ "idToken": fake_assertion(&ext, Some(&email), Some("Ada")) }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = auth_cookie(&resp).expect("token cookie");
    let body = read_json(resp).await;
    assert_eq!(body["isNewUser"], true);
    assert_eq!(body["role"], "user");
    assert_eq!(body["user"]["externalId"], ext.as_str());
    assert_eq!(body["user"]["email"], email.as_str());
    assert_eq!(body["user"]["displayName"], "Ada");
    assert_eq!(body["user"]["hasPassword"], false);
    assert_eq!(cookie.value(), body["token"].as_str().unwrap());
    assert_eq!(cookie.http_only(), Some(true));

    let customer_id = body["customerId"].as_str().unwrap();
    assert!(CustomerId::parse(customer_id).is_ok(), "{customer_id}");

    let claims = state
        .credentials
        .verify(body["token"].as_str().unwrap(), time::OffsetDateTime::now_utc())
        .await?;
    assert_eq!(claims.sub, ext);
    assert_eq!(claims.cid, customer_id);

    let filter = SessionFilter {
        external_id: Some(ext.clone()),
        email: None,
    };
    let sessions = state.sessions.list_sessions(&filter, None).await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].login_method, LoginMethod::IdentityProvider);
    assert_eq!(sessions[0].customer_id, customer_id);
    Ok(())
}

#[actix_web::test]
async fn repeated_exchange_returns_the_same_subject() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let app = create_test_app(state.clone()).with_prod_routes().build().await;
    let ext = unique_external_id();
    let assertion = fake_assertion(&ext, None, None);

    let mut customer_ids = Vec::new();
    let mut created = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/users/authenticate")
            .set_json(json!({ "idToken": assertion }))
            .to_request();
        let body = read_json(test::call_service(&app, req).await).await;
        customer_ids.push(body["customerId"].as_str().unwrap().to_string());
        created.push(body["isNewUser"].as_bool().unwrap());
    }
    assert_eq!(customer_ids[0], customer_ids[1]);
    assert_eq!(created, vec![true, false]);

    let subject = state.subjects.find_by_external_id(&ext).await?.unwrap();
    assert_eq!(subject.customer_id.to_string(), customer_ids[0]);

    let filter = SessionFilter {
        external_id: Some(ext),
        email: None,
    };
    let sessions = state.sessions.list_sessions(&filter, None).await?;
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].last_login >= sessions[0].created_at);
    Ok(())
}

#[actix_web::test]
async fn concurrent_first_logins_allocate_distinct_ids() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;

    let exchanges = (0..10).map(|_| {
        let state = state.clone();
        async move {
            let assertion = fake_assertion(&unique_external_id(), None, None);
            state
                .identity
                .exchange(&assertion, time::OffsetDateTime::now_utc())
                .await
        }
    });
    let outcomes = futures_util::future::join_all(exchanges).await;

    let mut ids = Vec::new();
    for outcome in outcomes {
        ids.push(outcome?.subject.customer_id.to_string());
    }
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
    Ok(())
}

#[actix_web::test]
async fn rejected_assertion_is_plain_401() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::post()
        .uri("/api/users/authenticate")
        .set_json(json!({ "idToken": "eyJhbGciOiJSUzI1NiJ9.forged.sig" }))
        .to_request();
    assert_unauthorized(test::call_service(&app, req).await).await;
    Ok(())
}

#[actix_web::test]
async fn missing_id_token_is_400() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::post()
        .uri("/api/users/authenticate")
        .set_json(json!({ "idToken": "   " }))
        .to_request();
    assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "INVALID_ID_TOKEN",
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/users/authenticate")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"idToken\": ")
        .to_request();
    let problem = assert_problem(
        test::call_service(&app, req).await,
        StatusCode::BAD_REQUEST,
        "BAD_REQUEST",
    )
    .await;
    assert!(problem.detail.starts_with("Invalid JSON"));
    Ok(())
}

#[actix_web::test]
async fn provider_outage_is_a_server_error() -> Result<(), Box<dyn std::error::Error>> {
    let state = test_state_builder().build().await?;
    let app = create_test_app(state).with_prod_routes().build().await;

    let req = test::TestRequest::post()
        .uri("/api/users/authenticate")
        .set_json(json!({ "idToken": UNREACHABLE_ASSERTION }))
        .to_request();
    let problem = assert_problem(
        test::call_service(&app, req).await,
        StatusCode::INTERNAL_SERVER_ERROR,
        "IDENTITY_PROVIDER_UNAVAILABLE",
    )
    .await;
    assert!(!problem.detail.contains("jwks"));
    Ok(())
}
