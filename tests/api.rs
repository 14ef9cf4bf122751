mod common;

use actix_web::http::StatusCode;
use actix_web::web::{scope, Data};
use actix_web::{test, App};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use bugvault::api;
use bugvault::auth::{AuthMiddleware, JwtVerifier};
use bugvault::model::auth::{Actor, Claims};

use common::Fixture;

const SECRET: &str = "api-test-secret";

fn bearer(actor: &Actor) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: actor.user_id.unwrap().to_string(),
        role: actor.role.clone(),
        exp: (now + Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
    format!("Bearer {}", token)
}

macro_rules! app {
    ($fx:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::from($fx.workflow.clone()))
                .service(api::health_check)
                .service(
                    scope("/api")
                        .wrap(AuthMiddleware::new(JwtVerifier::new(SECRET)))
                        .configure(api::configure),
                ),
        )
        .await
    };
}

#[actix_web::test]
async fn health_check_needs_no_token() {
    let fx = Fixture::new().await;
    let app = app!(fx);

    let req = test::TestRequest::get().uri("/health-check").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn api_rejects_missing_token() {
    let fx = Fixture::new().await;
    let app = app!(fx);

    let req = test::TestRequest::get().uri("/api/notifications").to_request();
    let err = test::try_call_service(&app, req).await.err().unwrap();
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn report_and_move_a_bug_over_http() {
    let fx = Fixture::new().await;
    let app = app!(fx);
    let reporter = bearer(&fx.reporter);
    let developer = bearer(&fx.dev_actor);

    let req = test::TestRequest::post()
        .uri(&format!("/api/projects/{}/bugs", fx.project.id))
        .insert_header(("Authorization", reporter.as_str()))
        .set_json(json!({ "title": "Crash on save", "severity": "high", "tags": ["editor"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "open");
    assert_eq!(created["severity"], "high");
    let bug_id = created["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/bugs/{}/status", bug_id))
        .insert_header(("Authorization", developer.as_str()))
        .set_json(json!({ "status": "closed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "InvalidTransition");

    let req = test::TestRequest::put()
        .uri(&format!("/api/bugs/{}/status", bug_id))
        .insert_header(("Authorization", developer.as_str()))
        .set_json(json!({ "status": "done" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/api/bugs/{}/status", bug_id))
        .insert_header(("Authorization", developer.as_str()))
        .set_json(json!({ "status": "in_progress" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/bugs/{}", bug_id))
        .insert_header(("Authorization", developer.as_str()))
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["bug"]["status"], "in_progress");
    assert_eq!(detail["tags"], json!(["editor"]));

    let req = test::TestRequest::get()
        .uri(&format!("/api/bugs/{}/activity", bug_id))
        .insert_header(("Authorization", developer.as_str()))
        .to_request();
    let activity: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(activity.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn blocked_resolution_reports_blocking_ids() {
    let fx = Fixture::new().await;
    let app = app!(fx);
    let developer = bearer(&fx.dev_actor);

    let blocked = fx.report("Blocked").await;
    let blocker = fx.report("Blocker").await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/bugs/{}/dependencies", blocked.id))
        .insert_header(("Authorization", developer.as_str()))
        .set_json(json!({ "dependsOnId": blocker.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::post()
        .uri(&format!("/api/bugs/{}/dependencies", blocked.id))
        .insert_header(("Authorization", developer.as_str()))
        .set_json(json!({ "dependsOnId": blocked.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    for status in ["in_progress", "resolved"] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/bugs/{}/status", blocked.id))
            .insert_header(("Authorization", developer.as_str()))
            .set_json(json!({ "status": status }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        if status == "resolved" {
            assert_eq!(resp.status(), StatusCode::CONFLICT);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["code"], "UnresolvedDependency");
            assert_eq!(body["blockingBugIds"], json!([blocker.id]));
        }
    }

    let req = test::TestRequest::delete()
        .uri(&format!("/api/bugs/{}/dependencies/{}", blocked.id, blocker.id))
        .insert_header(("Authorization", developer.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn notifications_are_listed_and_marked_read() {
    let fx = Fixture::new().await;
    let app = app!(fx);
    let developer = bearer(&fx.dev_actor);

    fx.report_assigned("For the dev").await;

    let req = test::TestRequest::get()
        .uri("/api/notifications")
        .insert_header(("Authorization", developer.as_str()))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    let first = &list.as_array().unwrap()[0];
    assert_eq!(first["isRead"], false);
    let id = first["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/notifications/{}/read", id))
        .insert_header(("Authorization", bearer(&fx.reporter).as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/api/notifications/{}/read", id))
        .insert_header(("Authorization", developer.as_str()))
        .to_request();
    let read: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(read["isRead"], true);
}

#[actix_web::test]
async fn out_of_range_time_is_a_bad_request() {
    let fx = Fixture::new().await;
    let app = app!(fx);
    let developer = bearer(&fx.dev_actor);
    let bug = fx.report("Time sink").await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/bugs/{}/time", bug.id))
        .insert_header(("Authorization", developer.as_str()))
        .set_json(json!({ "workerId": fx.developer.id, "seconds": i64::MAX }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "InvalidDuration");

    let req = test::TestRequest::post()
        .uri(&format!("/api/bugs/{}/time", bug.id))
        .insert_header(("Authorization", developer.as_str()))
        .set_json(json!({ "workerId": fx.developer.id, "seconds": 1800 }))
        .to_request();
    let logged: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(logged["timeSpentSecs"], 1800);
}
