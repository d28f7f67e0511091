mod common;

use actix_web::{test, web, App};
use kidsteps::routes::config;
use serde_json::{json, Value};
use serial_test::serial;

use common::Harness;

#[actix_web::test]
#[serial]
async fn register_then_login() {
    let h = Harness::without_users();
    let app = test::init_service(App::new().app_data(web::Data::new(h.state.clone())).configure(config)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"name":"Asha","contact":"555-0101","username":"asha","password":"pw1","role":"parent"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["id"], 1);
    assert_eq!(body["user"]["role"], "parent");
    assert!(body["user"].get("password").is_none());

    // second user gets max + 1
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"name":"Ben","contact":"555-0202","username":"ben","password":"pw2","role":"volunteer"}))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["user"]["id"], 2);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"username":"asha","password":"pw1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["username"], "asha");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"username":"asha","password":"wrong"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[actix_web::test]
#[serial]
async fn register_rejects_duplicates_and_bad_input() {
    let h = Harness::new();
    let app = test::init_service(App::new().app_data(web::Data::new(h.state.clone())).configure(config)).await;

    // contact already used by seeded parent
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"name":"X","contact":"555-0101","username":"new","password":"p","role":"parent"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Username or contact already exists");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"name":"X","contact":"1","username":"x","password":"p","role":"admin"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid role");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"name":"X","username":"x","password":"p","role":"parent"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // malformed body goes through the JSON error handler
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{oops")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[actix_web::test]
async fn health_reports_ok() {
    let h = Harness::new();
    let app = test::init_service(App::new().app_data(web::Data::new(h.state.clone())).configure(config)).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"status": "OK", "message": "Server is running"}));
}
