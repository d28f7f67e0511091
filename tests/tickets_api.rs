mod common;

use actix_web::{test, web, App};
use kidsteps::routes::config;
use serde_json::{json, Value};

use common::Harness;

#[actix_web::test]
async fn open_reply_and_list() {
    let h = Harness::new();
    let app = test::init_service(App::new().app_data(web::Data::new(h.state.clone())).configure(config)).await;

    let req = test::TestRequest::post()
        .uri("/api/parents/tickets")
        .set_json(json!({"parentId": 1, "message": "My upload keeps failing"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let ticket: Value = test::read_body_json(resp).await;
    assert_eq!(ticket["status"], "open");
    assert_eq!(ticket["parentName"], "Asha");
    let ticket_id = ticket["_id"].as_str().unwrap().to_string();

    let reply_uri = format!("/api/volunteers/tickets/{ticket_id}/reply");
    let req = test::TestRequest::post()
        .uri(&reply_uri)
        .set_json(json!({"volunteerId": 2, "message": "Try a smaller file"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let ex: Value = test::read_body_json(resp).await;
    assert_eq!(ex["ticket"]["status"], "closed");
    assert!(ex["ticket"]["closedAt"].is_string());
    assert_eq!(ex["reply"]["replyTo"], ticket_id.as_str());
    assert_eq!(ex["reply"]["repliedBy"], 2);

    // second reply on a closed ticket
    let req = test::TestRequest::post()
        .uri(&reply_uri)
        .set_json(json!({"volunteerId": 2, "message": "again"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Ticket is already closed");

    let req = test::TestRequest::get().uri("/api/parents/tickets/1").to_request();
    let mine: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(mine.as_array().unwrap().len(), 2);

    let req = test::TestRequest::get().uri("/api/parents/tickets/7").to_request();
    let none: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert!(none.as_array().unwrap().is_empty());

    let req = test::TestRequest::get().uri("/api/parents/tickets").to_request();
    let all: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn ticket_validation() {
    let h = Harness::new();
    let app = test::init_service(App::new().app_data(web::Data::new(h.state.clone())).configure(config)).await;

    let req = test::TestRequest::post()
        .uri("/api/parents/tickets")
        .set_json(json!({"parentId": 1, "message": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Message cannot be empty");

    let req = test::TestRequest::post()
        .uri("/api/parents/tickets")
        .set_json(json!({"message": "hello"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // volunteer id is not a parent
    let req = test::TestRequest::post()
        .uri("/api/parents/tickets")
        .set_json(json!({"parentId": 2, "message": "hello"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::post()
        .uri("/api/volunteers/tickets/ticket_nope/reply")
        .set_json(json!({"volunteerId": 2, "message": "hi"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Ticket not found");
}
