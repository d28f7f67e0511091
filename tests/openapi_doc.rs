use kidsteps::openapi::ApiDoc;
use utoipa::OpenApi;

fn paths() -> serde_json::Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap()["paths"].clone()
}

#[test]
fn every_parent_route_is_documented() {
    let paths = paths();
    for p in [
        "/api/parents/dashboard/{parent_id}",
        "/api/parents/milestones/{child_id}",
        "/api/parents/milestone/submit",
        "/api/parents/milestone/submit-with-file",
        "/api/parents/tickets",
        "/api/parents/tickets/{parent_id}",
    ] {
        assert!(paths.get(p).is_some(), "{p} missing from the API doc");
    }
}

#[test]
fn file_submission_is_a_multipart_form() {
    let paths = paths();
    let body = &paths["/api/parents/milestone/submit-with-file"]["post"]["requestBody"];
    assert!(body["content"].get("multipart/form-data").is_some());
    assert!(paths["/api/parents/tickets/{parent_id}"].get("get").is_some());
}
