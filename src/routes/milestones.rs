use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use super::parents::{validate_media_url, SubmissionCreated};
use super::{client_key, limit, required, AppState};
use crate::error::{ApiError, ApiErrorBody};
use crate::models::*;

#[utoipa::path(
    get,
    path = "/api/milestones",
    responses((status = 200, description = "Full milestone catalog", body = [Milestone]))
)]
pub async fn list_milestones(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.list_milestones().await?))
}

#[utoipa::path(
    get,
    path = "/api/milestones/children",
    responses((status = 200, description = "All children", body = [Child]))
)]
pub async fn list_children(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.list_children().await?))
}

#[utoipa::path(
    get,
    path = "/api/milestones/children/{parent_id}",
    params(("parent_id" = i64, Path, description = "Parent user id")),
    responses((status = 200, description = "The parent's children", body = [Child]))
)]
pub async fn children_of_parent(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.children_of(path.into_inner()).await?))
}

#[utoipa::path(
    get,
    path = "/api/milestones/milestone-status/{child_id}",
    params(("child_id" = String, Path, description = "Child id")),
    responses((status = 200, description = "The child's submissions", body = [Submission]))
)]
pub async fn child_statuses(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.submissions_for_child(&path.into_inner()).await?))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusSubmitRequest {
    #[schema(value_type = Option<String>)]
    pub child_id: Option<FlexibleId>,
    #[schema(value_type = Option<String>)]
    pub milestone_id: Option<FlexibleId>,
    pub media_url: Option<String>,
    /// image | video
    pub media_type: Option<String>,
    /// MB
    pub media_size: Option<f64>,
    /// seconds; ignored for images
    pub media_duration: Option<f64>,
}

impl StatusSubmitRequest {
    pub fn validate(self) -> Result<NewSubmission, ApiError> {
        let child_id = self.child_id.map(|c| c.as_text()).filter(|s| !s.is_empty());
        let milestone_id = self.milestone_id.map(|m| m.as_text()).filter(|s| !s.is_empty());
        let (Some(child_id), Some(milestone_id), Some(media_url), Some(media_type), Some(media_size)) =
            (child_id, milestone_id, required(self.media_url), required(self.media_type), self.media_size)
        else {
            return Err(ApiError::validation("Missing required fields"));
        };
        let media_url = validate_media_url(&media_url)?;
        let media_type = MediaType::parse(&media_type).ok_or_else(|| ApiError::validation("mediaType must be image or video"))?;
        if !media_size.is_finite() || media_size < 0.0 {
            return Err(ApiError::validation("mediaSize must be a non-negative number"));
        }
        Ok(NewSubmission {
            media_type: Some(media_type),
            media_size: Some(media_size),
            media_duration: self.media_duration.filter(|_| media_type == MediaType::Video),
            ..NewSubmission::from_url(child_id, milestone_id, media_url)
        })
    }
}

#[utoipa::path(
    post,
    path = "/api/milestones/milestone-status",
    request_body = StatusSubmitRequest,
    responses(
        (status = 201, description = "Submission created (pending)", body = SubmissionCreated),
        (status = 400, description = "Missing or malformed field", body = ApiErrorBody),
        (status = 404, description = "Child or milestone not found", body = ApiErrorBody),
        (status = 409, description = "Already submitted for this child", body = ApiErrorBody)
    )
)]
pub async fn legacy_submit(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<StatusSubmitRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        limit(rl.allow_submit(&client_key(&req)))?;
    }
    let new = payload.into_inner().validate()?;
    let submission = data.repo.create_submission(new).await?;
    Ok(HttpResponse::Created().json(SubmissionCreated {
        message: "Milestone status submitted successfully".into(),
        data: submission,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> StatusSubmitRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn duration_only_kept_for_video() {
        let img = parse(r#"{"childId":"c1","milestoneId":"m1","mediaUrl":"https://x/a.jpg","mediaType":"image","mediaSize":1.5,"mediaDuration":12}"#)
            .validate()
            .unwrap();
        assert_eq!(img.media_duration, None);
        let vid = parse(r#"{"childId":"c1","milestoneId":"m1","mediaUrl":"https://x/a.mp4","mediaType":"video","mediaSize":8,"mediaDuration":12}"#)
            .validate()
            .unwrap();
        assert_eq!(vid.media_duration, Some(12.0));
        assert_eq!(vid.media_type, Some(MediaType::Video));
    }

    #[test]
    fn size_and_type_are_required() {
        let r = parse(r#"{"childId":"c1","milestoneId":"m1","mediaUrl":"https://x/a.jpg","mediaType":"image"}"#);
        assert!(matches!(r.validate(), Err(ApiError::Validation(m)) if m == "Missing required fields"));
        let r = parse(r#"{"childId":"c1","milestoneId":"m1","mediaUrl":"https://x/a.jpg","mediaType":"gif","mediaSize":1}"#);
        assert!(r.validate().is_err());
    }
}
