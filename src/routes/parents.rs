use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{client_key, limit, required, AppState};
use crate::dashboard::{self, ParentDashboard};
use crate::error::{ApiError, ApiErrorBody};
use crate::models::*;
use crate::storage::{UploadPolicy, VIDEO_MAX_BYTES};

const TEXT_FIELD_LIMIT: usize = 4 * 1024;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Absolute http(s) URL with a host.
pub(crate) fn validate_media_url(raw: &str) -> Result<String, ApiError> {
    let parsed = url::Url::parse(raw).map_err(|_| ApiError::validation("mediaUrl must be a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ApiError::validation("mediaUrl must be an http(s) URL"));
    }
    Ok(raw.to_string())
}

#[utoipa::path(
    get,
    path = "/api/parents/dashboard/{parent_id}",
    params(("parent_id" = i64, Path, description = "Parent user id")),
    responses((status = 200, description = "Children with milestone progress", body = ParentDashboard))
)]
pub async fn dashboard(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let parent_id = path.into_inner();
    let children = data.repo.children_of(parent_id).await?;
    let milestones = data.repo.list_milestones().await?;
    let submissions = data.repo.list_submissions().await?;
    Ok(HttpResponse::Ok().json(dashboard::parent_dashboard(parent_id, &children, &milestones, &submissions)))
}

#[utoipa::path(
    get,
    path = "/api/parents/milestones/{child_id}",
    params(("child_id" = String, Path, description = "Child id")),
    responses(
        (status = 200, description = "Milestones of the child's age group", body = [Milestone]),
        (status = 404, description = "Child not found", body = ApiErrorBody)
    )
)]
pub async fn child_milestones(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let child = data.repo.get_child(&path.into_inner()).await?;
    let milestones = data.repo.milestones_for(child.age_group).await?;
    Ok(HttpResponse::Ok().json(milestones))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[schema(value_type = Option<String>)]
    pub child_id: Option<FlexibleId>,
    #[schema(value_type = Option<String>)]
    pub milestone_id: Option<FlexibleId>,
    pub media_url: Option<String>,
}

impl SubmitRequest {
    pub fn validate(self) -> Result<NewSubmission, ApiError> {
        let child_id = self.child_id.map(|c| c.as_text()).filter(|s| !s.is_empty());
        let milestone_id = self.milestone_id.map(|m| m.as_text()).filter(|s| !s.is_empty());
        let (Some(child_id), Some(milestone_id)) = (child_id, milestone_id) else {
            return Err(ApiError::validation("childId and milestoneId are required"));
        };
        let media_url = required(self.media_url).ok_or_else(|| ApiError::validation("mediaUrl is required"))?;
        let media_url = validate_media_url(&media_url)?;
        Ok(NewSubmission::from_url(child_id, milestone_id, media_url))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionCreated {
    pub message: String,
    pub data: Submission,
}

#[utoipa::path(
    post,
    path = "/api/parents/milestone/submit",
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Submission created (pending)", body = SubmissionCreated),
        (status = 400, description = "Missing ids or invalid mediaUrl", body = ApiErrorBody),
        (status = 404, description = "Child or milestone not found", body = ApiErrorBody),
        (status = 409, description = "Already submitted for this child", body = ApiErrorBody),
        (status = 429, description = "Rate limited", body = ApiErrorBody)
    )
)]
pub async fn submit(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<SubmitRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        limit(rl.allow_submit(&client_key(&req)))?;
    }
    let new = payload.into_inner().validate()?;
    let submission = data.repo.create_submission(new).await?;
    info!(submission = %submission.id, child = %submission.child_id, milestone = %submission.milestone_id, "submission created");
    Ok(HttpResponse::Created().json(SubmissionCreated {
        message: "Milestone submitted successfully".into(),
        data: submission,
    }))
}

async fn read_field(field: &mut Field, max: usize) -> Result<Vec<u8>, ApiError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(|e| {
        warn!("multipart read error: {e}");
        ApiError::validation("Malformed multipart body")
    })? {
        if buf.len() + chunk.len() > max {
            return Err(ApiError::PayloadTooLarge(format!("Field exceeds the {max} byte limit")));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

async fn read_text(field: &mut Field) -> Result<String, ApiError> {
    let bytes = read_field(field, TEXT_FIELD_LIMIT).await?;
    String::from_utf8(bytes)
        .map(|s| s.trim().to_string())
        .map_err(|_| ApiError::validation("Form fields must be UTF-8 text"))
}

struct UploadedFile {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/api/parents/milestone/submit-with-file",
    request_body(content = String, content_type = "multipart/form-data", description = "Fields: childId, milestoneId, media (file)"),
    responses(
        (status = 201, description = "Uploaded and submitted", body = SubmissionCreated),
        (status = 400, description = "Missing fields", body = ApiErrorBody),
        (status = 404, description = "Child or milestone not found", body = ApiErrorBody),
        (status = 409, description = "Already submitted for this child", body = ApiErrorBody),
        (status = 413, description = "File too large", body = ApiErrorBody),
        (status = 415, description = "Not an accepted image/video format", body = ApiErrorBody)
    )
)]
pub async fn submit_with_file(
    req: HttpRequest,
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        limit(rl.allow_submit(&client_key(&req)))?;
    }

    let mut child_id = None;
    let mut milestone_id = None;
    let mut upload: Option<UploadedFile> = None;
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        warn!("multipart error: {e}");
        ApiError::validation("Malformed multipart body")
    })? {
        let name = field.content_disposition().get_name().unwrap_or_default().to_string();
        match name.as_str() {
            "childId" => child_id = Some(read_text(&mut field).await?),
            "milestoneId" => milestone_id = Some(read_text(&mut field).await?),
            "media" => {
                let file_name = field.content_disposition().get_filename().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(|m| m.essence_str().to_string()).unwrap_or_default();
                let bytes = read_field(&mut field, VIDEO_MAX_BYTES).await?;
                upload = Some(UploadedFile { file_name, content_type, bytes });
            }
            _ => {
                read_field(&mut field, VIDEO_MAX_BYTES).await?;
            }
        }
    }

    let (Some(child_id), Some(milestone_id)) = (
        child_id.filter(|s| !s.is_empty()),
        milestone_id.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::validation("childId and milestoneId are required"));
    };
    let file = upload.ok_or_else(|| ApiError::validation("A media file is required"))?;
    if !(file.content_type.starts_with("image/") || file.content_type.starts_with("video/")) {
        return Err(ApiError::UnsupportedMedia("Only image and video files are allowed".into()));
    }

    // nothing is uploaded for a request the store would refuse
    data.repo.get_child(&child_id).await?;
    data.repo.get_milestone(&milestone_id).await?;
    if data.repo.submissions_for_child(&child_id).await?.iter().any(|s| s.milestone_id == milestone_id) {
        return Err(ApiError::Conflict("Milestone already submitted for this child".into()));
    }

    let kind = MediaType::from_content_type(&file.content_type);
    let policy = UploadPolicy::for_kind(kind);
    let stored = data.media.upload(&policy, &file.file_name, &file.content_type, file.bytes).await?;
    info!(url = %stored.url, size = stored.size, "media uploaded");

    let new = NewSubmission {
        media_type: Some(kind),
        media_size: Some(stored.size as f64 / BYTES_PER_MB),
        media_duration: None,
        file_name: Some(stored.original_filename),
        file_type: Some(stored.mimetype),
        ..NewSubmission::from_url(child_id, milestone_id, stored.url)
    };
    let submission = data.repo.create_submission(new).await?;
    Ok(HttpResponse::Created().json(SubmissionCreated {
        message: "Milestone submitted successfully with file upload".into(),
        data: submission,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenTicketRequest {
    #[schema(value_type = Option<i64>)]
    pub parent_id: Option<FlexibleId>,
    pub message: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/parents/tickets",
    request_body = OpenTicketRequest,
    responses(
        (status = 201, description = "Ticket opened", body = Ticket),
        (status = 400, description = "Empty message or missing parentId", body = ApiErrorBody),
        (status = 404, description = "Parent not found", body = ApiErrorBody)
    )
)]
pub async fn open_ticket(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<OpenTicketRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        limit(rl.allow_ticket(&client_key(&req)))?;
    }
    let OpenTicketRequest { parent_id, message } = payload.into_inner();
    let parent_id = parent_id
        .and_then(|p| p.as_id())
        .ok_or_else(|| ApiError::validation("parentId is required"))?;
    let message = required(message).ok_or_else(|| ApiError::validation("Message cannot be empty"))?;
    let ticket = data.repo.create_ticket(parent_id, message).await?;
    info!(ticket = %ticket.id, parent_id, "ticket opened");
    Ok(HttpResponse::Created().json(ticket))
}

fn newest_first(mut tickets: Vec<Ticket>) -> Vec<Ticket> {
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    tickets
}

#[utoipa::path(
    get,
    path = "/api/parents/tickets",
    responses((status = 200, description = "All tickets, newest first", body = [Ticket]))
)]
pub async fn list_tickets(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(newest_first(data.repo.list_tickets().await?)))
}

#[utoipa::path(
    get,
    path = "/api/parents/tickets/{parent_id}",
    params(("parent_id" = i64, Path, description = "Parent user id")),
    responses((status = 200, description = "The parent's tickets, newest first", body = [Ticket]))
)]
pub async fn parent_tickets(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let parent_id = path.into_inner();
    let tickets = data.repo.list_tickets().await?.into_iter().filter(|t| t.parent_id == parent_id).collect();
    Ok(HttpResponse::Ok().json(newest_first(tickets)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_syntax() {
        assert!(validate_media_url("https://x/a.jpg").is_ok());
        assert!(validate_media_url("http://cdn.example.org/v.mp4?x=1").is_ok());
        assert!(validate_media_url("not a url").is_err());
        assert!(validate_media_url("ftp://x/a.jpg").is_err());
        assert!(validate_media_url("/relative/a.jpg").is_err());
    }

    #[test]
    fn submit_request_accepts_numeric_ids() {
        let r: SubmitRequest =
            serde_json::from_str(r#"{"childId":1,"milestoneId":"m1","mediaUrl":"https://x/a.jpg"}"#).unwrap();
        let new = r.validate().unwrap();
        assert_eq!(new.child_id, "1");
        assert_eq!(new.milestone_id, "m1");
        assert!(new.media_type.is_none());
    }

    #[test]
    fn submit_request_requires_url() {
        let r: SubmitRequest = serde_json::from_str(r#"{"childId":"c1","milestoneId":"m1","mediaUrl":null}"#).unwrap();
        assert!(matches!(r.validate(), Err(ApiError::Validation(_))));
    }
}
