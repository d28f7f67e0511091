use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use super::{required, AppState};
use crate::dashboard::{self, Catalog, Statistics, SubmissionFilter, SubmissionView, VolunteerDashboard};
use crate::error::{ApiError, ApiErrorBody};
use crate::models::*;
use crate::notify::rejection_message;

#[utoipa::path(
    get,
    path = "/api/volunteers/dashboard",
    responses((status = 200, description = "Counts, pending queue and the latest reviews", body = VolunteerDashboard))
)]
pub async fn dashboard(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let (milestones, children, users) = (
        data.repo.list_milestones().await?,
        data.repo.list_children().await?,
        data.repo.list_users().await?,
    );
    let submissions = data.repo.list_submissions().await?;
    let catalog = Catalog::new(&milestones, &children, &users);
    Ok(HttpResponse::Ok().json(dashboard::volunteer_dashboard(&catalog, &submissions)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SubmissionQuery {
    /// pending | accepted | rejected | all
    pub status: Option<String>,
    /// 0-3 | 4-6 | 7-8 | all
    pub age_group: Option<String>,
}

impl SubmissionQuery {
    pub fn into_filter(self) -> Result<SubmissionFilter, ApiError> {
        fn selected(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty() && s != "all")
        }
        let status = match selected(self.status) {
            Some(s) => Some(SubmissionStatus::parse(&s).ok_or_else(|| ApiError::validation(format!("Unknown status '{s}'")))?),
            None => None,
        };
        let age_group = match selected(self.age_group) {
            Some(g) => Some(AgeGroup::parse(&g).ok_or_else(|| ApiError::validation(format!("Unknown age group '{g}'")))?),
            None => None,
        };
        Ok(SubmissionFilter { status, age_group })
    }
}

#[utoipa::path(
    get,
    path = "/api/volunteers/submissions",
    params(SubmissionQuery),
    responses(
        (status = 200, description = "Matching submissions, newest first", body = [SubmissionView]),
        (status = 400, description = "Unknown filter value", body = ApiErrorBody)
    )
)]
pub async fn submissions(data: web::Data<AppState>, query: web::Query<SubmissionQuery>) -> Result<HttpResponse, ApiError> {
    let filter = query.into_inner().into_filter()?;
    let (milestones, children, users) = (
        data.repo.list_milestones().await?,
        data.repo.list_children().await?,
        data.repo.list_users().await?,
    );
    let all = data.repo.list_submissions().await?;
    let catalog = Catalog::new(&milestones, &children, &users);
    Ok(HttpResponse::Ok().json(dashboard::filter_submissions(&catalog, &all, filter)))
}

#[utoipa::path(
    get,
    path = "/api/volunteers/submission/{id}",
    params(("id" = String, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Enriched submission", body = SubmissionView),
        (status = 404, description = "Submission not found", body = ApiErrorBody)
    )
)]
pub async fn submission(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let found = data.repo.get_submission(&path.into_inner()).await?;
    let (milestones, children, users) = (
        data.repo.list_milestones().await?,
        data.repo.list_children().await?,
        data.repo.list_users().await?,
    );
    let catalog = Catalog::new(&milestones, &children, &users);
    Ok(HttpResponse::Ok().json(catalog.enrich(&found)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    /// accepted | rejected
    pub status: Option<String>,
    pub feedback: Option<String>,
    #[schema(value_type = Option<i64>)]
    pub volunteer_id: Option<FlexibleId>,
}

/// Older clients post `{action: "accept" | "reject", reviewerId}`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReviewRequest {
    pub action: Option<String>,
    pub feedback: Option<String>,
    #[schema(value_type = Option<i64>)]
    pub reviewer_id: Option<FlexibleId>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub message: String,
    pub submission: Submission,
}

fn build_review(decision: Option<Decision>, reviewer: Option<FlexibleId>, feedback: Option<String>) -> Result<Review, ApiError> {
    let decision = decision.ok_or_else(|| ApiError::validation("Review decision must be accepted or rejected"))?;
    let reviewer_id = reviewer
        .and_then(|r| r.as_id())
        .ok_or_else(|| ApiError::validation("Reviewer id is required"))?;
    let feedback = required(feedback);
    if decision == Decision::Reject && feedback.is_none() {
        return Err(ApiError::validation("Feedback is required when rejecting a submission"));
    }
    Ok(Review { decision, reviewer_id, feedback })
}

async fn apply_review(data: &AppState, id: &str, review: Review) -> Result<HttpResponse, ApiError> {
    let decision = review.decision;
    let reviewer = review.reviewer_id;
    let updated = data.repo.review_submission(id, review).await?;
    info!(submission = %updated.id, reviewer, status = updated.status.as_str(), "submission reviewed");

    if decision == Decision::Reject {
        notify_rejection(data, &updated).await;
    }

    let verb = match decision {
        Decision::Accept => "accepted",
        Decision::Reject => "rejected",
    };
    Ok(HttpResponse::Ok().json(ReviewResponse {
        message: format!("Submission {verb} successfully"),
        submission: updated,
    }))
}

// Delivery problems never fail the review; they are only logged.
async fn notify_rejection(data: &AppState, submission: &Submission) {
    let child = match data.repo.get_child(&submission.child_id).await {
        Ok(c) => c,
        Err(e) => {
            warn!(submission = %submission.id, "no child for rejection notice: {e}");
            return;
        }
    };
    let parent = match data.repo.get_user(child.parent_id).await {
        Ok(p) => p,
        Err(e) => {
            warn!(submission = %submission.id, "no parent for rejection notice: {e}");
            return;
        }
    };
    let text = rejection_message(&child.name, submission.feedback.as_deref());
    if let Err(e) = data.notifier.notify(&parent.contact, &text).await {
        warn!(submission = %submission.id, "rejection notice not delivered: {e}");
    }
}

#[utoipa::path(
    post,
    path = "/api/volunteers/submission/{id}/review",
    params(("id" = String, Path, description = "Submission id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = ReviewResponse),
        (status = 400, description = "Invalid decision, missing feedback or already reviewed", body = ApiErrorBody),
        (status = 404, description = "Submission not found", body = ApiErrorBody)
    )
)]
pub async fn review(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let ReviewRequest { status, feedback, volunteer_id } = payload.into_inner();
    let decision = match status.as_deref().map(str::trim) {
        Some("accepted") => Some(Decision::Accept),
        Some("rejected") => Some(Decision::Reject),
        _ => None,
    };
    let review = build_review(decision, volunteer_id, feedback)?;
    apply_review(&data, &path.into_inner(), review).await
}

#[utoipa::path(
    post,
    path = "/api/volunteers/review/{id}",
    params(("id" = String, Path, description = "Submission id")),
    request_body = LegacyReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = ReviewResponse),
        (status = 400, description = "Invalid action, missing feedback or already reviewed", body = ApiErrorBody),
        (status = 404, description = "Submission not found", body = ApiErrorBody)
    )
)]
pub async fn legacy_review(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<LegacyReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let LegacyReviewRequest { action, feedback, reviewer_id } = payload.into_inner();
    let decision = match action.as_deref().map(str::trim) {
        Some("accept") => Some(Decision::Accept),
        Some("reject") => Some(Decision::Reject),
        _ => None,
    };
    let review = build_review(decision, reviewer_id, feedback)?;
    apply_review(&data, &path.into_inner(), review).await
}

#[utoipa::path(
    get,
    path = "/api/volunteers/statistics",
    responses((status = 200, description = "Overall, per age group and last-7-days figures", body = Statistics))
)]
pub async fn statistics(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let children = data.repo.list_children().await?;
    let submissions = data.repo.list_submissions().await?;
    Ok(HttpResponse::Ok().json(dashboard::statistics(&children, &submissions, Utc::now())))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    #[schema(value_type = Option<i64>)]
    pub volunteer_id: Option<FlexibleId>,
    pub message: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/volunteers/tickets/{ticket_id}/reply",
    params(("ticket_id" = String, Path, description = "Ticket id")),
    request_body = ReplyRequest,
    responses(
        (status = 201, description = "Ticket closed and reply stored", body = TicketExchange),
        (status = 400, description = "Empty message or ticket already closed", body = ApiErrorBody),
        (status = 404, description = "Ticket or volunteer not found", body = ApiErrorBody)
    )
)]
pub async fn reply_ticket(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ReplyRequest>,
) -> Result<HttpResponse, ApiError> {
    let ReplyRequest { volunteer_id, message } = payload.into_inner();
    let volunteer_id = volunteer_id
        .and_then(|v| v.as_id())
        .ok_or_else(|| ApiError::validation("volunteerId is required"))?;
    let message = required(message).ok_or_else(|| ApiError::validation("Message cannot be empty"))?;
    let exchange = data.repo.reply_ticket(&path.into_inner(), volunteer_id, message).await?;
    info!(ticket = %exchange.ticket.id, reply = %exchange.reply.id, volunteer_id, "ticket answered");
    Ok(HttpResponse::Created().json(exchange))
}
