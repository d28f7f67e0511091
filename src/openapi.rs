use crate::dashboard::{
    AgeGroupStats, ChildProgress, DashboardStats, MilestoneProgress, OverallStats, ParentDashboard, Progress,
    RecentActivity, Statistics, SubmissionView, VolunteerDashboard,
};
use crate::error::ApiErrorBody;
use crate::models::{
    AgeGroup, Child, MediaType, Milestone, ProgressStatus, PublicUser, Role, Submission, SubmissionStatus, Ticket,
    TicketExchange, TicketStatus,
};
use crate::routes::{auth, milestones, parents, volunteers, HealthResponse};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        auth::register,
        auth::login,
        parents::dashboard,
        parents::child_milestones,
        parents::submit,
        parents::submit_with_file,
        parents::open_ticket,
        parents::list_tickets,
        parents::parent_tickets,
        volunteers::dashboard,
        volunteers::submissions,
        volunteers::submission,
        volunteers::review,
        volunteers::legacy_review,
        volunteers::statistics,
        volunteers::reply_ticket,
        milestones::list_milestones,
        milestones::list_children,
        milestones::children_of_parent,
        milestones::child_statuses,
        milestones::legacy_submit,
    ),
    components(schemas(
        ApiErrorBody, HealthResponse,
        Role, PublicUser, AgeGroup, Child, Milestone, SubmissionStatus, ProgressStatus, MediaType,
        Submission, TicketStatus, Ticket, TicketExchange,
        Progress, MilestoneProgress, ChildProgress, ParentDashboard,
        SubmissionView, DashboardStats, VolunteerDashboard,
        OverallStats, AgeGroupStats, RecentActivity, Statistics,
        auth::RegisterRequest, auth::LoginRequest, auth::AuthResponse,
        parents::SubmitRequest, parents::SubmissionCreated, parents::OpenTicketRequest,
        volunteers::ReviewRequest, volunteers::LegacyReviewRequest, volunteers::ReviewResponse,
        volunteers::ReplyRequest,
        milestones::StatusSubmitRequest,
    )),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "parents", description = "Dashboards, submissions and support tickets"),
        (name = "volunteers", description = "Review queue and statistics"),
        (name = "milestones", description = "Catalog lookups"),
    )
)]
pub struct ApiDoc;
