use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::*;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RepoError {
    #[error("{0} not found")] NotFound(&'static str),
    #[error("conflict: {0}")] Conflict(String),
    #[error("invalid state: {0}")] InvalidState(String),
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    /// Exact username + password match; `None` on any mismatch.
    async fn find_by_credentials(&self, username: &str, password: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, new: NewUser) -> RepoResult<User>;
}

#[async_trait]
pub trait ChildRepo: Send + Sync {
    async fn list_children(&self) -> RepoResult<Vec<Child>>;
    async fn get_child(&self, id: &str) -> RepoResult<Child>;
    async fn children_of(&self, parent_id: Id) -> RepoResult<Vec<Child>>;
}

#[async_trait]
pub trait MilestoneRepo: Send + Sync {
    async fn list_milestones(&self) -> RepoResult<Vec<Milestone>>;
    async fn get_milestone(&self, id: &str) -> RepoResult<Milestone>;
    async fn milestones_for(&self, age_group: AgeGroup) -> RepoResult<Vec<Milestone>>;
}

#[async_trait]
pub trait SubmissionRepo: Send + Sync {
    async fn list_submissions(&self) -> RepoResult<Vec<Submission>>;
    async fn get_submission(&self, id: &str) -> RepoResult<Submission>;
    async fn submissions_for_child(&self, child_id: &str) -> RepoResult<Vec<Submission>>;
    /// Fails with `NotFound` for unknown child/milestone and `Conflict` when the pair already has a submission.
    async fn create_submission(&self, new: NewSubmission) -> RepoResult<Submission>;
    /// pending -> accepted | rejected, exactly once.
    async fn review_submission(&self, id: &str, review: Review) -> RepoResult<Submission>;
}

#[async_trait]
pub trait TicketRepo: Send + Sync {
    async fn list_tickets(&self) -> RepoResult<Vec<Ticket>>;
    async fn create_ticket(&self, parent_id: Id, message: String) -> RepoResult<Ticket>;
    /// Closes the original ticket and stores a closed reply record pointing at it.
    async fn reply_ticket(&self, ticket_id: &str, volunteer_id: Id, message: String) -> RepoResult<TicketExchange>;
}

pub trait Repo: UserRepo + ChildRepo + MilestoneRepo + SubmissionRepo + TicketRepo {}

impl<T> Repo for T where T: UserRepo + ChildRepo + MilestoneRepo + SubmissionRepo + TicketRepo {}

pub const USERS_FILE: &str = "users.json";
pub const CHILDREN_FILE: &str = "children.json";
pub const MILESTONES_FILE: &str = "milestones.json";
pub const SUBMISSIONS_FILE: &str = "milestoneStatus.json";
pub const TICKETS_FILE: &str = "tickets.json";

/// Flat-file store: one pretty-printed JSON array per collection under `dir`.
///
/// Nothing is cached. Every operation reads the collections it touches from
/// disk, so edits made to the files by hand are picked up by the next request.
/// Mutations hold the write lock from load to persist, which keeps the
/// uniqueness and state checks atomic within the process.
#[derive(Clone)]
pub struct JsonFileRepo {
    lock: Arc<RwLock<()>>,
    dir: Arc<PathBuf>,
}

impl JsonFileRepo {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!(
            "store opened at '{}': {} users, {} children, {} milestones, {} submissions, {} tickets",
            dir.display(),
            load_collection::<User>(&dir, USERS_FILE).len(),
            load_collection::<Child>(&dir, CHILDREN_FILE).len(),
            load_collection::<Milestone>(&dir, MILESTONES_FILE).len(),
            load_collection::<Submission>(&dir, SUBMISSIONS_FILE).len(),
            load_collection::<Ticket>(&dir, TICKETS_FILE).len()
        );
        Self { lock: Arc::new(RwLock::new(())), dir: Arc::new(dir) }
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, ()>> {
        self.lock.read().map_err(|_| RepoError::Internal("store lock poisoned".into()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, ()>> {
        self.lock.write().map_err(|_| RepoError::Internal("store lock poisoned".into()))
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Vec<T> {
        load_collection(&self.dir, file)
    }

    // temp file + rename so a crash never leaves a half-written collection behind
    fn persist<T: Serialize>(&self, file: &str, items: &[T]) -> RepoResult<()> {
        let bytes = serde_json::to_vec_pretty(items).map_err(|e| RepoError::Internal(e.to_string()))?;
        std::fs::create_dir_all(&*self.dir)
            .map_err(|e| RepoError::Internal(format!("create '{}': {e}", self.dir.display())))?;
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!(".{file}.tmp"));
        std::fs::write(&tmp, bytes).map_err(|e| RepoError::Internal(format!("write '{}': {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path).map_err(|e| RepoError::Internal(format!("rename '{}': {e}", path.display())))?;
        Ok(())
    }
}

// Missing or unreadable files load as empty collections.
fn load_collection<T: DeserializeOwned>(dir: &Path, file: &str) -> Vec<T> {
    let path = dir.join(file);
    match std::fs::read(&path) {
        Ok(bytes) => match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(items) => items,
            Err(e) => {
                warn!("failed to parse '{}': {e}; treating as empty", path.display());
                Vec::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!("cannot read '{}': {e}; treating as empty", path.display());
            Vec::new()
        }
    }
}

#[async_trait]
impl UserRepo for JsonFileRepo {
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let _g = self.read()?;
        Ok(self.load(USERS_FILE))
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        let _g = self.read()?;
        let users: Vec<User> = self.load(USERS_FILE);
        users.into_iter().find(|u| u.id == id).ok_or(RepoError::NotFound("User"))
    }

    async fn find_by_credentials(&self, username: &str, password: &str) -> RepoResult<Option<User>> {
        let _g = self.read()?;
        let users: Vec<User> = self.load(USERS_FILE);
        Ok(users.into_iter().find(|u| u.username == username && u.password == password))
    }

    async fn create_user(&self, new: NewUser) -> RepoResult<User> {
        let _g = self.write()?;
        let mut users: Vec<User> = self.load(USERS_FILE);
        if users.iter().any(|u| u.username == new.username || u.contact == new.contact) {
            return Err(RepoError::Conflict("Username or contact already exists".into()));
        }
        let id = users.iter().map(|u| u.id).max().unwrap_or(0).max(0) + 1;
        let user = User {
            id,
            name: new.name,
            contact: new.contact,
            username: new.username,
            password: new.password,
            role: new.role,
        };
        users.push(user.clone());
        self.persist(USERS_FILE, &users)?;
        Ok(user)
    }
}

#[async_trait]
impl ChildRepo for JsonFileRepo {
    async fn list_children(&self) -> RepoResult<Vec<Child>> {
        let _g = self.read()?;
        Ok(self.load(CHILDREN_FILE))
    }

    async fn get_child(&self, id: &str) -> RepoResult<Child> {
        let _g = self.read()?;
        let children: Vec<Child> = self.load(CHILDREN_FILE);
        children.into_iter().find(|c| c.id == id).ok_or(RepoError::NotFound("Child"))
    }

    async fn children_of(&self, parent_id: Id) -> RepoResult<Vec<Child>> {
        let _g = self.read()?;
        let children: Vec<Child> = self.load(CHILDREN_FILE);
        Ok(children.into_iter().filter(|c| c.parent_id == parent_id).collect())
    }
}

#[async_trait]
impl MilestoneRepo for JsonFileRepo {
    async fn list_milestones(&self) -> RepoResult<Vec<Milestone>> {
        let _g = self.read()?;
        Ok(self.load(MILESTONES_FILE))
    }

    async fn get_milestone(&self, id: &str) -> RepoResult<Milestone> {
        let _g = self.read()?;
        let milestones: Vec<Milestone> = self.load(MILESTONES_FILE);
        milestones.into_iter().find(|m| m.id == id).ok_or(RepoError::NotFound("Milestone"))
    }

    async fn milestones_for(&self, age_group: AgeGroup) -> RepoResult<Vec<Milestone>> {
        let _g = self.read()?;
        let milestones: Vec<Milestone> = self.load(MILESTONES_FILE);
        Ok(milestones.into_iter().filter(|m| m.age_group == age_group).collect())
    }
}

#[async_trait]
impl SubmissionRepo for JsonFileRepo {
    async fn list_submissions(&self) -> RepoResult<Vec<Submission>> {
        let _g = self.read()?;
        Ok(self.load(SUBMISSIONS_FILE))
    }

    async fn get_submission(&self, id: &str) -> RepoResult<Submission> {
        let _g = self.read()?;
        let submissions: Vec<Submission> = self.load(SUBMISSIONS_FILE);
        submissions.into_iter().find(|ms| ms.id == id).ok_or(RepoError::NotFound("Submission"))
    }

    async fn submissions_for_child(&self, child_id: &str) -> RepoResult<Vec<Submission>> {
        let _g = self.read()?;
        let submissions: Vec<Submission> = self.load(SUBMISSIONS_FILE);
        Ok(submissions.into_iter().filter(|ms| ms.child_id == child_id).collect())
    }

    async fn create_submission(&self, new: NewSubmission) -> RepoResult<Submission> {
        let _g = self.write()?;
        let children: Vec<Child> = self.load(CHILDREN_FILE);
        if !children.iter().any(|c| c.id == new.child_id) {
            return Err(RepoError::NotFound("Child"));
        }
        let milestones: Vec<Milestone> = self.load(MILESTONES_FILE);
        if !milestones.iter().any(|m| m.id == new.milestone_id) {
            return Err(RepoError::NotFound("Milestone"));
        }
        let mut submissions: Vec<Submission> = self.load(SUBMISSIONS_FILE);
        if submissions.iter().any(|ms| ms.child_id == new.child_id && ms.milestone_id == new.milestone_id) {
            return Err(RepoError::Conflict("Milestone already submitted for this child".into()));
        }
        let submission = Submission {
            id: format!("ms_{}", Uuid::new_v4().simple()),
            child_id: new.child_id,
            milestone_id: new.milestone_id,
            status: SubmissionStatus::Pending,
            media_url: new.media_url,
            media_type: new.media_type,
            media_size: new.media_size,
            media_duration: new.media_duration,
            file_name: new.file_name,
            file_type: new.file_type,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
            feedback: None,
        };
        submissions.push(submission.clone());
        self.persist(SUBMISSIONS_FILE, &submissions)?;
        Ok(submission)
    }

    async fn review_submission(&self, id: &str, review: Review) -> RepoResult<Submission> {
        let _g = self.write()?;
        let mut submissions: Vec<Submission> = self.load(SUBMISSIONS_FILE);
        let sub = submissions.iter_mut().find(|ms| ms.id == id).ok_or(RepoError::NotFound("Submission"))?;
        if sub.status != SubmissionStatus::Pending {
            return Err(RepoError::InvalidState("Submission has already been reviewed".into()));
        }
        sub.status = review.decision.status();
        sub.reviewed_at = Some(Utc::now());
        sub.reviewed_by = Some(review.reviewer_id);
        if review.decision == Decision::Reject {
            sub.rejection_reason = review.feedback.clone();
        }
        sub.feedback = review.feedback;
        let updated = sub.clone();
        self.persist(SUBMISSIONS_FILE, &submissions)?;
        Ok(updated)
    }
}

#[async_trait]
impl TicketRepo for JsonFileRepo {
    async fn list_tickets(&self) -> RepoResult<Vec<Ticket>> {
        let _g = self.read()?;
        Ok(self.load(TICKETS_FILE))
    }

    async fn create_ticket(&self, parent_id: Id, message: String) -> RepoResult<Ticket> {
        let _g = self.write()?;
        let users: Vec<User> = self.load(USERS_FILE);
        let parent = users
            .iter()
            .find(|u| u.id == parent_id && u.role == Role::Parent)
            .ok_or(RepoError::NotFound("Parent"))?;
        let ticket = Ticket {
            id: format!("ticket_{}", Uuid::new_v4().simple()),
            parent_id,
            parent_name: parent.name.clone(),
            message,
            created_at: Utc::now(),
            status: TicketStatus::Open,
            closed_at: None,
            reply_to: None,
            replied_by: None,
        };
        let mut tickets: Vec<Ticket> = self.load(TICKETS_FILE);
        tickets.push(ticket.clone());
        self.persist(TICKETS_FILE, &tickets)?;
        Ok(ticket)
    }

    async fn reply_ticket(&self, ticket_id: &str, volunteer_id: Id, message: String) -> RepoResult<TicketExchange> {
        let _g = self.write()?;
        let mut tickets: Vec<Ticket> = self.load(TICKETS_FILE);
        let idx = tickets.iter().position(|t| t.id == ticket_id).ok_or(RepoError::NotFound("Ticket"))?;
        if tickets[idx].status == TicketStatus::Closed {
            return Err(RepoError::InvalidState("Ticket is already closed".into()));
        }
        let users: Vec<User> = self.load(USERS_FILE);
        if !users.iter().any(|u| u.id == volunteer_id && u.role == Role::Volunteer) {
            return Err(RepoError::NotFound("Volunteer"));
        }
        let now = Utc::now();
        let original = &mut tickets[idx];
        original.status = TicketStatus::Closed;
        original.closed_at = Some(now);
        let original = original.clone();
        let reply = Ticket {
            id: format!("ticket_{}", Uuid::new_v4().simple()),
            parent_id: original.parent_id,
            parent_name: original.parent_name.clone(),
            message,
            created_at: now,
            status: TicketStatus::Closed,
            closed_at: Some(now),
            reply_to: Some(original.id.clone()),
            replied_by: Some(volunteer_id),
        };
        tickets.push(reply.clone());
        self.persist(TICKETS_FILE, &tickets)?;
        Ok(TicketExchange { ticket: original, reply })
    }
}
