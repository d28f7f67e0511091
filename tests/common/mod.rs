#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use kidsteps::notify::{Notifier, NotifyError};
use kidsteps::rate_limit::RateLimiterFacade;
use kidsteps::repo::JsonFileRepo;
use kidsteps::storage::FsMediaStore;
use kidsteps::AppState;
use serde_json::json;
use tempfile::TempDir;

/// Captures notifications instead of sending them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((contact.to_string(), message.to_string()));
        Ok(())
    }
}

/// Always fails delivery.
pub struct FailingNotifier;

#[async_trait::async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _contact: &str, _message: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("gateway down".into()))
    }
}

pub fn write_json(dir: &Path, file: &str, value: serde_json::Value) {
    std::fs::write(dir.join(file), serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

/// Catalog: milestones m1,m2 (0-3), m3 (4-6); children c1 (Mia, 0-3) and c2 (Leo, 4-6) of parent 1.
pub fn seed_catalog(dir: &Path) {
    write_json(
        dir,
        "milestones.json",
        json!([
            {"_id": "m1", "title": "Walks", "description": "Walks alone", "ageGroup": "0-3", "category": "motor"},
            {"_id": "m2", "title": "Talks", "description": "First words", "ageGroup": "0-3"},
            {"_id": "m3", "title": "Draws", "description": "Draws a circle", "ageGroup": "4-6", "category": "motor"}
        ]),
    );
    write_json(
        dir,
        "children.json",
        json!([
            {"_id": "c1", "parentId": 1, "name": "Mia", "age": 2, "ageGroup": "0-3"},
            {"_id": "c2", "parentId": 1, "name": "Leo", "age": 5, "ageGroup": "4-6"}
        ]),
    );
}

/// Parent 1 (Asha, 555-0101) and volunteer 2 (Ben).
pub fn seed_users(dir: &Path) {
    write_json(
        dir,
        "users.json",
        json!([
            {"id": 1, "name": "Asha", "contact": "555-0101", "username": "asha", "password": "pw1", "role": "parent"},
            {"id": 2, "name": "Ben", "contact": "555-0202", "username": "ben", "password": "pw2", "role": "volunteer"}
        ]),
    );
}

pub struct Harness {
    pub data_dir: TempDir,
    pub media_dir: TempDir,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
}

impl Harness {
    /// Fully seeded store, local media under a temp dir, no rate limiting.
    pub fn new() -> Self {
        Self::build(true, None)
    }

    pub fn without_users() -> Self {
        Self::build(false, None)
    }

    pub fn with_rate_limiter(rl: RateLimiterFacade) -> Self {
        Self::build(true, Some(rl))
    }

    fn build(users: bool, rate_limiter: Option<RateLimiterFacade>) -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let media_dir = tempfile::tempdir().unwrap();
        seed_catalog(data_dir.path());
        if users {
            seed_users(data_dir.path());
        }
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState {
            repo: Arc::new(JsonFileRepo::open(data_dir.path())),
            media: Arc::new(FsMediaStore::new(media_dir.path(), "http://localhost:3000")),
            notifier: notifier.clone(),
            rate_limiter,
        };
        Self { data_dir, media_dir, notifier, state }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.notifier.sent.lock().unwrap().clone()
    }
}
