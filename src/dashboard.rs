//! Read-side joins over the flat collections: parent progress, enriched
//! submissions for volunteers, and review statistics.
//!
//! Everything here is pure; handlers fetch the collections from the store and
//! pass them in, together with `now` where a time window is involved.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::*;

pub const UNKNOWN_MILESTONE: &str = "Unknown Milestone";
pub const UNKNOWN_CHILD: &str = "Unknown Child";
pub const UNKNOWN_PARENT: &str = "Unknown Parent";

const RECENTLY_REVIEWED_LIMIT: usize = 10;
const RECENT_ACTIVITY_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneProgress {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub status: ProgressStatus,
    pub submission_id: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ChildProgress {
    #[serde(flatten)]
    pub child: Child,
    pub progress: Progress,
    pub milestones: Vec<MilestoneProgress>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ParentDashboard {
    pub children: Vec<ChildProgress>,
}

/// Progress of every child belonging to `parent_id` over the milestones of its age group.
pub fn parent_dashboard(
    parent_id: Id,
    children: &[Child],
    milestones: &[Milestone],
    submissions: &[Submission],
) -> ParentDashboard {
    let by_pair: HashMap<(&str, &str), &Submission> = submissions
        .iter()
        .map(|s| ((s.child_id.as_str(), s.milestone_id.as_str()), s))
        .collect();

    let children = children
        .iter()
        .filter(|c| c.parent_id == parent_id)
        .map(|child| {
            let mut progress = Progress::default();
            let milestones: Vec<MilestoneProgress> = milestones
                .iter()
                .filter(|m| m.age_group == child.age_group)
                .map(|m| {
                    let sub = by_pair.get(&(child.id.as_str(), m.id.as_str())).copied();
                    let status = sub.map(|s| ProgressStatus::from(s.status)).unwrap_or(ProgressStatus::NotStarted);
                    progress.total += 1;
                    match status {
                        ProgressStatus::Accepted => progress.completed += 1,
                        ProgressStatus::Pending => progress.pending += 1,
                        ProgressStatus::Rejected => progress.rejected += 1,
                        ProgressStatus::NotStarted => {}
                    }
                    MilestoneProgress {
                        milestone: m.clone(),
                        status,
                        submission_id: sub.map(|s| s.id.clone()),
                        media_url: sub.map(|s| s.media_url.clone()),
                        media_type: sub.and_then(|s| s.media_type),
                        submitted_at: sub.map(|s| s.submitted_at),
                        reviewed_at: sub.and_then(|s| s.reviewed_at),
                        feedback: sub.and_then(|s| s.feedback.clone()),
                    }
                })
                .collect();
            ChildProgress { child: child.clone(), progress, milestones }
        })
        .collect();

    ParentDashboard { children }
}

/// Submission joined with its milestone, child and parent. Missing records
/// fall back to the placeholder strings above.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub milestone_title: String,
    pub milestone_description: String,
    pub milestone_age_group: String,
    pub child_name: String,
    pub child_age: u32,
    pub child_age_group: String,
    pub parent_name: String,
    pub parent_contact: String,
}

/// Lookup tables for enrichment, built once per request.
pub struct Catalog<'a> {
    milestones: HashMap<&'a str, &'a Milestone>,
    children: HashMap<&'a str, &'a Child>,
    users: HashMap<Id, &'a User>,
}

impl<'a> Catalog<'a> {
    pub fn new(milestones: &'a [Milestone], children: &'a [Child], users: &'a [User]) -> Self {
        Self {
            milestones: milestones.iter().map(|m| (m.id.as_str(), m)).collect(),
            children: children.iter().map(|c| (c.id.as_str(), c)).collect(),
            users: users.iter().map(|u| (u.id, u)).collect(),
        }
    }

    pub fn child(&self, id: &str) -> Option<&'a Child> {
        self.children.get(id).copied()
    }

    pub fn enrich(&self, submission: &Submission) -> SubmissionView {
        let milestone = self.milestones.get(submission.milestone_id.as_str()).copied();
        let child = self.child(&submission.child_id);
        let parent = child.and_then(|c| self.users.get(&c.parent_id).copied());
        SubmissionView {
            submission: submission.clone(),
            milestone_title: milestone.map(|m| m.title.clone()).unwrap_or_else(|| UNKNOWN_MILESTONE.into()),
            milestone_description: milestone.map(|m| m.description.clone()).unwrap_or_default(),
            milestone_age_group: milestone.map(|m| m.age_group.as_str().to_string()).unwrap_or_default(),
            child_name: child.map(|c| c.name.clone()).unwrap_or_else(|| UNKNOWN_CHILD.into()),
            child_age: child.map(|c| c.age).unwrap_or(0),
            child_age_group: child.map(|c| c.age_group.as_str().to_string()).unwrap_or_default(),
            parent_name: parent.map(|p| p.name.clone()).unwrap_or_else(|| UNKNOWN_PARENT.into()),
            parent_contact: parent.map(|p| p.contact.clone()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_pending: usize,
    pub total_accepted: usize,
    pub total_rejected: usize,
    pub total_submissions: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerDashboard {
    pub stats: DashboardStats,
    pub pending_submissions: Vec<SubmissionView>,
    pub recently_reviewed: Vec<SubmissionView>,
}

fn count(submissions: &[&Submission], status: SubmissionStatus) -> usize {
    submissions.iter().filter(|s| s.status == status).count()
}

pub fn volunteer_dashboard(catalog: &Catalog<'_>, submissions: &[Submission]) -> VolunteerDashboard {
    let all: Vec<&Submission> = submissions.iter().collect();
    let stats = DashboardStats {
        total_pending: count(&all, SubmissionStatus::Pending),
        total_accepted: count(&all, SubmissionStatus::Accepted),
        total_rejected: count(&all, SubmissionStatus::Rejected),
        total_submissions: all.len(),
    };

    let pending_submissions = all
        .iter()
        .filter(|s| s.status == SubmissionStatus::Pending)
        .map(|s| catalog.enrich(s))
        .collect();

    let mut reviewed: Vec<&Submission> = all
        .iter()
        .copied()
        .filter(|s| s.status != SubmissionStatus::Pending && s.reviewed_at.is_some())
        .collect();
    reviewed.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
    let recently_reviewed = reviewed
        .into_iter()
        .take(RECENTLY_REVIEWED_LIMIT)
        .map(|s| catalog.enrich(s))
        .collect();

    VolunteerDashboard { stats, pending_submissions, recently_reviewed }
}

/// Filters for the volunteer submission list; `None` means "all".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub age_group: Option<AgeGroup>,
}

/// Matching submissions, newest first, enriched.
pub fn filter_submissions(catalog: &Catalog<'_>, submissions: &[Submission], filter: SubmissionFilter) -> Vec<SubmissionView> {
    let mut matching: Vec<&Submission> = submissions
        .iter()
        .filter(|s| filter.status.map_or(true, |st| s.status == st))
        .filter(|s| {
            filter
                .age_group
                .map_or(true, |g| catalog.child(&s.child_id).map_or(false, |c| c.age_group == g))
        })
        .collect();
    matching.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    matching.into_iter().map(|s| catalog.enrich(s)).collect()
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_submissions: usize,
    pub pending_submissions: usize,
    pub accepted_submissions: usize,
    pub rejected_submissions: usize,
    pub acceptance_rate: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgeGroupStats {
    pub age_group: AgeGroup,
    pub total_children: usize,
    pub total_submissions: usize,
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub new_submissions: usize,
    pub reviews_completed: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub overall: OverallStats,
    pub age_groups: Vec<AgeGroupStats>,
    pub recent_activity: RecentActivity,
}

/// accepted / (accepted + rejected) as a percentage with one decimal; 0 when nothing was decided.
pub fn acceptance_rate(accepted: usize, rejected: usize) -> f64 {
    let decided = accepted + rejected;
    if decided == 0 {
        return 0.0;
    }
    let pct = accepted as f64 * 100.0 / decided as f64;
    (pct * 10.0).round() / 10.0
}

pub fn statistics(children: &[Child], submissions: &[Submission], now: DateTime<Utc>) -> Statistics {
    let all: Vec<&Submission> = submissions.iter().collect();
    let accepted = count(&all, SubmissionStatus::Accepted);
    let rejected = count(&all, SubmissionStatus::Rejected);
    let overall = OverallStats {
        total_submissions: all.len(),
        pending_submissions: count(&all, SubmissionStatus::Pending),
        accepted_submissions: accepted,
        rejected_submissions: rejected,
        acceptance_rate: acceptance_rate(accepted, rejected),
    };

    let age_groups = AgeGroup::ALL
        .iter()
        .map(|&group| {
            let child_ids: Vec<&str> = children
                .iter()
                .filter(|c| c.age_group == group)
                .map(|c| c.id.as_str())
                .collect();
            let in_group: Vec<&Submission> = all
                .iter()
                .copied()
                .filter(|s| child_ids.contains(&s.child_id.as_str()))
                .collect();
            AgeGroupStats {
                age_group: group,
                total_children: child_ids.len(),
                total_submissions: in_group.len(),
                pending: count(&in_group, SubmissionStatus::Pending),
                accepted: count(&in_group, SubmissionStatus::Accepted),
                rejected: count(&in_group, SubmissionStatus::Rejected),
            }
        })
        .collect();

    let since = now - Duration::days(RECENT_ACTIVITY_DAYS);
    let recent_activity = RecentActivity {
        new_submissions: all.iter().filter(|s| s.submitted_at >= since).count(),
        reviews_completed: all.iter().filter(|s| s.reviewed_at.map_or(false, |t| t >= since)).count(),
    };

    Statistics { overall, age_groups, recent_activity }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(id: &str, parent: Id, group: AgeGroup) -> Child {
        Child { id: id.into(), parent_id: parent, name: format!("kid-{id}"), age: 2, age_group: group }
    }

    fn milestone(id: &str, group: AgeGroup) -> Milestone {
        Milestone {
            id: id.into(),
            title: format!("title-{id}"),
            description: "desc".into(),
            age_group: group,
            category: "motor".into(),
        }
    }

    fn submission(child: &str, milestone: &str, status: SubmissionStatus, at: DateTime<Utc>) -> Submission {
        Submission {
            id: format!("ms_{child}_{milestone}"),
            child_id: child.into(),
            milestone_id: milestone.into(),
            status,
            media_url: "https://x/a.jpg".into(),
            media_type: None,
            media_size: None,
            media_duration: None,
            file_name: None,
            file_type: None,
            submitted_at: at,
            reviewed_at: (status != SubmissionStatus::Pending).then_some(at),
            reviewed_by: None,
            rejection_reason: None,
            feedback: None,
        }
    }

    #[test]
    fn progress_counts_leave_not_started_uncounted() {
        let now = Utc::now();
        let children = vec![child("c1", 1, AgeGroup::Toddler), child("c2", 2, AgeGroup::Toddler)];
        let milestones = vec![
            milestone("m1", AgeGroup::Toddler),
            milestone("m2", AgeGroup::Toddler),
            milestone("m3", AgeGroup::Toddler),
            milestone("m4", AgeGroup::Toddler),
            milestone("m9", AgeGroup::School),
        ];
        let subs = vec![
            submission("c1", "m1", SubmissionStatus::Accepted, now),
            submission("c1", "m2", SubmissionStatus::Pending, now),
            submission("c1", "m3", SubmissionStatus::Rejected, now),
            submission("c2", "m4", SubmissionStatus::Accepted, now),
        ];

        let dash = parent_dashboard(1, &children, &milestones, &subs);
        assert_eq!(dash.children.len(), 1);
        let c1 = &dash.children[0];
        assert_eq!(c1.progress, Progress { total: 4, completed: 1, pending: 1, rejected: 1 });
        assert!(c1.progress.completed + c1.progress.pending + c1.progress.rejected < c1.progress.total);
        let m4 = c1.milestones.iter().find(|m| m.milestone.id == "m4").unwrap();
        assert_eq!(m4.status, ProgressStatus::NotStarted);
        assert!(m4.media_url.is_none());
    }

    #[test]
    fn unknown_parent_has_no_children() {
        let dash = parent_dashboard(42, &[child("c1", 1, AgeGroup::Toddler)], &[], &[]);
        assert!(dash.children.is_empty());
    }

    #[test]
    fn enrichment_falls_back_to_placeholders() {
        let catalog = Catalog::new(&[], &[], &[]);
        let view = catalog.enrich(&submission("ghost", "nope", SubmissionStatus::Pending, Utc::now()));
        assert_eq!(view.milestone_title, UNKNOWN_MILESTONE);
        assert_eq!(view.child_name, UNKNOWN_CHILD);
        assert_eq!(view.parent_name, UNKNOWN_PARENT);
        assert_eq!(view.child_age, 0);
        assert_eq!(view.parent_contact, "");
    }

    #[test]
    fn acceptance_rate_rounds_to_one_decimal() {
        assert_eq!(acceptance_rate(0, 0), 0.0);
        assert_eq!(acceptance_rate(2, 1), 66.7);
        assert_eq!(acceptance_rate(1, 0), 100.0);
    }

    #[test]
    fn statistics_bucket_by_age_group_and_window() {
        let now = Utc::now();
        let old = now - Duration::days(10);
        let children = vec![child("c1", 1, AgeGroup::Toddler), child("c2", 1, AgeGroup::School)];
        let subs = vec![
            submission("c1", "m1", SubmissionStatus::Accepted, now),
            submission("c1", "m2", SubmissionStatus::Rejected, old),
            submission("c2", "m3", SubmissionStatus::Pending, now),
        ];
        let stats = statistics(&children, &subs, now);
        assert_eq!(stats.overall.total_submissions, 3);
        assert_eq!(stats.overall.acceptance_rate, 50.0);
        assert_eq!(stats.age_groups.len(), 3);
        assert_eq!(stats.age_groups[0].total_submissions, 2);
        assert_eq!(stats.age_groups[1].total_children, 0);
        assert_eq!(stats.age_groups[2].pending, 1);
        assert_eq!(stats.recent_activity, RecentActivity { new_submissions: 2, reviews_completed: 1 });
    }

    #[test]
    fn filter_by_age_group_and_sort_newest_first() {
        let now = Utc::now();
        let children = vec![child("c1", 1, AgeGroup::Toddler), child("c2", 1, AgeGroup::School)];
        let subs = vec![
            submission("c1", "m1", SubmissionStatus::Pending, now - Duration::hours(2)),
            submission("c1", "m2", SubmissionStatus::Pending, now),
            submission("c2", "m3", SubmissionStatus::Pending, now),
        ];
        let catalog = Catalog::new(&[], &children, &[]);
        let out = filter_submissions(
            &catalog,
            &subs,
            SubmissionFilter { status: Some(SubmissionStatus::Pending), age_group: Some(AgeGroup::Toddler) },
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].submission.milestone_id, "m2");
    }

    #[test]
    fn volunteer_dashboard_limits_recent_reviews() {
        let now = Utc::now();
        let subs: Vec<Submission> = (0..12)
            .map(|i| submission("c1", &format!("m{i}"), SubmissionStatus::Accepted, now - Duration::minutes(i)))
            .chain(std::iter::once(submission("c1", "mp", SubmissionStatus::Pending, now)))
            .collect();
        let catalog = Catalog::new(&[], &[], &[]);
        let dash = volunteer_dashboard(&catalog, &subs);
        assert_eq!(dash.stats.total_submissions, 13);
        assert_eq!(dash.stats.total_accepted, 12);
        assert_eq!(dash.pending_submissions.len(), 1);
        assert_eq!(dash.recently_reviewed.len(), 10);
        assert_eq!(dash.recently_reviewed[0].submission.milestone_id, "m0");
    }
}
