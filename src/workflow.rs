//! Dashboard state and the toggle-and-reconcile workflow.
//!
//! The dashboard holds transient copies of server state: the topic list, the
//! problems of the selected topic, the global completed set and the progress
//! summary. Every fetch result goes through one of the `apply_*` methods,
//! which log and swallow failures so the last good snapshot stays on screen.
//!
//! A toggle is split in three steps so a UI can run the network part on
//! another task:
//!
//! 1. [`Dashboard::begin_toggle`] marks the row busy and hands out a ticket.
//! 2. [`reconcile_toggle`] performs the write, then both re-fetches.
//! 3. [`Dashboard::finish_toggle`] applies both results in one step and
//!    releases the row.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::api::TrackerApi;
use crate::error::ApiError;
use crate::models::{Problem, ProgressSummary, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRefresh {
    /// First load of a view: pick the first topic if nothing is selected.
    Initial,
    /// Refresh after a write: keep the selection by id or clear it.
    Reconcile,
}

/// Proof that a row was reserved by [`Dashboard::begin_toggle`].
#[derive(Debug)]
pub struct PendingToggle {
    problem_id: String,
}

#[derive(Debug)]
pub enum ToggleResult {
    /// The write failed; nothing was re-fetched.
    WriteFailed(ApiError),
    /// The write succeeded and both re-fetches settled.
    Reconciled {
        progress: Result<ProgressSummary, ApiError>,
        topics: Result<Vec<Topic>, ApiError>,
    },
}

#[derive(Debug)]
pub struct ToggleOutcome {
    pub problem_id: String,
    pub result: ToggleResult,
}

impl ToggleOutcome {
    pub fn is_unauthorized(&self) -> bool {
        match &self.result {
            ToggleResult::WriteFailed(e) => e.is_unauthorized(),
            ToggleResult::Reconciled { progress, topics } => {
                matches!(progress, Err(e) if e.is_unauthorized())
                    || matches!(topics, Err(e) if e.is_unauthorized())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleStatus {
    /// Write and both re-fetches succeeded.
    Synced,
    /// Write succeeded but a re-fetch failed; counters may lag the server.
    Stale,
    /// Write failed; visible state is unchanged.
    WriteFailed,
}

/// Toggle `pending` on the server and re-fetch both aggregates.
///
/// Progress and topics are requested concurrently and exactly once each; the
/// outcome is returned only after both have settled.
pub async fn reconcile_toggle(api: &dyn TrackerApi, pending: PendingToggle) -> ToggleOutcome {
    let PendingToggle { problem_id } = pending;

    if let Err(e) = api.toggle_problem(&problem_id).await {
        warn!(problem = %problem_id, error = %e, "toggle failed");
        return ToggleOutcome {
            problem_id,
            result: ToggleResult::WriteFailed(e),
        };
    }
    debug!(problem = %problem_id, "toggle committed, reconciling");

    let (progress, topics) = tokio::join!(api.progress(), api.list_topics());
    ToggleOutcome {
        problem_id,
        result: ToggleResult::Reconciled { progress, topics },
    }
}

#[derive(Debug, Default)]
pub struct Dashboard {
    topics: Vec<Topic>,
    selected_topic: Option<String>,
    problems: Vec<Problem>,
    completed: HashSet<String>,
    progress: ProgressSummary,
    loading: bool,
    in_flight: HashSet<String>,
    stale: bool,
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn progress(&self) -> &ProgressSummary {
        &self.progress
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Set when a re-fetch after a committed toggle failed.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn selected_topic_id(&self) -> Option<&str> {
        self.selected_topic.as_deref()
    }

    pub fn selected_topic(&self) -> Option<&Topic> {
        let id = self.selected_topic.as_deref()?;
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn is_completed(&self, problem_id: &str) -> bool {
        self.completed.contains(problem_id)
    }

    pub fn is_toggling(&self, problem_id: &str) -> bool {
        self.in_flight.contains(problem_id)
    }

    pub fn has_pending_toggles(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Point the selection at `topic_id`. Returns true when the selection
    /// changed and the caller should fetch that topic's problems.
    pub fn select_topic(&mut self, topic_id: &str) -> bool {
        if self.selected_topic.as_deref() == Some(topic_id) {
            return false;
        }
        if !self.topics.iter().any(|t| t.id == topic_id) {
            debug!(topic = %topic_id, "ignoring selection of unknown topic");
            return false;
        }
        self.selected_topic = Some(topic_id.to_string());
        self.problems.clear();
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected_topic = None;
        self.problems.clear();
    }

    pub fn apply_topics(&mut self, result: Result<Vec<Topic>, ApiError>, refresh: TopicRefresh) {
        self.loading = false;
        let topics = match result {
            Ok(topics) => topics,
            Err(e) => {
                warn!(error = %e, "failed to fetch topics");
                return;
            }
        };
        self.topics = topics;

        match self.selected_topic.clone() {
            Some(id) => {
                if !self.topics.iter().any(|t| t.id == id) {
                    info!(topic = %id, "selected topic disappeared, clearing selection");
                    self.clear_selection();
                }
            }
            None if refresh == TopicRefresh::Initial => {
                self.selected_topic = self.topics.first().map(|t| t.id.clone());
            }
            None => {}
        }
    }

    /// Results for a topic that is no longer selected are dropped.
    pub fn apply_problems(&mut self, topic_id: &str, result: Result<Vec<Problem>, ApiError>) {
        if self.selected_topic.as_deref() != Some(topic_id) {
            debug!(topic = %topic_id, "discarding problems for deselected topic");
            return;
        }
        match result {
            Ok(problems) => self.problems = problems,
            Err(e) => warn!(topic = %topic_id, error = %e, "failed to fetch problems"),
        }
    }

    pub fn apply_progress(&mut self, result: Result<ProgressSummary, ApiError>) {
        match result {
            Ok(progress) => {
                self.completed = progress.completed_problems.iter().cloned().collect();
                self.progress = progress;
            }
            Err(e) => warn!(error = %e, "failed to fetch progress"),
        }
    }

    /// Reserve `problem_id` for a toggle. Returns `None` while a toggle of the
    /// same row is still reconciling.
    pub fn begin_toggle(&mut self, problem_id: &str) -> Option<PendingToggle> {
        if !self.in_flight.insert(problem_id.to_string()) {
            debug!(problem = %problem_id, "toggle already in flight");
            return None;
        }
        Some(PendingToggle {
            problem_id: problem_id.to_string(),
        })
    }

    pub fn finish_toggle(&mut self, outcome: ToggleOutcome) -> ToggleStatus {
        let ToggleOutcome { problem_id, result } = outcome;

        let status = match result {
            ToggleResult::WriteFailed(_) => ToggleStatus::WriteFailed,
            ToggleResult::Reconciled { progress, topics } => {
                let synced = progress.is_ok() && topics.is_ok();
                self.apply_progress(progress);
                self.apply_topics(topics, TopicRefresh::Reconcile);
                if synced {
                    ToggleStatus::Synced
                } else {
                    self.stale = true;
                    ToggleStatus::Stale
                }
            }
        };

        self.in_flight.remove(&problem_id);
        status
    }

    /// Run a whole toggle from this task. Returns `None` if the row is busy.
    /// A failed write or a 401 on any request comes back as the error and
    /// leaves the dashboard untouched.
    pub async fn toggle(
        &mut self,
        api: &dyn TrackerApi,
        problem_id: &str,
    ) -> Option<Result<ToggleStatus, ApiError>> {
        let pending = self.begin_toggle(problem_id)?;
        let outcome = reconcile_toggle(api, pending).await;
        if outcome.is_unauthorized() {
            self.in_flight.remove(problem_id);
            return Some(Err(ApiError::Unauthorized));
        }
        if let ToggleResult::WriteFailed(e) = outcome.result {
            self.in_flight.remove(problem_id);
            return Some(Err(e));
        }
        Some(Ok(self.finish_toggle(outcome)))
    }

    pub fn apply_snapshot(&mut self, snapshot: Snapshot, refresh: TopicRefresh) {
        let Snapshot {
            topics,
            progress,
            problems,
        } = snapshot;
        let complete = topics.is_ok()
            && progress.is_ok()
            && problems.as_ref().map_or(true, |(_, r)| r.is_ok());

        self.apply_topics(topics, refresh);
        self.apply_progress(progress);
        if let Some((topic_id, result)) = problems {
            self.apply_problems(&topic_id, result);
        }

        if complete {
            self.stale = false;
        }
    }
}

/// Results of a full refresh, applied with [`Dashboard::apply_snapshot`].
#[derive(Debug)]
pub struct Snapshot {
    pub topics: Result<Vec<Topic>, ApiError>,
    pub progress: Result<ProgressSummary, ApiError>,
    pub problems: Option<(String, Result<Vec<Problem>, ApiError>)>,
}

impl Snapshot {
    pub fn is_unauthorized(&self) -> bool {
        matches!(&self.topics, Err(e) if e.is_unauthorized())
            || matches!(&self.progress, Err(e) if e.is_unauthorized())
            || matches!(&self.problems, Some((_, Err(e))) if e.is_unauthorized())
    }
}

/// Fetch topics and progress together, then the problems of the topic that
/// will be selected once the snapshot is applied.
pub async fn fetch_snapshot(
    api: &dyn TrackerApi,
    selected: Option<String>,
    refresh: TopicRefresh,
) -> Snapshot {
    let (topics, progress) = tokio::join!(api.list_topics(), api.progress());

    let target = match (selected, &topics) {
        (Some(id), Ok(list)) if list.iter().any(|t| t.id == id) => Some(id),
        (Some(id), Err(_)) => Some(id),
        (None, Ok(list)) if refresh == TopicRefresh::Initial => list.first().map(|t| t.id.clone()),
        _ => None,
    };

    let problems = match target {
        Some(topic_id) => {
            let result = api.problems_for_topic(&topic_id).await;
            Some((topic_id, result))
        }
        None => None,
    };

    Snapshot {
        topics,
        progress,
        problems,
    }
}
