//! In-memory backend for exercising the client without a network.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::api::TrackerApi;
use crate::error::ApiError;
use crate::models::{
    AuthResponse, ByDifficulty, Credentials, Difficulty, DifficultyStats, NewProblem, NewTopic,
    Problem, ProgressSummary, Registration, Topic, User,
};

#[derive(Debug, Default)]
pub struct CallCounts {
    pub toggles: AtomicUsize,
    pub progress: AtomicUsize,
    pub topics: AtomicUsize,
    pub problems: AtomicUsize,
}

impl CallCounts {
    pub fn toggles(&self) -> usize {
        self.toggles.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::SeqCst)
    }

    pub fn topics(&self) -> usize {
        self.topics.load(Ordering::SeqCst)
    }

    pub fn problems(&self) -> usize {
        self.problems.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct FakeState {
    topics: Vec<(String, String)>,
    problems: Vec<(String, Problem)>,
    completed: HashSet<String>,
    hidden_topics: HashSet<String>,
    logged_in: bool,
    fail_toggle: bool,
    fail_progress: bool,
    fail_topics: bool,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
    pub calls: CallCounts,
}

fn failure() -> ApiError {
    ApiError::HttpStatus {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "fake failure".to_string(),
    }
}

fn percent(completed: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        (f64::from(completed) * 100.0 / f64::from(total)).round()
    }
}

fn problem(id: &str, title: &str, difficulty: Difficulty) -> Problem {
    Problem {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        difficulty,
        youtube_link: None,
        leetcode_link: None,
        codeforces_link: None,
        article_link: None,
    }
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.lock().logged_in = true;
        api
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_topic(self, id: &str, name: &str) -> Self {
        self.lock().topics.push((id.to_string(), name.to_string()));
        self
    }

    pub fn with_problem(self, topic_id: &str, id: &str, difficulty: Difficulty) -> Self {
        let title = format!("Problem {}", id);
        self.lock()
            .problems
            .push((topic_id.to_string(), problem(id, &title, difficulty)));
        self
    }

    pub fn with_completed(self, ids: &[&str]) -> Self {
        self.lock()
            .completed
            .extend(ids.iter().map(|id| id.to_string()));
        self
    }

    pub fn logged_out(self) -> Self {
        self.lock().logged_in = false;
        self
    }

    /// Topic `t1` "Arrays" with p1..p5, p1..p3 completed.
    pub fn arrays_sheet() -> Self {
        FakeApi::new()
            .with_topic("t1", "Arrays")
            .with_topic("t2", "Graphs")
            .with_problem("t1", "p1", Difficulty::Easy)
            .with_problem("t1", "p2", Difficulty::Easy)
            .with_problem("t1", "p3", Difficulty::Medium)
            .with_problem("t1", "p4", Difficulty::Medium)
            .with_problem("t1", "p5", Difficulty::Hard)
            .with_problem("t2", "g1", Difficulty::Hard)
            .with_completed(&["p1", "p2", "p3"])
    }

    pub fn set_fail_toggle(&self, fail: bool) {
        self.lock().fail_toggle = fail;
    }

    pub fn set_fail_progress(&self, fail: bool) {
        self.lock().fail_progress = fail;
    }

    pub fn set_fail_topics(&self, fail: bool) {
        self.lock().fail_topics = fail;
    }

    pub fn hide_topic(&self, id: &str) {
        self.lock().hidden_topics.insert(id.to_string());
    }

    pub fn is_completed(&self, problem_id: &str) -> bool {
        self.lock().completed.contains(problem_id)
    }

    fn topic_snapshot(state: &FakeState, id: &str, name: &str) -> Topic {
        let in_topic: Vec<&Problem> = state
            .problems
            .iter()
            .filter(|(topic_id, _)| topic_id == id)
            .map(|(_, p)| p)
            .collect();
        let total = in_topic.len() as u32;
        let completed = in_topic
            .iter()
            .filter(|p| state.completed.contains(&p.id))
            .count() as u32;
        Topic {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            total_problems: total,
            completed_problems: completed,
            completion_percentage: percent(completed, total),
            completed_flag: Some(total > 0 && completed == total),
        }
    }

    fn require_login(&self) -> Result<(), ApiError> {
        if self.lock().logged_in {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[async_trait]
impl TrackerApi for FakeApi {
    async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        Ok(User {
            id: Some("u-new".to_string()),
            name: registration.name.clone(),
            email: registration.email.clone(),
            created_at: None,
        })
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        if credentials.password != "pw" {
            return Err(ApiError::HttpStatus {
                status: StatusCode::BAD_REQUEST,
                message: "Invalid credentials".to_string(),
            });
        }
        self.lock().logged_in = true;
        Ok(AuthResponse {
            token: "fake-token".to_string(),
            user: User {
                id: Some("u1".to_string()),
                name: "Ada".to_string(),
                email: credentials.email.clone(),
                created_at: None,
            },
        })
    }

    async fn profile(&self) -> Result<User, ApiError> {
        self.require_login()?;
        Ok(User {
            id: Some("u1".to_string()),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            created_at: None,
        })
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, ApiError> {
        self.calls.topics.fetch_add(1, Ordering::SeqCst);
        self.require_login()?;
        let state = self.lock();
        if state.fail_topics {
            return Err(failure());
        }
        Ok(state
            .topics
            .iter()
            .filter(|(id, _)| !state.hidden_topics.contains(id))
            .map(|(id, name)| Self::topic_snapshot(&state, id, name))
            .collect())
    }

    async fn get_topic(&self, topic_id: &str) -> Result<Topic, ApiError> {
        self.require_login()?;
        let state = self.lock();
        state
            .topics
            .iter()
            .find(|(id, _)| id == topic_id)
            .map(|(id, name)| Self::topic_snapshot(&state, id, name))
            .ok_or(ApiError::HttpStatus {
                status: StatusCode::NOT_FOUND,
                message: "Topic not found".to_string(),
            })
    }

    async fn create_topic(&self, topic: &NewTopic) -> Result<Topic, ApiError> {
        self.require_login()?;
        let mut state = self.lock();
        let id = format!("t{}", state.topics.len() + 1);
        state.topics.push((id.clone(), topic.name.clone()));
        Ok(Self::topic_snapshot(&state, &id, &topic.name))
    }

    async fn list_problems(&self) -> Result<Vec<Problem>, ApiError> {
        self.require_login()?;
        Ok(self.lock().problems.iter().map(|(_, p)| p.clone()).collect())
    }

    async fn problems_for_topic(&self, topic_id: &str) -> Result<Vec<Problem>, ApiError> {
        self.calls.problems.fetch_add(1, Ordering::SeqCst);
        self.require_login()?;
        Ok(self
            .lock()
            .problems
            .iter()
            .filter(|(id, _)| id == topic_id)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn create_problem(&self, new: &NewProblem) -> Result<Problem, ApiError> {
        self.require_login()?;
        let mut state = self.lock();
        let id = format!("p{}", state.problems.len() + 1);
        let created = problem(&id, &new.title, new.difficulty);
        state.problems.push((new.topic.clone(), created.clone()));
        Ok(created)
    }

    async fn toggle_problem(&self, problem_id: &str) -> Result<(), ApiError> {
        self.calls.toggles.fetch_add(1, Ordering::SeqCst);
        self.require_login()?;
        let mut state = self.lock();
        if state.fail_toggle {
            return Err(failure());
        }
        if !state.completed.remove(problem_id) {
            state.completed.insert(problem_id.to_string());
        }
        Ok(())
    }

    async fn progress(&self) -> Result<ProgressSummary, ApiError> {
        self.calls.progress.fetch_add(1, Ordering::SeqCst);
        self.require_login()?;
        let state = self.lock();
        if state.fail_progress {
            return Err(failure());
        }

        let stats = |difficulty: Option<Difficulty>| {
            let matching: Vec<&Problem> = state
                .problems
                .iter()
                .map(|(_, p)| p)
                .filter(|p| difficulty.map_or(true, |d| p.difficulty == d))
                .collect();
            let total = matching.len() as u32;
            let completed = matching
                .iter()
                .filter(|p| state.completed.contains(&p.id))
                .count() as u32;
            DifficultyStats {
                total,
                completed,
                percentage: percent(completed, total),
            }
        };

        let overall = stats(None);
        let mut completed_problems: Vec<String> = state.completed.iter().cloned().collect();
        completed_problems.sort();

        Ok(ProgressSummary {
            completed_count: overall.completed,
            total_problems: overall.total,
            progress_percentage: overall.percentage,
            completed_problems,
            by_difficulty: ByDifficulty {
                easy: stats(Some(Difficulty::Easy)),
                medium: stats(Some(Difficulty::Medium)),
                hard: stats(Some(Difficulty::Hard)),
            },
        })
    }
}
