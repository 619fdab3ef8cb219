use serde::{Deserialize, Deserializer, Serialize};

use crate::display;
use crate::error::ValidationError;

// Percentages arrive as numbers or as numeric strings ("66.67").
fn deserialize_percentage<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null,
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Null => Ok(0.0),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_problems: u32,
    #[serde(default)]
    pub completed_problems: u32,
    #[serde(default, deserialize_with = "deserialize_percentage")]
    pub completion_percentage: f64,
    #[serde(
        rename = "isCompleted",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_flag: Option<bool>,
}

impl Topic {
    /// The server's `isCompleted` wins; the count rule is only a fallback.
    pub fn is_completed(&self) -> bool {
        self.completed_flag.unwrap_or_else(|| {
            display::is_topic_completed(self.completed_problems, self.total_problems)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "Easy", alias = "easy", alias = "EASY")]
    Easy,
    #[serde(rename = "Medium", alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(rename = "Hard", alias = "hard", alias = "HARD")]
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "e" => Some(Difficulty::Easy),
            "medium" | "m" => Some(Difficulty::Medium),
            "hard" | "h" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leetcode_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codeforces_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_link: Option<String>,
}

impl Problem {
    /// Reference links that are actually set, labelled for display.
    pub fn links(&self) -> Vec<(&'static str, &str)> {
        [
            ("YouTube", &self.youtube_link),
            ("LeetCode", &self.leetcode_link),
            ("Codeforces", &self.codeforces_link),
            ("Article", &self.article_link),
        ]
        .into_iter()
        .filter_map(|(label, link)| {
            link.as_deref()
                .filter(|url| !url.trim().is_empty())
                .map(|url| (label, url))
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultyStats {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub completed: u32,
    #[serde(default, deserialize_with = "deserialize_percentage")]
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ByDifficulty {
    #[serde(default, deserialize_with = "null_as_default")]
    pub easy: DifficultyStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub medium: DifficultyStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hard: DifficultyStats,
}

impl ByDifficulty {
    pub fn get(&self, difficulty: Difficulty) -> &DifficultyStats {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }
}

/// Aggregate progress for the current user, owned entirely by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    #[serde(default)]
    pub completed_count: u32,
    #[serde(default)]
    pub total_problems: u32,
    #[serde(default, deserialize_with = "deserialize_percentage")]
    pub progress_percentage: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed_problems: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_difficulty: ByDifficulty,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: User,
}

// `/auth/register` answers either with `{ user, ... }` or with the bare record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RegisterResponse {
    Wrapped { user: User },
    Bare(User),
}

impl RegisterResponse {
    pub fn into_user(self) -> User {
        match self {
            RegisterResponse::Wrapped { user } => user,
            RegisterResponse::Bare(user) => user,
        }
    }
}

fn required(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::MissingFields)
    } else {
        Ok(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Result<Self, ValidationError> {
        let email = required(email)?;
        if password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(name: &str, email: &str, password: &str) -> Result<Self, ValidationError> {
        let name = required(name)?;
        let credentials = Credentials::new(email, password)?;
        Ok(Self {
            name,
            email: credentials.email,
            password: credentials.password,
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTopic {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewTopic {
    pub fn new(name: &str, description: Option<&str>) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required(name)?,
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProblem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leetcode_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codeforces_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_link: Option<String>,
}

impl NewProblem {
    pub fn new(title: &str, difficulty: &str, topic_id: &str) -> Result<Self, ValidationError> {
        let difficulty = Difficulty::from_str(difficulty)
            .ok_or_else(|| ValidationError::Difficulty(difficulty.to_string()))?;
        Ok(Self {
            title: required(title)?,
            description: None,
            difficulty,
            topic: required(topic_id)?,
            youtube_link: None,
            leetcode_link: None,
            codeforces_link: None,
            article_link: None,
        })
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod topic_tests {
        use super::*;

        #[test]
        fn parses_backend_topic() {
            let topic: Topic = serde_json::from_str(
                r#"{
                    "_id": "t1",
                    "name": "Arrays",
                    "description": "Contiguous storage",
                    "totalProblems": 5,
                    "completedProblems": 3,
                    "completionPercentage": 60,
                    "isCompleted": false,
                    "__v": 0
                }"#,
            )
            .unwrap();
            assert_eq!(topic.id, "t1");
            assert_eq!(topic.total_problems, 5);
            assert_eq!(topic.completed_problems, 3);
            assert_eq!(topic.completion_percentage, 60.0);
            assert!(!topic.is_completed());
        }

        #[test]
        fn percentage_as_string() {
            let topic: Topic =
                serde_json::from_str(r#"{"_id":"t1","name":"A","completionPercentage":"66.67"}"#)
                    .unwrap();
            assert_eq!(topic.completion_percentage, 66.67);
        }

        #[test]
        fn missing_aggregates_default_to_zero() {
            let topic: Topic = serde_json::from_str(r#"{"_id":"t1","name":"A"}"#).unwrap();
            assert_eq!(topic.total_problems, 0);
            assert_eq!(topic.completion_percentage, 0.0);
            assert!(!topic.is_completed());
        }

        #[test]
        fn server_flag_is_authoritative() {
            let topic: Topic = serde_json::from_str(
                r#"{"_id":"t1","name":"A","totalProblems":2,"completedProblems":2,"isCompleted":false}"#,
            )
            .unwrap();
            assert!(!topic.is_completed());
        }

        #[test]
        fn falls_back_to_counts_without_flag() {
            let topic: Topic = serde_json::from_str(
                r#"{"_id":"t1","name":"A","totalProblems":2,"completedProblems":2}"#,
            )
            .unwrap();
            assert!(topic.is_completed());
        }
    }

    mod problem_tests {
        use super::*;

        #[test]
        fn difficulty_is_case_insensitive_on_the_wire() {
            for raw in ["Easy", "easy", "EASY"] {
                let json = format!(r#"{{"_id":"p1","title":"Two Sum","difficulty":"{}"}}"#, raw);
                let problem: Problem = serde_json::from_str(&json).unwrap();
                assert_eq!(problem.difficulty, Difficulty::Easy);
            }
        }

        #[test]
        fn unknown_difficulty_is_rejected() {
            let result: Result<Problem, _> =
                serde_json::from_str(r#"{"_id":"p1","title":"X","difficulty":"Insane"}"#);
            assert!(result.is_err());
        }

        #[test]
        fn links_skip_missing_and_blank() {
            let problem: Problem = serde_json::from_str(
                r#"{
                    "_id": "p1",
                    "title": "Two Sum",
                    "difficulty": "Easy",
                    "youtubeLink": "",
                    "leetcodeLink": "https://leetcode.com/problems/two-sum/",
                    "articleLink": null
                }"#,
            )
            .unwrap();
            assert_eq!(
                problem.links(),
                vec![("LeetCode", "https://leetcode.com/problems/two-sum/")]
            );
        }

        #[test]
        fn difficulty_from_str() {
            assert_eq!(Difficulty::from_str("Medium"), Some(Difficulty::Medium));
            assert_eq!(Difficulty::from_str("h"), Some(Difficulty::Hard));
            assert_eq!(Difficulty::from_str("extreme"), None);
        }
    }

    mod progress_tests {
        use super::*;

        #[test]
        fn parses_full_summary() {
            let progress: ProgressSummary = serde_json::from_str(
                r#"{
                    "completedCount": 4,
                    "totalProblems": 10,
                    "progressPercentage": "40.00",
                    "completedProblems": ["p1", "p2", "p3", "p4"],
                    "byDifficulty": {
                        "easy": {"total": 4, "completed": 3, "percentage": 75},
                        "medium": {"total": 4, "completed": 1, "percentage": "25.00"},
                        "hard": {"total": 2, "completed": 0, "percentage": 0}
                    }
                }"#,
            )
            .unwrap();
            assert_eq!(progress.completed_count, 4);
            assert_eq!(progress.progress_percentage, 40.0);
            assert_eq!(progress.completed_problems.len(), 4);
            assert_eq!(progress.by_difficulty.get(Difficulty::Easy).completed, 3);
            assert_eq!(progress.by_difficulty.get(Difficulty::Medium).percentage, 25.0);
        }

        #[test]
        fn zero_attempts_summary() {
            let progress: ProgressSummary = serde_json::from_str(
                r#"{"completedCount":0,"totalProblems":0,"progressPercentage":0}"#,
            )
            .unwrap();
            assert_eq!(progress, ProgressSummary::default());
        }

        #[test]
        fn null_breakdown_defaults() {
            let progress: ProgressSummary = serde_json::from_str(
                r#"{"completedCount":1,"totalProblems":2,"progressPercentage":50,"completedProblems":null,"byDifficulty":null}"#,
            )
            .unwrap();
            assert!(progress.completed_problems.is_empty());
            assert_eq!(progress.by_difficulty, ByDifficulty::default());
        }
    }

    mod request_tests {
        use super::*;

        #[test]
        fn credentials_require_both_fields() {
            assert_eq!(
                Credentials::new("", "secret").unwrap_err(),
                ValidationError::MissingFields
            );
            assert_eq!(
                Credentials::new("a@b.c", "").unwrap_err(),
                ValidationError::MissingFields
            );
            assert_eq!(Credentials::new(" a@b.c ", "pw").unwrap().email, "a@b.c");
        }

        #[test]
        fn registration_requires_name() {
            assert!(Registration::new("  ", "a@b.c", "pw").is_err());
            let reg = Registration::new("Ada", "a@b.c", "pw").unwrap();
            assert_eq!(reg.credentials().email, "a@b.c");
        }

        #[test]
        fn new_topic_drops_blank_description() {
            let topic = NewTopic::new("Graphs", Some("   ")).unwrap();
            assert!(topic.description.is_none());
            assert!(NewTopic::new("", None).is_err());
        }

        #[test]
        fn new_problem_validates_difficulty() {
            assert_eq!(
                NewProblem::new("Two Sum", "insane", "t1").unwrap_err(),
                ValidationError::Difficulty("insane".to_string())
            );
            let problem = NewProblem::new("Two Sum", "easy", "t1").unwrap();
            let json = serde_json::to_value(&problem).unwrap();
            assert_eq!(json["difficulty"], "Easy");
            assert_eq!(json["topic"], "t1");
        }

        #[test]
        fn register_response_shapes() {
            let wrapped: RegisterResponse =
                serde_json::from_str(r#"{"user":{"_id":"u1","name":"Ada","email":"a@b.c"},"token":"x"}"#)
                    .unwrap();
            assert_eq!(wrapped.into_user().name, "Ada");

            let bare: RegisterResponse =
                serde_json::from_str(r#"{"_id":"u1","name":"Ada","email":"a@b.c"}"#).unwrap();
            assert_eq!(bare.into_user().id.as_deref(), Some("u1"));
        }
    }
}
