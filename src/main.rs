mod api;
mod config;
mod display;
mod error;
#[cfg(test)]
mod fake_api;
mod logging;
mod models;
mod session;
mod tui;
mod workflow;

use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::warn;

use api::{HttpApi, TrackerApi};
use config::Config;
use display::{format_date, motivation, round_percent, truncate};
use error::ApiError;
use models::{Credentials, JsonOutput, NewProblem, NewTopic, Problem, Registration};
use session::{gate, Gate, SessionContext, SessionStore, StoredSession};
use workflow::{Dashboard, ToggleStatus, TopicRefresh};

#[derive(Parser)]
#[command(name = "dsa-tracker")]
#[command(about = "Track your progress through a DSA practice sheet")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Base URL of the tracker API
    #[arg(long, global = true, env = "DSA_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Register {
        /// Display name
        name: String,

        /// Email address
        email: String,

        #[arg(long, short)]
        password: String,
    },

    /// Log in and store the session
    Login {
        /// Email address
        email: String,

        #[arg(long, short)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user and overall progress
    Profile,

    /// Manage topics
    #[command(subcommand)]
    Topic(TopicCommands),

    /// Manage problems
    #[command(subcommand)]
    Problem(ProblemCommands),

    /// List the problems of a topic with their completion state
    Problems {
        /// Topic ID
        topic_id: String,
    },

    /// Flip a problem between completed and not completed
    Toggle {
        /// Problem ID
        problem_id: String,

        /// Topic to report updated counts for
        #[arg(long, short)]
        topic: Option<String>,
    },

    /// Show overall, per-difficulty and per-topic progress
    Progress,

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum TopicCommands {
    /// List all topics
    List,

    /// Add a new topic
    Add {
        /// Topic name
        name: String,

        /// Topic description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// Show topic details and its problems
    Show {
        /// Topic ID
        id: String,
    },
}

#[derive(Subcommand)]
enum ProblemCommands {
    /// List every problem
    List,

    /// Add a problem to a topic
    Add {
        /// Problem title
        title: String,

        /// Difficulty: easy/medium/hard
        #[arg(long, short)]
        difficulty: String,

        /// Topic ID
        #[arg(long, short)]
        topic: String,
    },
}

impl Commands {
    fn needs_session(&self) -> bool {
        !matches!(
            self,
            Commands::Register { .. } | Commands::Login { .. } | Commands::Logout | Commands::Tui
        )
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load(cli.api_url.clone());

    if matches!(cli.command, Commands::Tui) {
        logging::init_file(&config.log_path)?;
    } else {
        logging::init_stderr();
    }

    let store = SessionStore::new(&config.session_path);
    let stored = store.load().unwrap_or_else(|e| {
        warn!(error = %e, path = %store.path().display(), "ignoring unreadable session file");
        None
    });
    let session = SessionContext::new(stored.as_ref().map(|s| s.token.clone()));
    let api = HttpApi::new(&config.api_url, session.clone());
    let runtime = Runtime::new()?;

    if matches!(cli.command, Commands::Tui) {
        let user = stored.and_then(|s| s.user);
        return tui::run(runtime.handle().clone(), Arc::new(api), session, store, user);
    }

    if cli.command.needs_session() && gate(session.initial_status()) == Gate::RedirectToLogin {
        return print_not_logged_in(cli.json);
    }

    let ctx = Context {
        api: &api,
        session: &session,
        store: &store,
        json: cli.json,
    };
    match runtime.block_on(ctx.dispatch(cli.command)) {
        Err(e) if is_unauthorized(&*e) => {
            store.clear()?;
            session.clear();
            print_not_logged_in(cli.json)
        }
        other => other,
    }
}

fn is_unauthorized(e: &(dyn Error + 'static)) -> bool {
    e.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_unauthorized)
}

fn print_not_logged_in(json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!(
            "{}",
            serde_json::to_string(&JsonOutput::<()>::err("Not logged in"))?
        );
    } else {
        println!("Not logged in. Run `dsa-tracker login <email> --password <password>` first.");
    }
    Ok(())
}

fn print_json<T: Serialize>(data: T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn checkbox(done: bool) -> &'static str {
    if done {
        "[x]"
    } else {
        "[ ]"
    }
}

fn print_problem_table(problems: &[Problem], completed: &HashSet<String>) {
    println!("    {:<26} {:<42} {:<7} LINKS", "ID", "TITLE", "LEVEL");
    println!("{}", "-".repeat(90));
    for problem in problems {
        let links: Vec<&str> = problem.links().into_iter().map(|(label, _)| label).collect();
        println!(
            "{} {:<26} {:<42} {:<7} {}",
            checkbox(completed.contains(&problem.id)),
            problem.id,
            truncate(&problem.title, 40),
            problem.difficulty.label(),
            if links.is_empty() {
                "-".to_string()
            } else {
                links.join(", ")
            }
        );
    }
}

struct Context<'a> {
    api: &'a dyn TrackerApi,
    session: &'a SessionContext,
    store: &'a SessionStore,
    json: bool,
}

impl Context<'_> {
    async fn completed_set(&self) -> Result<HashSet<String>, ApiError> {
        let progress = self.api.progress().await?;
        Ok(progress.completed_problems.into_iter().collect())
    }

    async fn login(&self, credentials: &Credentials) -> Result<StoredSession, Box<dyn Error>> {
        let response = self.api.login(credentials).await?;
        self.session.set_token(response.token.clone());
        let stored = StoredSession::from_login(&response);
        self.store.save(&stored)?;
        Ok(stored)
    }

    async fn dispatch(&self, command: Commands) -> Result<(), Box<dyn Error>> {
        match command {
            Commands::Register {
                name,
                email,
                password,
            } => {
                let registration = Registration::new(&name, &email, &password)?;
                self.api.register(&registration).await?;
                let stored = self.login(&registration.credentials()).await?;

                if self.json {
                    print_json(&stored.user)?;
                } else {
                    println!("Registered and logged in as {}.", registration.email);
                }
            }

            Commands::Login { email, password } => {
                let credentials = Credentials::new(&email, &password)?;
                let stored = match self.login(&credentials).await {
                    Err(e) if is_unauthorized(&*e) => {
                        return Err(ApiError::Unauthorized.user_message().into())
                    }
                    other => other?,
                };

                if self.json {
                    print_json(&stored.user)?;
                } else {
                    let name = stored
                        .user
                        .as_ref()
                        .map(|u| u.name.as_str())
                        .filter(|n| !n.is_empty())
                        .unwrap_or(credentials.email.as_str());
                    println!("Logged in as {}.", name);
                }
            }

            Commands::Logout => {
                let removed = self.store.clear()?;
                self.session.clear();
                if self.json {
                    print_json(serde_json::json!({ "loggedOut": removed }))?;
                } else if removed {
                    println!("Logged out.");
                } else {
                    println!("Not logged in.");
                }
            }

            Commands::Profile => {
                let (user, progress) = tokio::join!(self.api.profile(), self.api.progress());
                let (user, progress) = (user?, progress?);

                if self.json {
                    print_json(serde_json::json!({ "user": user, "progress": progress }))?;
                } else {
                    println!("Name: {}", user.name);
                    println!("Email: {}", user.email);
                    if let Some(created) = &user.created_at {
                        println!("Member since: {}", format_date(created));
                    }
                    println!(
                        "Solved: {}/{} ({}%)",
                        progress.completed_count,
                        progress.total_problems,
                        round_percent(progress.progress_percentage)
                    );
                    println!();
                    println!("{}", motivation(&progress));
                }
            }

            Commands::Topic(topic_cmd) => match topic_cmd {
                TopicCommands::List => {
                    let topics = self.api.list_topics().await?;
                    if self.json {
                        print_json(&topics)?;
                    } else if topics.is_empty() {
                        println!("No topics found.");
                    } else {
                        println!("{:<26} {:<32} {:>7} {:>5}", "ID", "NAME", "DONE", "%");
                        println!("{}", "-".repeat(74));
                        for topic in topics {
                            println!(
                                "{:<26} {:<32} {:>7} {:>4}%{}",
                                topic.id,
                                truncate(&topic.name, 30),
                                format!("{}/{}", topic.completed_problems, topic.total_problems),
                                round_percent(topic.completion_percentage),
                                if topic.is_completed() { " ✓" } else { "" }
                            );
                        }
                    }
                }

                TopicCommands::Add { name, description } => {
                    let new_topic = NewTopic::new(&name, description.as_deref())?;
                    let topic = self.api.create_topic(&new_topic).await?;
                    if self.json {
                        print_json(&topic)?;
                    } else {
                        println!("Added topic '{}' with ID: {}", topic.name, topic.id);
                    }
                }

                TopicCommands::Show { id } => {
                    let (topic, problems, completed) = tokio::join!(
                        self.api.get_topic(&id),
                        self.api.problems_for_topic(&id),
                        self.completed_set()
                    );
                    let (topic, problems, completed) = (topic?, problems?, completed?);

                    if self.json {
                        print_json(serde_json::json!({ "topic": topic, "problems": problems }))?;
                    } else {
                        println!("Topic: {}", topic.name);
                        println!("ID: {}", topic.id);
                        if let Some(desc) = topic.description.as_deref().filter(|d| !d.is_empty()) {
                            println!("Description: {}", desc);
                        }
                        println!(
                            "Progress: {}/{} ({}%){}",
                            topic.completed_problems,
                            topic.total_problems,
                            round_percent(topic.completion_percentage),
                            if topic.is_completed() { " - completed!" } else { "" }
                        );
                        if !problems.is_empty() {
                            println!();
                            print_problem_table(&problems, &completed);
                        }
                    }
                }
            },

            Commands::Problem(problem_cmd) => match problem_cmd {
                ProblemCommands::List => {
                    let (problems, completed) =
                        tokio::join!(self.api.list_problems(), self.completed_set());
                    let (problems, completed) = (problems?, completed?);
                    if self.json {
                        print_json(&problems)?;
                    } else if problems.is_empty() {
                        println!("No problems found.");
                    } else {
                        print_problem_table(&problems, &completed);
                    }
                }

                ProblemCommands::Add {
                    title,
                    difficulty,
                    topic,
                } => {
                    let new_problem = NewProblem::new(&title, &difficulty, &topic)?;
                    let problem = self.api.create_problem(&new_problem).await?;
                    if self.json {
                        print_json(&problem)?;
                    } else {
                        println!("Added problem '{}' with ID: {}", problem.title, problem.id);
                    }
                }
            },

            Commands::Problems { topic_id } => {
                let (problems, completed) = tokio::join!(
                    self.api.problems_for_topic(&topic_id),
                    self.completed_set()
                );
                let (problems, completed) = (problems?, completed?);
                if self.json {
                    let rows: Vec<_> = problems
                        .iter()
                        .map(|p| {
                            serde_json::json!({
                                "problem": p,
                                "completed": completed.contains(&p.id),
                            })
                        })
                        .collect();
                    print_json(rows)?;
                } else if problems.is_empty() {
                    println!("No problems in this topic.");
                } else {
                    print_problem_table(&problems, &completed);
                }
            }

            Commands::Toggle { problem_id, topic } => {
                let mut dashboard = Dashboard::new();
                if let Some(topic_id) = &topic {
                    let topics = self.api.list_topics().await?;
                    dashboard.apply_topics(Ok(topics), TopicRefresh::Reconcile);
                    if !dashboard.select_topic(topic_id) {
                        return Err(format!("Topic '{}' not found", topic_id).into());
                    }
                }

                let status = match dashboard.toggle(self.api, &problem_id).await {
                    Some(result) => result?,
                    None => return Err("problem is already being updated".into()),
                };
                let done = dashboard.is_completed(&problem_id);
                let progress = dashboard.progress();

                if self.json {
                    print_json(serde_json::json!({
                        "problemId": problem_id,
                        "completed": done,
                        "synced": status == ToggleStatus::Synced,
                        "topic": dashboard.selected_topic(),
                        "progress": progress,
                    }))?;
                    return Ok(());
                }

                if status == ToggleStatus::Stale {
                    println!("Toggled {}, but the updated counts could not be fetched.", problem_id);
                    println!("Run `dsa-tracker progress` to see current totals.");
                    return Ok(());
                }
                println!(
                    "{} {} marked as {}.",
                    checkbox(done),
                    problem_id,
                    if done { "completed" } else { "not completed" }
                );
                if let Some(t) = dashboard.selected_topic() {
                    println!(
                        "{}: {}/{} ({}%)",
                        t.name,
                        t.completed_problems,
                        t.total_problems,
                        round_percent(t.completion_percentage)
                    );
                } else if topic.is_some() {
                    println!("The topic is no longer listed.");
                }
                println!(
                    "Overall: {}/{} ({}%)",
                    progress.completed_count,
                    progress.total_problems,
                    round_percent(progress.progress_percentage)
                );
            }

            Commands::Progress => {
                let (progress, topics) = tokio::join!(self.api.progress(), self.api.list_topics());
                let (progress, topics) = (progress?, topics?);

                if self.json {
                    print_json(serde_json::json!({ "progress": progress, "topics": topics }))?;
                } else {
                    println!("=== Overall Progress ===");
                    println!(
                        "Solved: {}/{} ({}%)",
                        progress.completed_count,
                        progress.total_problems,
                        round_percent(progress.progress_percentage)
                    );
                    println!(
                        "Topics completed: {}/{}",
                        topics.iter().filter(|t| t.is_completed()).count(),
                        topics.len()
                    );
                    println!();
                    println!("=== By Difficulty ===");
                    for difficulty in models::Difficulty::ALL {
                        let stats = progress.by_difficulty.get(difficulty);
                        println!(
                            "{:<7} {}/{} ({}%)",
                            difficulty.label(),
                            stats.completed,
                            stats.total,
                            round_percent(stats.percentage)
                        );
                    }
                    if !topics.is_empty() {
                        println!();
                        println!("=== By Topic ===");
                        for topic in &topics {
                            println!(
                                "{:<32} {:>7} {:>4}%",
                                truncate(&topic.name, 30),
                                format!("{}/{}", topic.completed_problems, topic.total_problems),
                                round_percent(topic.completion_percentage)
                            );
                        }
                    }
                }
            }

            Commands::Tui => unreachable!("handled before dispatch"),
        }

        Ok(())
    }
}
