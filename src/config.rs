use std::path::{Path, PathBuf};

use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://dsamernapp.onrender.com";
const APP_DIR: &str = "dsa-tracker";
const DEFAULT_SESSION_NAME: &str = "session.json";
const LOG_FILE_NAME: &str = "dsa-tracker.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub session_path: PathBuf,
    pub log_path: PathBuf,
}

impl Config {
    /// `api_url` comes from the CLI, which already folds in `DSA_API_URL`.
    pub fn load(api_url: Option<String>) -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::load_in(api_url, &base)
    }

    fn load_in(api_url: Option<String>, base: &Path) -> Self {
        let api_url = api_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let dir = app_dir(base);
        Self {
            api_url,
            session_path: get_session_path(&dir),
            log_path: dir.join(LOG_FILE_NAME),
        }
    }
}

/// The directory is returned even if it could not be created; opening the
/// log or session file then reports the real error.
fn app_dir(base: &Path) -> PathBuf {
    let dir = base.join(APP_DIR);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        warn!(error = %e, path = %dir.display(), "could not create config directory");
    }
    dir
}

fn get_session_path(app_dir: &Path) -> PathBuf {
    if let Ok(path) = std::env::var("DSA_TRACKER_SESSION") {
        return PathBuf::from(path);
    }

    app_dir.join(DEFAULT_SESSION_NAME)
}
