//! Environment-driven configuration for a single sync run.
//!
//! Everything here is read once at startup; nothing in the library mutates
//! the environment afterwards. Fixture variables point a feed source at a
//! local file instead of the network, with identical parsing behaviour.

use std::env;
use std::path::PathBuf;

use log::warn;

pub const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";
pub const DEFAULT_API_BASE: &str = "https://www.strava.com/api/v3";
pub const DEFAULT_CHECKPOINT: &str = "data/activities.json";
pub const DEFAULT_OUTPUT: &str = "public/data/social_data.json";

/// OAuth credentials for the workout API, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    /// Read the three Strava variables; `None` unless all are present.
    pub fn from_env() -> Option<Self> {
        let client_id = non_empty_var("STRAVA_CLIENT_ID")?;
        let client_secret = non_empty_var("STRAVA_CLIENT_SECRET")?;
        let refresh_token = non_empty_var("STRAVA_REFRESH_TOKEN")?;
        Some(Self {
            client_id,
            client_secret,
            refresh_token,
        })
    }
}

/// Fully resolved run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Option<Credentials>,
    pub letterboxd_user: String,
    pub goodreads_user: String,
    pub letterboxd_fixture: Option<PathBuf>,
    pub goodreads_fixture: Option<PathBuf>,
    pub token_url: String,
    pub api_base: String,
    pub checkpoint_path: PathBuf,
    pub output_path: PathBuf,
    pub per_page: u32,
    pub max_pages: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let credentials = Credentials::from_env();
        if credentials.is_none() {
            warn!("Strava credentials incomplete; the workouts block will be empty");
        }
        Self {
            credentials,
            letterboxd_user: non_empty_var("LETTERBOXD_USER")
                .unwrap_or_else(|| "ncteisen".to_string()),
            goodreads_user: non_empty_var("GOODREADS_USER_ID")
                .unwrap_or_else(|| "44763252-noah-eisen".to_string()),
            letterboxd_fixture: non_empty_var("LETTERBOXD_FIXTURE").map(PathBuf::from),
            goodreads_fixture: non_empty_var("GOODREADS_FIXTURE").map(PathBuf::from),
            token_url: non_empty_var("STRAVA_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            api_base: non_empty_var("STRAVA_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            checkpoint_path: non_empty_var("ACTIVITIES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKPOINT)),
            output_path: non_empty_var("OUTPUT_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            per_page: parsed_var("STRAVA_PER_PAGE").unwrap_or(100),
            max_pages: parsed_var("STRAVA_MAX_PAGES").unwrap_or(10),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    non_empty_var(key).and_then(|v| v.parse().ok())
}
