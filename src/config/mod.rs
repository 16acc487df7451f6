//! Configuration management.
//!
//! Settings come from built-in defaults, an optional TOML file and
//! `FIND_REF_*` environment variables, in increasing order of precedence.
//! Nested keys use a double underscore, e.g. `FIND_REF_SEARCH__LIMIT=10`.
//!
//! ```toml
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//! mailto = "you@example.org"
//!
//! [search]
//! limit = 5
//! source_timeout_secs = 20
//! year_window = 1
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 500
//! max_delay_ms = 8000
//! backoff_multiplier = 2.0
//!
//! [sources]
//! enabled = ["crossref", "google_books"]
//! crossref_url = "https://api.crossref.org"
//! google_books_url = "https://www.googleapis.com/books/v1"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::RetryConfig;

/// Default Crossref REST endpoint
pub const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Default Google Books endpoint
pub const GOOGLE_BOOKS_API_BASE: &str = "https://www.googleapis.com/books/v1";

const CONFIG_FILE_NAME: &str = "find-ref.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub sources: SourcesConfig,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Contact address for Crossref's polite pool
    #[serde(default)]
    pub mailto: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            mailto: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// User agent sent to every source
    pub fn user_agent(&self) -> String {
        match &self.mailto {
            Some(mailto) => format!(
                "{}/{} (mailto:{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                mailto
            ),
            None => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// Search behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum results requested from each source
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Bounded wait for one source, retries included
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,

    /// Crossref publication-date filter spans `year ± year_window`
    #[serde(default = "default_year_window")]
    pub year_window: i32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            source_timeout_secs: default_source_timeout(),
            year_window: default_year_window(),
        }
    }
}

impl SearchConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

fn default_limit() -> usize {
    5
}

fn default_source_timeout() -> u64 {
    20
}

fn default_year_window() -> i32 {
    1
}

/// Retry settings as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff")]
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff(),
        }
    }
}

impl RetrySettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: if self.backoff_multiplier.is_finite() {
                self.backoff_multiplier.max(1.0)
            } else {
                default_backoff()
            },
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    8000
}

fn default_backoff() -> f64 {
    2.0
}

/// Which sources to query and where they live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Source ids to query, in output order
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,

    #[serde(default = "default_crossref_url")]
    pub crossref_url: String,

    #[serde(default = "default_google_books_url")]
    pub google_books_url: String,

    #[serde(default = "default_google_books_key")]
    pub google_books_api_key: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            crossref_url: default_crossref_url(),
            google_books_url: default_google_books_url(),
            google_books_api_key: default_google_books_key(),
        }
    }
}

fn default_enabled() -> Vec<String> {
    vec!["crossref".to_string(), "google_books".to_string()]
}

fn default_crossref_url() -> String {
    CROSSREF_API_BASE.to_string()
}

fn default_google_books_url() -> String {
    GOOGLE_BOOKS_API_BASE.to_string()
}

fn default_google_books_key() -> Option<String> {
    std::env::var("GOOGLE_BOOKS_API_KEY").ok()
}

/// Load configuration, layering an optional file under `FIND_REF_*` variables
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("FIND_REF")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("sources.enabled")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Look for a configuration file in the working directory, then the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("find-ref").join("config.toml");
    user.is_file().then_some(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.limit, 5);
        assert_eq!(config.search.year_window, 1);
        assert_eq!(config.sources.enabled, vec!["crossref", "google_books"]);
        assert_eq!(config.sources.crossref_url, CROSSREF_API_BASE);
        assert_eq!(config.retry.retry_config().max_attempts, 3);
    }

    #[test]
    fn test_user_agent_includes_mailto() {
        let mut http = HttpConfig::default();
        assert!(!http.user_agent().contains("mailto"));

        http.mailto = Some("me@example.org".to_string());
        assert!(http.user_agent().ends_with("(mailto:me@example.org)"));
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[search]\nlimit = 8\n\n[sources]\nenabled = [\"google_books\"]\ncrossref_url = \"http://localhost:9\""
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.search.limit, 8);
        assert_eq!(config.search.source_timeout_secs, 20);
        assert_eq!(config.sources.enabled, vec!["google_books"]);
        assert_eq!(config.sources.crossref_url, "http://localhost:9");
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_backoff_multiplier_below_one_is_clamped() {
        let settings = RetrySettings {
            backoff_multiplier: -2.0,
            ..RetrySettings::default()
        };
        assert_eq!(settings.retry_config().backoff_multiplier, 1.0);

        let settings = RetrySettings {
            backoff_multiplier: f64::NAN,
            ..RetrySettings::default()
        };
        assert_eq!(settings.retry_config().backoff_multiplier, 2.0);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let settings = RetrySettings {
            max_attempts: 0,
            ..RetrySettings::default()
        };
        assert_eq!(settings.retry_config().max_attempts, 1);
    }
}
