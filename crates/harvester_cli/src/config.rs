//! Configuration file support for harvester.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `HARVESTER_`, e.g., `HARVESTER_GITHUB_TOKEN`)
//! 3. Config file (./harvester.toml, then ~/.config/harvester/config.toml)
//! 4. Built-in defaults
//!
//! The GitHub token falls back to the plain `GITHUB_TOKEN` variable.
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use HARVESTER_GITHUB_TOKEN / GITHUB_TOKEN
//! api_url = "https://api.github.com"
//!
//! [paths]
//! projects = "resources/projects_2025_rpa.csv"
//! by_code = "resources/projects_2025_rpa_by_code.csv"
//! details = "resources/projects_2025_rpa_by_code_details.csv"
//! intersect = "resources/projects_2025_rpa_intersect.csv"
//!
//! [collect]
//! start_stars = 1000
//! stop_stars = 100
//! step_stars = 200
//! recent_days = 120
//!
//! [code_search]
//! max_pages = 100
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use harvester::collect::by_code::{DEFAULT_MAX_PAGES, DEFAULT_SEARCH_STRINGS};
use harvester::github::DEFAULT_API_URL;
use harvester::query::{BracketPlan, DEFAULT_RECENT_DAYS};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable consulted when no token is configured.
pub const FALLBACK_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Configuration problems that stop a command before it starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "No GitHub token configured. Set HARVESTER_GITHUB_TOKEN or GITHUB_TOKEN, \
         or add `token` under [github] in harvester.toml."
    )]
    MissingToken,
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub paths: PathsConfig,
    pub collect: CollectConfig,
    pub code_search: CodeSearchSettings,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    /// Can also be set via HARVESTER_GITHUB_TOKEN environment variable.
    pub token: Option<String>,
    /// API root; GraphQL lives at `{api_url}/graphql`.
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Dataset locations.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Starred-search dataset.
    pub projects: PathBuf,
    /// Code-search dataset.
    pub by_code: PathBuf,
    /// Per-repository details of the code-search dataset.
    pub details: PathBuf,
    /// Intersection of the starred and details datasets.
    pub intersect: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            projects: PathBuf::from("resources/projects_2025_rpa.csv"),
            by_code: PathBuf::from("resources/projects_2025_rpa_by_code.csv"),
            details: PathBuf::from("resources/projects_2025_rpa_by_code_details.csv"),
            intersect: PathBuf::from("resources/projects_2025_rpa_intersect.csv"),
        }
    }
}

/// Star collection defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    pub start_stars: u64,
    pub stop_stars: u64,
    pub step_stars: u64,
    pub max_stars: Option<u64>,
    pub recent_days: u64,
    pub initial_page_size: u32,
    pub initial_increment: u32,
}

impl Default for CollectConfig {
    fn default() -> Self {
        let plan = BracketPlan::default();
        Self {
            start_stars: plan.start,
            stop_stars: plan.stop,
            step_stars: plan.step,
            max_stars: plan.max_stars,
            recent_days: DEFAULT_RECENT_DAYS,
            initial_page_size: 1,
            initial_increment: 8,
        }
    }
}

/// Code search defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CodeSearchSettings {
    pub max_pages: u32,
    pub search_strings: Vec<String>,
}

impl Default for CodeSearchSettings {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            search_strings: DEFAULT_SEARCH_STRINGS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/harvester/config.toml)
    /// 3. Local config file (./harvester.toml)
    /// 4. Environment variables with HARVESTER_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("harvester.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./harvester.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., HARVESTER_GITHUB_TOKEN -> github.token
        builder = builder.add_source(
            Environment::with_prefix("HARVESTER")
                .separator("_")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// The GitHub token, from configuration or `GITHUB_TOKEN`.
    pub fn github_token(&self) -> Result<String, ConfigError> {
        resolve_token(
            self.github.token.as_deref(),
            std::env::var(FALLBACK_TOKEN_VAR).ok(),
        )
    }

    /// The bracket plan described by `[collect]`.
    pub fn bracket_plan(&self) -> BracketPlan {
        BracketPlan {
            start: self.collect.start_stars,
            stop: self.collect.stop_stars,
            step: self.collect.step_stars,
            max_stars: self.collect.max_stars,
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "harvester").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Pick the configured token, else the fallback; blank values do not count.
fn resolve_token(
    configured: Option<&str>,
    fallback: Option<String>,
) -> Result<String, ConfigError> {
    configured
        .map(str::to_string)
        .into_iter()
        .chain(fallback)
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
        .ok_or(ConfigError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_cover_every_section() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(
            config.paths.projects,
            PathBuf::from("resources/projects_2025_rpa.csv")
        );
        assert_eq!(config.collect.start_stars, 1000);
        assert_eq!(config.collect.stop_stars, 100);
        assert_eq!(config.collect.step_stars, 200);
        assert_eq!(config.collect.recent_days, 120);
        assert_eq!(config.collect.initial_page_size, 1);
        assert_eq!(config.collect.initial_increment, 8);
        assert_eq!(config.code_search.max_pages, 100);
        assert_eq!(config.code_search.search_strings.len(), DEFAULT_SEARCH_STRINGS.len());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = parse(
            r#"
            [github]
            token = "ghp_test123"

            [collect]
            max_stars = 5000
            recent_days = 30

            [paths]
            projects = "/tmp/stars.csv"
        "#,
        );

        assert_eq!(config.github.token.as_deref(), Some("ghp_test123"));
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.collect.max_stars, Some(5000));
        assert_eq!(config.collect.recent_days, 30);
        assert_eq!(config.collect.start_stars, 1000);
        assert_eq!(config.paths.projects, PathBuf::from("/tmp/stars.csv"));
        assert_eq!(
            config.paths.by_code,
            PathBuf::from("resources/projects_2025_rpa_by_code.csv")
        );
    }

    #[test]
    fn bracket_plan_from_config() {
        let config = parse(
            r#"
            [collect]
            start_stars = 500
            stop_stars = 0
            step_stars = 250
        "#,
        );

        let plan = config.bracket_plan();
        assert_eq!(plan.thresholds(), vec![500, 250]);
        assert_eq!(plan.max_stars, None);
    }

    #[test]
    fn search_strings_can_be_replaced() {
        let config = parse(
            r#"
            [code_search]
            search_strings = ["extension:robot"]
            max_pages = 3
        "#,
        );

        assert_eq!(config.code_search.search_strings, vec!["extension:robot"]);
        assert_eq!(config.code_search.max_pages, 3);
    }

    #[test]
    fn invalid_toml_fails_to_build() {
        let result = ConfigBuilder::builder()
            .add_source(config::File::from_str("[github\ntoken = 1", FileFormat::Toml))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn token_prefers_configured_value() {
        let token = resolve_token(Some("configured"), Some("fallback".to_string())).unwrap();
        assert_eq!(token, "configured");
    }

    #[test]
    fn token_falls_back_when_missing_or_blank() {
        assert_eq!(
            resolve_token(None, Some("fallback".to_string())).unwrap(),
            "fallback"
        );
        assert_eq!(
            resolve_token(Some("  "), Some("fallback".to_string())).unwrap(),
            "fallback"
        );
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = resolve_token(None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }
}
