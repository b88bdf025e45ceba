//! Application-level configuration loading: game rules, the seed catalog and operation timeout.

use std::{env, fs, io::ErrorKind, ops::RangeInclusive, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CHAT_QUIZ_BACK_CONFIG_PATH";
const DEFAULT_THEMES_COUNT: usize = 3;
const DEFAULT_MIN_SCORE: u8 = 1;
const DEFAULT_MAX_SCORE: u8 = 5;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;

/// Shape of a round grid: how many themes are drawn and which point values exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    /// Number of themes assigned to every round.
    pub themes_count: usize,
    /// Lowest point value of the grid (inclusive).
    pub min_score: u8,
    /// Highest point value of the grid (inclusive).
    pub max_score: u8,
}

impl GameRules {
    /// Every point value of the grid, lowest first.
    pub fn scores(&self) -> RangeInclusive<u8> {
        self.min_score..=self.max_score
    }

    /// Whether `score` is a cell of the grid.
    pub fn accepts_score(&self, score: u8) -> bool {
        self.scores().contains(&score)
    }

    fn is_valid(&self) -> bool {
        self.themes_count > 0 && self.min_score <= self.max_score
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            themes_count: DEFAULT_THEMES_COUNT,
            min_score: DEFAULT_MIN_SCORE,
            max_score: DEFAULT_MAX_SCORE,
        }
    }
}

/// Theme definition used to seed an empty catalog.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogTheme {
    /// Column label of the theme.
    pub title: String,
    /// Questions seeded under the theme.
    #[serde(default)]
    pub questions: Vec<CatalogQuestion>,
}

/// Question definition belonging to a [`CatalogTheme`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogQuestion {
    /// Point value of the question.
    pub score: u8,
    /// Prompt shown to the players.
    pub text: String,
    /// Reference answer.
    pub answer: String,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    rules: GameRules,
    catalog: Vec<CatalogTheme>,
    operation_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        themes = app_config.catalog.len(),
                        themes_count = app_config.rules.themes_count,
                        "loaded quiz configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Build a configuration from explicit values, mainly for embedding and tests.
    pub fn new(rules: GameRules, catalog: Vec<CatalogTheme>, operation_timeout: Duration) -> Self {
        Self {
            rules,
            catalog,
            operation_timeout,
        }
    }

    /// Rules every round follows.
    pub fn rules(&self) -> GameRules {
        self.rules
    }

    /// Catalog used to seed a fresh store.
    pub fn catalog(&self) -> &[CatalogTheme] {
        &self.catalog
    }

    /// Upper bound for a single per-chat mutation.
    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            catalog: default_catalog(),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    rules: Option<RawRules>,
    #[serde(default)]
    catalog: Option<Vec<CatalogTheme>>,
    #[serde(default)]
    operation_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawRules {
    themes_count: Option<usize>,
    min_score: Option<u8>,
    max_score: Option<u8>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = GameRules::default();
        let rules = value
            .rules
            .map(|raw| GameRules {
                themes_count: raw.themes_count.unwrap_or(defaults.themes_count),
                min_score: raw.min_score.unwrap_or(defaults.min_score),
                max_score: raw.max_score.unwrap_or(defaults.max_score),
            })
            .unwrap_or(defaults);
        let rules = if rules.is_valid() {
            rules
        } else {
            warn!(?rules, "invalid game rules in config; using defaults");
            defaults
        };

        Self {
            rules,
            catalog: value.catalog.unwrap_or_else(default_catalog),
            operation_timeout: Duration::from_millis(
                value
                    .operation_timeout_ms
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_OPERATION_TIMEOUT_MS),
            ),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn theme(title: &str, questions: [(&str, &str); 5]) -> CatalogTheme {
    CatalogTheme {
        title: title.to_owned(),
        questions: questions
            .into_iter()
            .zip(DEFAULT_MIN_SCORE..=DEFAULT_MAX_SCORE)
            .map(|((text, answer), score)| CatalogQuestion {
                score,
                text: text.to_owned(),
                answer: answer.to_owned(),
            })
            .collect(),
    }
}

/// Built-in catalog shipped with the binary: one question per grid cell.
fn default_catalog() -> Vec<CatalogTheme> {
    vec![
        theme(
            "Geography",
            [
                ("Capital of France?", "Paris"),
                ("Longest river in Africa?", "Nile"),
                ("Country with the most islands?", "Sweden"),
                ("Capital of Australia?", "Canberra"),
                ("Smallest country by area?", "Vatican City"),
            ],
        ),
        theme(
            "Science",
            [
                ("Chemical symbol for water?", "H2O"),
                ("Planet closest to the Sun?", "Mercury"),
                ("Hardest natural mineral?", "Diamond"),
                ("Unit of electrical resistance?", "Ohm"),
                ("Most abundant gas in Earth's atmosphere?", "Nitrogen"),
            ],
        ),
        theme(
            "History",
            [
                ("First man on the Moon?", "Neil Armstrong"),
                ("Year the Berlin Wall fell?", "1989"),
                ("Ship that sank in 1912 after hitting an iceberg?", "Titanic"),
                ("Empire ruled by Genghis Khan?", "Mongol"),
                ("City destroyed by Vesuvius in 79 AD?", "Pompeii"),
            ],
        ),
        theme(
            "Literature",
            [
                ("Author of Romeo and Juliet?", "Shakespeare"),
                ("Detective living at 221B Baker Street?", "Sherlock Holmes"),
                ("Author of War and Peace?", "Tolstoy"),
                ("Whale hunted by Captain Ahab?", "Moby Dick"),
                ("Language Don Quixote was written in?", "Spanish"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_fills_the_default_grid() {
        let config = AppConfig::default();
        let rules = config.rules();
        assert!(config.catalog().len() >= rules.themes_count);
        for theme in config.catalog() {
            let scores: Vec<u8> = theme.questions.iter().map(|q| q.score).collect();
            assert_eq!(scores, rules.scores().collect::<Vec<_>>());
        }
    }

    #[test]
    fn partial_rules_keep_remaining_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "rules": { "themes_count": 2 }, "operation_timeout_ms": 250 }"#)
                .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.rules().themes_count, 2);
        assert_eq!(config.rules().scores(), 1..=5);
        assert_eq!(config.operation_timeout(), Duration::from_millis(250));
        assert!(!config.catalog().is_empty());
    }

    #[test]
    fn invalid_rules_fall_back_to_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "rules": { "themes_count": 0, "min_score": 4, "max_score": 2 } }"#)
                .unwrap();
        assert_eq!(AppConfig::from(raw).rules(), GameRules::default());
    }

    #[test]
    fn catalog_from_file_replaces_builtin_one() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "catalog": [ { "title": "Music", "questions": [ { "score": 1, "text": "Q", "answer": "A" } ] } ] }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.catalog().len(), 1);
        assert_eq!(config.catalog()[0].title, "Music");
    }
}
