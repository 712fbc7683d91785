// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;

pub const DEFAULT_QUESTIONS_PER_QUIZ: usize = 10;
pub const MIN_QUESTIONS_PER_QUIZ: usize = 1;
pub const MAX_QUESTIONS_PER_QUIZ: usize = 50;

pub const DEFAULT_QUIZ_TIME_MINUTES: u64 = 15;
pub const MIN_QUIZ_TIME_MINUTES: u64 = 1;
pub const MAX_QUIZ_TIME_MINUTES: u64 = 60;

pub const LEADERBOARD_SIZE: i64 = 10;

const GEMINI_KEY_PLACEHOLDER: &str = "YOUR_GEMINI_API_KEY_HERE";

/// Point values and thresholds used when scoring a quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRules {
    pub points_per_correct: u32,
    pub speed_bonus: u32,
    pub confidence_bonus: u32,
    pub no_hint_bonus: u32,
    /// Average time per answer must stay below this share of the expected time.
    pub speed_ratio: f64,
    /// Share of answers that must be rated high or very high.
    pub confidence_ratio: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            points_per_correct: 10,
            speed_bonus: 20,
            confidence_bonus: 15,
            no_hint_bonus: 10,
            speed_ratio: 0.7,
            confidence_ratio: 0.8,
        }
    }
}

/// Percentage bands for the rule-based feedback, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackBands {
    pub excellent: u32,
    pub very_good: u32,
    pub good: u32,
    pub fair: u32,
}

impl Default for FeedbackBands {
    fn default() -> Self {
        Self {
            excellent: 90,
            very_good: 80,
            good: 70,
            fair: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty() && key != GEMINI_KEY_PLACEHOLDER)
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-pro".to_string(),
            request_timeout: Duration::from_secs(30),
            temperature: 0.7,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub gemini: GeminiConfig,
    pub question_cache_ttl: Duration,
    pub seed_sample_data: bool,
    pub scoring: ScoringRules,
    pub feedback_bands: FeedbackBands,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://smart_quiz.db?mode=rwc".to_string(),
            rust_log: "info".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            gemini: GeminiConfig::default(),
            question_cache_ttl: Duration::from_secs(24 * 60 * 60),
            seed_sample_data: true,
            scoring: ScoringRules::default(),
            feedback_bands: FeedbackBands::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("feedback bands must be descending percentages: {0:?}")]
    InvalidBands(FeedbackBands),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to defaults for
    /// unset or blank keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Lookup(lookup);

        let defaults = Config::default();

        let database_url = vars.read("DATABASE_URL").unwrap_or(defaults.database_url);

        let rust_log = vars.read("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let bind_addr = vars.read("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let gemini = GeminiConfig {
            api_key: vars.raw("GEMINI_API_KEY"),
            base_url: vars.read("GEMINI_BASE_URL").unwrap_or(defaults.gemini.base_url),
            model: vars.read("GEMINI_MODEL").unwrap_or(defaults.gemini.model),
            request_timeout: vars.parse("AI_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.gemini.request_timeout),
            ..defaults.gemini
        };

        let question_cache_ttl = vars.parse("QUESTION_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.question_cache_ttl);

        let seed_sample_data = vars.parse("SEED_SAMPLE_DATA")?.unwrap_or(defaults.seed_sample_data);

        let base = defaults.scoring;
        let scoring = ScoringRules {
            points_per_correct: vars.parse("POINTS_PER_CORRECT")?.unwrap_or(base.points_per_correct),
            speed_bonus: vars.parse("SPEED_BONUS_POINTS")?.unwrap_or(base.speed_bonus),
            confidence_bonus: vars.parse("CONFIDENCE_BONUS_POINTS")?.unwrap_or(base.confidence_bonus),
            no_hint_bonus: vars.parse("NO_HINT_BONUS_POINTS")?.unwrap_or(base.no_hint_bonus),
            speed_ratio: ratio("SPEED_BONUS_RATIO", vars.parse("SPEED_BONUS_RATIO")?)?
                .unwrap_or(base.speed_ratio),
            confidence_ratio: ratio("CONFIDENCE_BONUS_RATIO", vars.parse("CONFIDENCE_BONUS_RATIO")?)?
                .unwrap_or(base.confidence_ratio),
        };

        let bands = defaults.feedback_bands;
        let feedback_bands = FeedbackBands {
            excellent: vars.parse("FEEDBACK_BAND_EXCELLENT")?.unwrap_or(bands.excellent),
            very_good: vars.parse("FEEDBACK_BAND_VERY_GOOD")?.unwrap_or(bands.very_good),
            good: vars.parse("FEEDBACK_BAND_GOOD")?.unwrap_or(bands.good),
            fair: vars.parse("FEEDBACK_BAND_FAIR")?.unwrap_or(bands.fair),
        };
        if !feedback_bands.is_descending() {
            return Err(ConfigError::InvalidBands(feedback_bands));
        }

        Ok(Self {
            database_url,
            rust_log,
            bind_addr,
            gemini,
            question_cache_ttl,
            seed_sample_data,
            scoring,
            feedback_bands,
        })
    }
}

impl FeedbackBands {
    fn is_descending(&self) -> bool {
        self.excellent <= 100
            && self.excellent > self.very_good
            && self.very_good > self.good
            && self.good > self.fair
    }
}

struct Lookup<F>(F);

impl<F: Fn(&str) -> Option<String>> Lookup<F> {
    fn raw(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    /// Trimmed value, with blank treated as unset.
    fn read(&self, key: &str) -> Option<String> {
        self.raw(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, field: &'static str) -> Result<Option<T>, ConfigError> {
        self.read(field)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { field, value })
            })
            .transpose()
    }
}

fn ratio(field: &'static str, value: Option<f64>) -> Result<Option<f64>, ConfigError> {
    match value {
        Some(v) if !(v > 0.0 && v <= 1.0) => Err(ConfigError::InvalidValue {
            field,
            value: v.to_string(),
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_placeholder_key_is_not_configured() {
        let mut gemini = GeminiConfig::default();
        assert!(!gemini.is_configured());

        gemini.api_key = Some(GEMINI_KEY_PLACEHOLDER.to_string());
        assert!(!gemini.is_configured());

        gemini.api_key = Some("   ".to_string());
        assert!(!gemini.is_configured());

        gemini.api_key = Some("abc123".to_string());
        assert!(gemini.is_configured());
    }

    #[test]
    fn test_default_thresholds() {
        let rules = ScoringRules::default();
        assert_eq!(rules.speed_ratio, 0.7);
        assert_eq!(rules.confidence_ratio, 0.8);
        assert_eq!(FeedbackBands::default().excellent, 90);
    }

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.scoring, ScoringRules::default());
        assert_eq!(config.feedback_bands, FeedbackBands::default());
        assert!(config.seed_sample_data);
    }

    #[test]
    fn test_thresholds_read_from_environment() {
        let config = Config::from_lookup(lookup(&[
            ("SPEED_BONUS_RATIO", "0.5"),
            ("NO_HINT_BONUS_POINTS", " 25 "),
            ("FEEDBACK_BAND_EXCELLENT", "95"),
            ("FEEDBACK_BAND_FAIR", "50"),
            ("SEED_SAMPLE_DATA", "false"),
        ]))
        .unwrap();

        assert_eq!(config.scoring.speed_ratio, 0.5);
        assert_eq!(config.scoring.no_hint_bonus, 25);
        assert_eq!(config.scoring.confidence_ratio, 0.8);
        assert_eq!(config.feedback_bands.excellent, 95);
        assert_eq!(config.feedback_bands.very_good, 80);
        assert_eq!(config.feedback_bands.fair, 50);
        assert!(!config.seed_sample_data);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = Config::from_lookup(lookup(&[("QUESTION_CACHE_TTL_SECS", "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "QUESTION_CACHE_TTL_SECS", .. }
        ));

        let err = Config::from_lookup(lookup(&[("SPEED_BONUS_RATIO", "1.5")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "SPEED_BONUS_RATIO", .. }));

        let err = Config::from_lookup(lookup(&[("FEEDBACK_BAND_GOOD", "85")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBands(_)));
    }
}
