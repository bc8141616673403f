//! Process-wide configuration
//!
//! Read once from `DOGE_*` environment variables at startup and immutable
//! afterwards.

use crate::state_machine::PetContext;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PERSONA: &str = "You are Desktop Doge. Answer very briefly \
(at most {word_budget} words) and append one mood tag <mood:HAPPY|LAUGH|WOW|SAD|THINK>.";

pub const DEFAULT_SNIPPET_URL: &str = "https://api.duckduckgo.com/";
pub const DEFAULT_QUOTE_URL: &str = "https://api.coingecko.com/api/v3/coins/markets";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Longest a bubble may stay on screen
const MAX_BUBBLE_SECS: u64 = 3600;
/// Upper bound for the idle timer settings (one day)
const MAX_IDLE_SECS: u64 = 86_400;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected a non-negative integer, got {value:?}")]
    NotANumber { var: &'static str, value: String },
    #[error("{var} must be between {min} and {max}, got {value}")]
    OutOfRange {
        var: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

#[derive(Debug, Clone)]
pub struct PetConfig {
    pub idle_interval: Duration,
    pub idle_first_tick: Duration,
    pub revert_delay: Duration,
    /// Chat bubble lifetime; `None` falls back to `revert_delay`
    pub bubble_duration: Option<Duration>,
    pub word_budget: usize,
    /// May contain a `{word_budget}` placeholder
    pub persona_template: String,
    pub chat_timeout: Duration,
    pub provider_timeout: Duration,
    pub model: String,
    pub chat_url: String,
    pub snippet_url: String,
    pub quote_url: String,
    pub price_cache_ttl: Duration,
    pub max_history: usize,
    pub credential_path: PathBuf,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(600),
            idle_first_tick: Duration::from_secs(2),
            revert_delay: Duration::from_secs(6),
            bubble_duration: None,
            word_budget: 25,
            persona_template: DEFAULT_PERSONA.to_string(),
            chat_timeout: Duration::from_secs(15),
            provider_timeout: Duration::from_secs(5),
            model: DEFAULT_MODEL.to_string(),
            chat_url: crate::llm::DEFAULT_CHAT_URL.to_string(),
            snippet_url: DEFAULT_SNIPPET_URL.to_string(),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            price_cache_ttl: Duration::from_secs(3600),
            max_history: 12,
            credential_path: default_credential_path(),
        }
    }
}

fn default_credential_path() -> PathBuf {
    let home = std::env::var("HOME").map_or_else(|_| PathBuf::from("/tmp"), PathBuf::from);
    home.join(".openai_api_key")
}

impl PetConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |var: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse_u64(var, lookup(var))?.map_or(default, Duration::from_secs))
        };
        let string = |var: &'static str, default: String| -> String {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let bubble_duration =
            parse_u64("DOGE_BUBBLE_DURATION_SECS", lookup("DOGE_BUBBLE_DURATION_SECS"))?
                .map(Duration::from_secs);

        let word_budget = parse_u64("DOGE_WORD_BUDGET", lookup("DOGE_WORD_BUDGET"))?
            .map_or(defaults.word_budget, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let max_history = parse_u64("DOGE_MAX_HISTORY", lookup("DOGE_MAX_HISTORY"))?
            .map_or(defaults.max_history, |n| usize::try_from(n).unwrap_or(usize::MAX));

        let persona_template = match lookup("DOGE_PERSONA") {
            Some(p) if p.trim().is_empty() => {
                return Err(ConfigError::Empty {
                    var: "DOGE_PERSONA",
                })
            }
            Some(p) => p,
            None => defaults.persona_template.clone(),
        };

        let config = Self {
            idle_interval: secs("DOGE_IDLE_INTERVAL_SECS", defaults.idle_interval)?,
            idle_first_tick: secs("DOGE_IDLE_FIRST_TICK_SECS", defaults.idle_first_tick)?,
            revert_delay: secs("DOGE_REVERT_DELAY_SECS", defaults.revert_delay)?,
            bubble_duration,
            word_budget,
            persona_template,
            chat_timeout: secs("DOGE_CHAT_TIMEOUT_SECS", defaults.chat_timeout)?,
            provider_timeout: secs("DOGE_PROVIDER_TIMEOUT_SECS", defaults.provider_timeout)?,
            model: string("DOGE_MODEL", defaults.model.clone()),
            chat_url: string("DOGE_CHAT_URL", defaults.chat_url.clone()),
            snippet_url: string("DOGE_SNIPPET_URL", defaults.snippet_url.clone()),
            quote_url: string("DOGE_QUOTE_URL", defaults.quote_url.clone()),
            price_cache_ttl: secs("DOGE_PRICE_CACHE_SECS", defaults.price_cache_ttl)?,
            max_history,
            credential_path: lookup("DOGE_CREDENTIAL_PATH")
                .filter(|p| !p.trim().is_empty())
                .map_or(defaults.credential_path, PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "DOGE_IDLE_INTERVAL_SECS",
            self.idle_interval.as_secs(),
            1,
            MAX_IDLE_SECS,
        )?;
        check_range(
            "DOGE_IDLE_FIRST_TICK_SECS",
            self.idle_first_tick.as_secs(),
            0,
            MAX_IDLE_SECS,
        )?;
        check_range(
            "DOGE_WORD_BUDGET",
            u64::try_from(self.word_budget).unwrap_or(u64::MAX),
            1,
            u64::MAX,
        )?;
        check_range("DOGE_CHAT_TIMEOUT_SECS", self.chat_timeout.as_secs(), 1, 60)?;
        check_range(
            "DOGE_PROVIDER_TIMEOUT_SECS",
            self.provider_timeout.as_secs(),
            1,
            u64::MAX,
        )?;
        check_range(
            "DOGE_REVERT_DELAY_SECS",
            self.revert_delay.as_secs(),
            1,
            MAX_BUBBLE_SECS,
        )?;
        if let Some(duration) = self.bubble_duration {
            check_range(
                "DOGE_BUBBLE_DURATION_SECS",
                duration.as_secs(),
                1,
                MAX_BUBBLE_SECS,
            )?;
        }
        if self.persona_template.trim().is_empty() {
            return Err(ConfigError::Empty {
                var: "DOGE_PERSONA",
            });
        }
        Ok(())
    }

    /// Persona with the word budget substituted in
    pub fn persona(&self) -> String {
        self.persona_template
            .replace("{word_budget}", &self.word_budget.to_string())
    }

    pub fn effective_bubble_duration(&self) -> Duration {
        self.bubble_duration.unwrap_or(self.revert_delay)
    }

    /// Timings the transition function needs
    pub fn pet_context(&self) -> PetContext {
        PetContext::new(self.effective_bubble_duration(), self.revert_delay)
    }
}

fn parse_u64(var: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::NotANumber { var, value }),
    }
}

fn check_range(var: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            var,
            value,
            min,
            max,
        })
    }
}
