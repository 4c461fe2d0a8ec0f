use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use timetable_types::WeekParity;
use tracing::warn;

use crate::error::{Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Moscow civil time, the portal's local time.
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 180;

// ── Source format ────────────────────────────────────────────────────────

/// Which export a schedule reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Calendar export: `<base_url>/schedule/<uuid>.ics`
    #[default]
    Ics,
    /// Internal API: `<api_url>/schedule/group/<uuid>`
    Json,
}

// ── Fetch settings ───────────────────────────────────────────────────────

/// Everything the HTTP fetcher needs, handed to it at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub api_url: String,
    pub user_agent: String,
    /// Session cookie copied from a logged-in browser
    pub cookie: Option<String>,
    pub timeout_secs: u64,
    pub format: SourceFormat,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: "https://lks.bmstu.ru".to_string(),
            api_url: "https://lks.bmstu.ru/lks-back/api/v1".to_string(),
            user_agent: USER_AGENT.to_string(),
            cookie: None,
            timeout_secs: 30,
            format: SourceFormat::Ics,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// ── Week parity codes ────────────────────────────────────────────────────

/// Raw week codes the sources use, per parity bucket.
///
/// The portal's "ch"/"zn" codes are read as numerator/denominator; which of
/// those is odd is not documented anywhere, hence a setting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParityCodes {
    pub odd: Vec<String>,
    pub even: Vec<String>,
    pub all: Vec<String>,
}

impl Default for ParityCodes {
    fn default() -> Self {
        let codes = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        ParityCodes {
            odd: codes(&["ch", "odd", "числитель"]),
            even: codes(&["zn", "even", "знаменатель"]),
            all: codes(&["all", ""]),
        }
    }
}

impl ParityCodes {
    /// Map a raw week code to its bucket. Unknown codes are kept verbatim,
    /// except the persisted tags themselves, which always name their own bucket.
    pub fn resolve(&self, raw: &str) -> WeekParity {
        let code = raw.trim().to_lowercase();
        let listed = |list: &[String]| list.iter().any(|c| c.trim().to_lowercase() == code);

        if listed(&self.all) {
            WeekParity::All
        } else if listed(&self.odd) {
            WeekParity::Odd
        } else if listed(&self.even) {
            WeekParity::Even
        } else {
            match WeekParity::from_tag(&code) {
                WeekParity::Other(_) => WeekParity::Other(raw.trim().to_string()),
                reserved => reserved,
            }
        }
    }
}

// ── Top-level config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    /// Upper bound on concurrent source fetches
    pub concurrency: usize,
    /// Fixed offset applied to UTC calendar timestamps
    pub utc_offset_minutes: i32,
    pub parity: ParityCodes,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fetch: FetchConfig::default(),
            concurrency: 10,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            parity: ParityCodes::default(),
        }
    }
}

impl Config {
    /// Load a TOML config file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn utc_offset(&self) -> FixedOffset {
        let seconds = self.utc_offset_minutes.checked_mul(60);
        seconds.and_then(FixedOffset::east_opt).unwrap_or_else(|| {
            warn!(
                minutes = self.utc_offset_minutes,
                "UTC offset out of range, using UTC"
            );
            Utc.fix()
        })
    }

    pub fn fan_out(&self) -> usize {
        self.concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.utc_offset_minutes, 180);
        assert_eq!(config.fetch.format, SourceFormat::Ics);
        assert!(config.fetch.cookie.is_none());
    }

    #[test]
    fn test_partial_file_overrides() {
        let config = Config::from_toml(
            r#"
            concurrency = 4

            [fetch]
            cookie = "session=abc"
            format = "json"
            timeout_secs = 5

            [parity]
            odd = ["zn"]
            even = ["ch"]
            "#,
        )
        .unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.fetch.cookie.as_deref(), Some("session=abc"));
        assert_eq!(config.fetch.format, SourceFormat::Json);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(5));
        assert_eq!(config.fetch.base_url, "https://lks.bmstu.ru");
        assert_eq!(config.parity.resolve("zn"), WeekParity::Odd);
        assert_eq!(config.parity.resolve("ch"), WeekParity::Even);
        // untouched list keeps its default
        assert_eq!(config.parity.resolve("all"), WeekParity::All);
    }

    #[test]
    fn test_default_parity_codes() {
        let codes = ParityCodes::default();
        assert_eq!(codes.resolve("ch"), WeekParity::Odd);
        assert_eq!(codes.resolve(" ZN "), WeekParity::Even);
        assert_eq!(codes.resolve(""), WeekParity::All);
        assert_eq!(codes.resolve("Числитель"), WeekParity::Odd);
        assert_eq!(codes.resolve("3/4"), WeekParity::Other("3/4".into()));
    }

    #[test]
    fn test_utc_offset() {
        let config = Config::default();
        assert_eq!(config.utc_offset().local_minus_utc(), 3 * 3600);

        let broken = Config {
            utc_offset_minutes: 100_000,
            ..Config::default()
        };
        assert_eq!(broken.utc_offset().local_minus_utc(), 0);

        let overflowing = Config {
            utc_offset_minutes: i32::MAX,
            ..Config::default()
        };
        assert_eq!(overflowing.utc_offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_persisted_tags_keep_their_bucket() {
        let codes = ParityCodes {
            odd: vec!["zn".into()],
            even: vec!["ch".into()],
            all: vec!["всегда".into()],
        };
        assert_eq!(codes.resolve("odd"), WeekParity::Odd);
        assert_eq!(codes.resolve("Even"), WeekParity::Even);
        assert_eq!(codes.resolve("all"), WeekParity::All);
        assert_eq!(codes.resolve("Other"), WeekParity::Other("Other".into()));

        for raw in ["odd", "even", "all", "3/4"] {
            let week = codes.resolve(raw);
            let json = serde_json::to_string(&week).unwrap();
            assert_eq!(serde_json::from_str::<WeekParity>(&json).unwrap(), week);
        }
    }

    #[test]
    fn test_fan_out_never_zero() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert_eq!(config.fan_out(), 1);
    }
}
