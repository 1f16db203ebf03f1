//! Immutable runtime policy shared by search, detail parsing, and downloads.
//!
//! Every component receives a [`Config`] explicitly instead of reading
//! process-wide globals. [`Config::from_env`] builds one from the same
//! environment variables the container image documents.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Default index base URL used when `AA_BASE_URL` is unset or `auto`.
pub const DEFAULT_BASE_URL: &str = "https://annas-archive.org";

/// Default auxiliary aggregator consulted for bypass-only mirrors.
pub const DEFAULT_AUX_MIRROR_BASE_URL: &str = "https://welib.org";

/// Formats accepted when `SUPPORTED_FORMATS` is unset, in preference order.
pub const DEFAULT_SUPPORTED_FORMATS: [&str; 7] = ["epub", "mobi", "azw3", "fb2", "djvu", "cbz", "cbr"];

/// Default number of countdown retries for slow mirrors.
pub const DEFAULT_COUNTDOWN_RETRIES: u32 = 3;

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;
const DEFAULT_BYPASSER_PATH: &str = "/v1";
const DEFAULT_BYPASSER_TIMEOUT_MS: u64 = 60_000;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A variable was present but could not be parsed.
    #[error("invalid value for {name}: '{value}' ({reason})")]
    InvalidValue {
        /// Variable or field name.
        name: String,
        /// Offending raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &str, value: impl Into<String>, reason: &str) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Read-only policy influencing query construction, candidate ordering, and gating.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the content index, without trailing slash.
    pub base_url: String,
    /// Supported formats in preference order (lower case).
    pub supported_formats: Vec<String>,
    /// Languages applied when a search specifies none.
    pub default_languages: Vec<String>,
    /// Donor credential for the fast-download API.
    pub donor_key: Option<String>,
    /// Whether bypass-capable fetching is available at all.
    pub use_bypass: bool,
    /// Place auxiliary-aggregator mirrors ahead of everything else.
    pub prioritize_aux_mirror: bool,
    /// Whether the auxiliary aggregator may be queried.
    pub allow_aux_mirror: bool,
    /// Base URL of the auxiliary aggregator.
    pub aux_mirror_base_url: String,
    /// Countdown retries per slow mirror before giving up.
    pub countdown_retries: u32,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Proxy for plain HTTP requests.
    pub http_proxy: Option<String>,
    /// Proxy for HTTPS requests.
    pub https_proxy: Option<String>,
    /// Full endpoint of an external bypasser (e.g. `http://flaresolverr:8191/v1`).
    pub bypasser_url: Option<String>,
    /// Timeout handed to the external bypasser, in milliseconds.
    pub bypasser_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            supported_formats: DEFAULT_SUPPORTED_FORMATS
                .iter()
                .map(ToString::to_string)
                .collect(),
            default_languages: vec![DEFAULT_LANGUAGE.to_string()],
            donor_key: None,
            use_bypass: true,
            prioritize_aux_mirror: false,
            allow_aux_mirror: true,
            aux_mirror_base_url: DEFAULT_AUX_MIRROR_BASE_URL.to_string(),
            countdown_retries: DEFAULT_COUNTDOWN_RETRIES,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            http_proxy: None,
            https_proxy: None,
            bypasser_url: None,
            bypasser_timeout_ms: DEFAULT_BYPASSER_TIMEOUT_MS,
        }
    }
}

// The donor key is a credential; never print it.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("supported_formats", &self.supported_formats)
            .field("default_languages", &self.default_languages)
            .field("donor_key", &self.donor_key.as_ref().map(|_| "REDACTED"))
            .field("use_bypass", &self.use_bypass)
            .field("prioritize_aux_mirror", &self.prioritize_aux_mirror)
            .field("allow_aux_mirror", &self.allow_aux_mirror)
            .field("aux_mirror_base_url", &self.aux_mirror_base_url)
            .field("countdown_retries", &self.countdown_retries)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("bypasser_url", &self.bypasser_url)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a numeric variable cannot be parsed or the
    /// resulting configuration fails [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let base_url = match var("AA_BASE_URL") {
            Some(value) if !value.eq_ignore_ascii_case("auto") => {
                value.trim_end_matches('/').to_string()
            }
            _ => defaults.base_url,
        };

        let supported_formats = var("SUPPORTED_FORMATS")
            .map(|value| split_list(&value))
            .unwrap_or(defaults.supported_formats);

        let mut default_languages = var("BOOK_LANGUAGE")
            .map(|value| split_list(&value))
            .unwrap_or_default();
        if default_languages.is_empty() {
            default_languages = defaults.default_languages;
        }

        let bypasser_url = var("EXT_BYPASSER_URL").map(|root| {
            let path = var("EXT_BYPASSER_PATH").unwrap_or_else(|| DEFAULT_BYPASSER_PATH.to_string());
            format!("{}{}", root.trim_end_matches('/'), path)
        });

        let config = Self {
            base_url,
            supported_formats,
            default_languages,
            donor_key: var("AA_DONATOR_KEY"),
            use_bypass: var("USE_CF_BYPASS").map_or(defaults.use_bypass, |v| string_to_bool(&v)),
            prioritize_aux_mirror: var("PRIORITIZE_WELIB")
                .map_or(defaults.prioritize_aux_mirror, |v| string_to_bool(&v)),
            allow_aux_mirror: var("ALLOW_USE_WELIB")
                .map_or(defaults.allow_aux_mirror, |v| string_to_bool(&v)),
            aux_mirror_base_url: var("WELIB_BASE_URL")
                .map_or(defaults.aux_mirror_base_url, |v| v.trim_end_matches('/').to_string()),
            countdown_retries: parse_number(var("MAX_COUNTDOWN_RETRIES"), "MAX_COUNTDOWN_RETRIES")?
                .unwrap_or(defaults.countdown_retries),
            connect_timeout_secs: parse_number(var("CONNECT_TIMEOUT_SECS"), "CONNECT_TIMEOUT_SECS")?
                .unwrap_or(defaults.connect_timeout_secs),
            read_timeout_secs: parse_number(var("READ_TIMEOUT_SECS"), "READ_TIMEOUT_SECS")?
                .unwrap_or(defaults.read_timeout_secs),
            http_proxy: var("HTTP_PROXY"),
            https_proxy: var("HTTPS_PROXY"),
            bypasser_url,
            bypasser_timeout_ms: parse_number(var("EXT_BYPASSER_TIMEOUT"), "EXT_BYPASSER_TIMEOUT")?
                .unwrap_or(defaults.bypasser_timeout_ms),
        };

        config.validate()?;
        debug!(config = ?config, "configuration loaded");
        Ok(config)
    }

    /// Validates values that would otherwise fail much later at request time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparseable base URL, an
    /// empty format list, or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::invalid(
                "base_url",
                &self.base_url,
                "not an absolute URL",
            ));
        }
        if self.supported_formats.is_empty() {
            return Err(ConfigError::invalid(
                "supported_formats",
                "",
                "at least one format is required",
            ));
        }
        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "timeout",
                "0",
                "timeouts must be at least one second",
            ));
        }
        if self.use_bypass && self.bypasser_url.is_none() {
            warn!("bypass-capable fetching enabled without an external bypasser; bypass pages are fetched directly");
        }
        Ok(())
    }

    /// Position of `format` in the preference list, if supported.
    #[must_use]
    pub fn format_rank(&self, format: &str) -> Option<usize> {
        self.supported_formats.iter().position(|f| f == format)
    }

    /// Returns true when `format` is one of the supported formats.
    #[must_use]
    pub fn supports_format(&self, format: &str) -> bool {
        self.format_rank(format).is_some()
    }
}

/// Interprets the usual truthy spellings (`true`, `yes`, `1`, `y`).
#[must_use]
pub fn string_to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "y"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_number<T: std::str::FromStr>(
    value: Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| ConfigError::invalid(name, raw.clone(), "expected a non-negative integer"))
        })
        .transpose()
}
