//! Engine and client configuration.
//!
//! - [`EngineConfig`]: page size, search debounce and count behaviour of a list session
//! - [`ClientConfig`]: endpoint, timeouts and retry policy of the HTTP collection client
//! - [`RetryPolicy`]: exponential backoff parameters for transient transport failures

use std::time::Duration;

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{ConfigSnafu, InvalidUrlSnafu, Result};

/// Default request timeout (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest page a session may request.
const MAX_PAGE_SIZE: usize = 1000;

const fn default_page_size() -> usize {
    tracklist_types::DEFAULT_PAGE_SIZE
}

const fn default_search_debounce() -> Duration {
    Duration::from_millis(400)
}

const fn default_count_enabled() -> bool {
    true
}

/// Configuration of a [`ListSession`](crate::ListSession).
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use tracklist_sdk::EngineConfig;
/// let config = EngineConfig::builder()
///     .page_size(25)
///     .search_debounce(Duration::from_millis(250))
///     .build()
///     .expect("valid engine config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Records requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Quiet period before a search edit triggers a reset.
    #[serde(default = "default_search_debounce", with = "humantime_serde")]
    pub search_debounce: Duration,
    /// Whether a total-count query accompanies every reset.
    #[serde(default = "default_count_enabled")]
    pub count_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            search_debounce: default_search_debounce(),
            count_enabled: default_count_enabled(),
        }
    }
}

#[bon::bon]
impl EngineConfig {
    /// Creates a new engine configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`](crate::SdkError::Config) if the page size is zero or
    /// above 1000, or the debounce period is zero.
    #[builder]
    pub fn new(
        #[builder(default = default_page_size())] page_size: usize,
        #[builder(default = default_search_debounce())] search_debounce: Duration,
        #[builder(default = default_count_enabled())] count_enabled: bool,
    ) -> Result<Self> {
        let config = Self { page_size, search_debounce, count_enabled };
        config.validate()?;
        Ok(config)
    }
}

impl EngineConfig {
    /// Validates an existing configuration (e.g., after deserialization).
    pub fn validate(&self) -> Result<()> {
        ensure!(self.page_size > 0, ConfigSnafu { message: "page_size must be > 0" });
        ensure!(
            self.page_size <= MAX_PAGE_SIZE,
            ConfigSnafu { message: format!("page_size must be <= {MAX_PAGE_SIZE}") }
        );
        ensure!(
            !self.search_debounce.is_zero(),
            ConfigSnafu { message: "search_debounce cannot be zero" }
        );
        Ok(())
    }
}

/// Configuration for the HTTP collection client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the collection service (e.g., `http://localhost:4000`).
    pub(crate) base_url: String,

    /// Collection path appended to the base URL.
    pub(crate) collection: String,

    /// Request timeout.
    pub(crate) timeout: Duration,

    /// Connection establishment timeout.
    pub(crate) connect_timeout: Duration,

    /// Retry policy for transient failures.
    pub(crate) retry_policy: RetryPolicy,
}

impl ClientConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the collection path segment.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the URL of the collection.
    #[must_use]
    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.collection)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    collection: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ClientConfigBuilder {
    /// Sets the base URL of the collection service.
    ///
    /// Must be a valid HTTP(S) URL.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the collection path.
    ///
    /// Default: `trackings`.
    #[must_use]
    pub fn with_collection<S: Into<String>>(mut self, collection: S) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets the request timeout.
    ///
    /// Default: 30 seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection establishment timeout.
    ///
    /// Default: 5 seconds.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy for transient failures.
    ///
    /// Default: [`RetryPolicy::default()`].
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Builds the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No base URL provided, or it is not a valid HTTP(S) URL
    /// - The collection path is empty
    /// - Timeout or connect timeout is zero
    pub fn build(self) -> Result<ClientConfig> {
        let base_url = self
            .base_url
            .ok_or_else(|| ConfigSnafu { message: "base_url is required" }.build())?;
        validate_url(&base_url)?;
        let base_url = base_url.trim_end_matches('/').to_owned();

        let collection = self.collection.unwrap_or_else(|| "trackings".to_owned());
        let collection = collection.trim_matches('/').to_owned();
        ensure!(!collection.is_empty(), ConfigSnafu { message: "collection cannot be empty" });

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        ensure!(!timeout.is_zero(), ConfigSnafu { message: "timeout cannot be zero" });

        let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        ensure!(
            !connect_timeout.is_zero(),
            ConfigSnafu { message: "connect_timeout cannot be zero" }
        );

        Ok(ClientConfig {
            base_url,
            collection,
            timeout,
            connect_timeout,
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including initial attempt).
    pub max_attempts: u32,

    /// Initial backoff duration before first retry.
    pub initial_backoff: Duration,

    /// Maximum backoff duration.
    pub max_backoff: Duration,

    /// Backoff multiplier for exponential increase.
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0) for randomizing backoff.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy builder.
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Default::default() }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<u32>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Sets the maximum number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets the initial backoff duration.
    #[must_use]
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = Some(backoff);
        self
    }

    /// Sets the maximum backoff duration.
    #[must_use]
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = Some(backoff);
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Sets the jitter factor (0.0 to 1.0).
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Builds the retry policy.
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            initial_backoff: self.initial_backoff.unwrap_or(defaults.initial_backoff),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
            jitter: self.jitter.unwrap_or(defaults.jitter).clamp(0.0, 1.0),
        }
    }
}

/// Validates that a URL is well-formed HTTP(S).
fn validate_url(url: &str) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return InvalidUrlSnafu { url, message: "URL must start with http:// or https://" }.fail();
    }

    let rest = url.strip_prefix("http://").or_else(|| url.strip_prefix("https://")).unwrap_or("");

    if rest.trim_matches('/').is_empty() {
        return InvalidUrlSnafu { url, message: "URL must have a host" }.fail();
    }

    if rest.contains(char::is_whitespace) {
        return InvalidUrlSnafu { url, message: "URL cannot contain whitespace" }.fail();
    }

    Ok(())
}

/// Duration serialization using humantime format.
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
