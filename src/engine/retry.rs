//! Retry logic with exponential backoff for failed search requests.
//!
//! Every request failure is retryable: the provider bills per attempt and
//! an exhausted page simply contributes no URLs, so there is nothing to
//! gain from giving up early on a "permanent looking" status. The only
//! classification that matters is whether the server asked us to slow down
//! (HTTP 429), in which case a Retry-After header overrides the backoff
//! delay.
//!
//! With the default policy, backoff delays are 2s, 4s, 8s (plus jitter)
//! before the page is abandoned.

use std::time::{Duration, SystemTime};

use rand::Rng;
use tracing::{debug, instrument};

use crate::search::SearchError;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (2 seconds).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each retry).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Maximum Retry-After value honored (5 minutes) to prevent a hostile or
/// misconfigured header from stalling a worker.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// Classification of search request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Anything that may succeed on retry: network errors, timeouts,
    /// error statuses, undecodable bodies.
    Transient,

    /// Server rate limiting (HTTP 429). Retried with backoff, honoring
    /// the Retry-After header when present.
    RateLimited,
}

/// Decision on whether to retry a failed page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (the initial attempt is 1).
        attempt: u32,
    },

    /// Retries are exhausted; abandon this page.
    GiveUp {
        /// Total attempts made, including the initial one.
        attempts: u32,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * multiplier^(failures - 1), max_delay) + jitter
/// ```
///
/// With defaults, delays are approximately: 2s, 4s, 8s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    max_retries: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each retry (typically 2.0 for doubling).
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    #[must_use]
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Creates a policy with a custom retry count, using defaults for
    /// other settings. Zero retries means a single attempt per page.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Returns the configured retry count.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decides whether to retry after the `failures`-th consecutive
    /// failure of a page (1-indexed).
    #[instrument(skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, failure_type: FailureType, failures: u32) -> RetryDecision {
        if failures > self.max_retries {
            debug!(failures, max = self.max_retries, "retries exhausted");
            return RetryDecision::GiveUp { attempts: failures };
        }

        let delay = self.calculate_delay(failures);

        debug!(
            failures,
            next_attempt = failures + 1,
            delay_ms = delay.as_millis(),
            ?failure_type,
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: failures + 1,
        }
    }

    /// Calculates the delay before the retry following the `failures`-th
    /// failure, with exponential backoff and jitter.
    fn calculate_delay(&self, failures: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);

        // failures is 1-indexed; the first retry waits the base delay
        let exponent = f64::from(failures - 1);
        let delay_ms = base_ms * multiplier.powf(exponent);

        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let capped = Duration::from_millis(capped_ms as u64);

        capped + calculate_jitter()
    }
}

/// Generates random jitter between 0 and [`MAX_JITTER`].
///
/// Jitter prevents thundering herd when several workers hit the same
/// provider failure and retry at the same time.
fn calculate_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    #[allow(clippy::cast_possible_truncation)]
    let jitter_ms = rng.gen_range(0..=MAX_JITTER.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

/// Classifies a search error for retry purposes.
///
/// HTTP 429 is [`FailureType::RateLimited`]; every other failure
/// (network, timeout, other statuses, undecodable body) is
/// [`FailureType::Transient`].
#[must_use]
pub fn classify_error(error: &SearchError) -> FailureType {
    match error {
        SearchError::HttpStatus { status: 429, .. } => FailureType::RateLimited,
        _ => FailureType::Transient,
    }
}

/// Extracts a usable Retry-After delay from a rate-limited error.
///
/// Returns `None` unless the error is an HTTP 429 carrying a parseable
/// Retry-After header.
#[must_use]
pub fn retry_after_delay(error: &SearchError) -> Option<Duration> {
    match error {
        SearchError::HttpStatus {
            status: 429,
            retry_after: Some(header),
            ..
        } => parse_retry_after(header),
        _ => None,
    }
}

/// Parses a Retry-After header value into a bounded duration.
///
/// Supports both forms from RFC 7231: delta-seconds (`"120"`) and an
/// HTTP-date. Values above [`MAX_RETRY_AFTER`] are clamped; dates in the
/// past yield `None`.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    let delay = if let Ok(seconds) = value.parse::<u64>() {
        Duration::from_secs(seconds)
    } else {
        let date = httpdate::parse_http_date(value).ok()?;
        date.duration_since(SystemTime::now()).ok()?
    };

    Some(delay.min(MAX_RETRY_AFTER))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
        assert_eq!(policy.max_delay, Duration::from_secs(32));
        assert!((policy.backoff_multiplier - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_retry_policy_with_max_retries() {
        let policy = RetryPolicy::with_max_retries(5);
        assert_eq!(policy.max_retries(), 5);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_delay_ladder_matches_backoff_base() {
        let policy = RetryPolicy::default();
        // 2s, 4s, 8s, each with up to 500ms jitter on top
        for (failures, expected_secs) in [(1u32, 2u64), (2, 4), (3, 8)] {
            let delay = policy.calculate_delay(failures);
            assert!(delay >= Duration::from_secs(expected_secs));
            assert!(delay <= Duration::from_secs(expected_secs) + MAX_JITTER);
        }
    }

    #[test]
    fn test_delay_respects_max_cap() {
        let policy = RetryPolicy::new(10, Duration::from_secs(2), Duration::from_secs(5), 2.0);
        // 4th retry would be 16s uncapped
        let delay = policy.calculate_delay(4);
        assert!(delay >= Duration::from_secs(5));
        assert!(delay <= Duration::from_secs(5) + MAX_JITTER);
    }

    #[test]
    fn test_should_retry_under_limit() {
        let policy = RetryPolicy::default();
        let decision = policy.should_retry(FailureType::Transient, 1);
        assert!(matches!(decision, RetryDecision::Retry { attempt: 2, .. }));
    }

    #[test]
    fn test_should_retry_gives_up_past_limit() {
        let policy = RetryPolicy::default();
        // 3 retries allowed: the 4th failure exhausts the page
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 3),
            RetryDecision::Retry { attempt: 4, .. }
        ));
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 4),
            RetryDecision::GiveUp { attempts: 4 }
        ));
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let policy = RetryPolicy::with_max_retries(0);
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 1),
            RetryDecision::GiveUp { attempts: 1 }
        ));
    }

    #[test]
    fn test_classify_429_rate_limited() {
        let error = SearchError::http_status("https://serpapi.com/search", 429);
        assert_eq!(classify_error(&error), FailureType::RateLimited);
    }

    #[test]
    fn test_classify_other_failures_transient() {
        for status in [400, 401, 404, 500, 503] {
            let error = SearchError::http_status("https://serpapi.com/search", status);
            assert_eq!(classify_error(&error), FailureType::Transient);
        }
        let error = SearchError::timeout("https://serpapi.com/search");
        assert_eq!(classify_error(&error), FailureType::Transient);
    }

    #[test]
    fn test_retry_after_delay_only_for_429_with_header() {
        let with_header = SearchError::http_status_with_retry_after(
            "https://serpapi.com/search",
            429,
            Some("12".to_string()),
        );
        assert_eq!(
            retry_after_delay(&with_header),
            Some(Duration::from_secs(12))
        );

        let without_header = SearchError::http_status("https://serpapi.com/search", 429);
        assert_eq!(retry_after_delay(&without_header), None);

        let not_rate_limited = SearchError::http_status_with_retry_after(
            "https://serpapi.com/search",
            503,
            Some("12".to_string()),
        );
        assert_eq!(retry_after_delay(&not_rate_limited), None);
    }

    #[test]
    fn test_parse_retry_after_delta_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_retry_after_clamps_excessive_values() {
        assert_eq!(parse_retry_after("999999"), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn test_parse_retry_after_http_date_in_past_is_none() {
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_parse_retry_after_garbage_is_none() {
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_jitter_within_bounds() {
        for _ in 0..100 {
            assert!(calculate_jitter() <= MAX_JITTER);
        }
    }
}
