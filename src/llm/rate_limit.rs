//! Rate-limit handling shared by the HTTP clients.

use std::time::Duration;

use rand::Rng;
use reqwest::header::HeaderMap;

/// Header carrying the time until the token budget resets (e.g. `6m0s`).
pub(crate) const RESET_TOKENS_HEADER: &str = "x-ratelimit-reset-tokens";

/// Retry behaviour for HTTP 429 responses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Lower bound of the random wait used when no reset hint is known.
    pub jitter_min: Duration,
    /// Upper bound of the random wait.
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            jitter_min: Duration::from_secs(10),
            jitter_max: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// Random wait within the jitter range.
    pub fn jitter(&self) -> Duration {
        if self.jitter_max <= self.jitter_min {
            return self.jitter_min;
        }
        let secs = rand::thread_rng()
            .gen_range(self.jitter_min.as_secs_f64()..self.jitter_max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Parse a Go-style duration as sent in rate-limit headers.
///
/// Accepts `1.5s`, `6m0s`, `250ms`, `1h2m3s` and bare seconds (`12`).
pub fn parse_reset_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(secs) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    let mut total_ms = 0.0f64;
    let mut rest = value;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return None;
        }
        let number: f64 = rest[..num_end].parse().ok()?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "h" => 3_600_000.0,
            "m" => 60_000.0,
            "s" => 1_000.0,
            "ms" => 1.0,
            _ => return None,
        };
        rest = &rest[unit_end..];
        total_ms += number * scale;
    }
    Duration::try_from_secs_f64(total_ms / 1000.0).ok()
}

/// Log every `x-ratelimit-*` header and return the token reset delay, if any.
pub(crate) fn inspect_headers(headers: &HeaderMap) -> Option<Duration> {
    let mut reset = None;
    for (name, value) in headers {
        let name = name.as_str();
        if !name.starts_with("x-ratelimit") {
            continue;
        }
        let Ok(value) = value.to_str() else {
            continue;
        };
        tracing::info!("Rate limit header: {}: {}", name, value);
        if name == RESET_TOKENS_HEADER {
            reset = parse_reset_duration(value).filter(|d| !d.is_zero());
        }
    }
    reset
}
