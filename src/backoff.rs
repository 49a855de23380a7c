//! Default backoff strategies for the retry middleware.

use std::time::Duration;

use crate::options::ComputeDelay;

/// Default attempt budget (including the first attempt).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for the default exponential backoff.
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Upper bound on any single backoff delay (5 minutes).
pub const DEFAULT_MAX_DELAY_MS: u64 = 5 * 60 * 1000;

/// Random jitter added on top of the exponential delay.
const MAX_JITTER_MS: u64 = 100;

/// Default delay computation: exponential growth from
/// [`DEFAULT_BASE_DELAY_MS`], capped at [`DEFAULT_MAX_DELAY_MS`], plus up
/// to [`MAX_JITTER_MS`] of random jitter so concurrent callers spread out.
///
/// `attempt` is 1-based: the number of attempts already made when the
/// delay is scheduled.
pub fn jittered_backoff(attempt: u32) -> Duration {
    let base = exponential_delay_ms(attempt, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS);
    let jitter = (fastrand::f64() * MAX_JITTER_MS as f64) as u64;
    Duration::from_millis(base.saturating_add(jitter))
}

/// Builds a `compute_delay` with a custom base and cap, without jitter.
/// Useful when deterministic timing matters more than spreading load.
pub fn exponential_backoff(base: Duration, cap: Duration) -> ComputeDelay {
    let base_ms = base.as_millis() as u64;
    let cap_ms = cap.as_millis() as u64;
    std::sync::Arc::new(move |attempt| {
        Duration::from_millis(exponential_delay_ms(attempt, base_ms, cap_ms))
    })
}

fn exponential_delay_ms(attempt: u32, base_ms: u64, cap_ms: u64) -> u64 {
    // base * 2^(attempt-1), shift clamped so high attempt numbers saturate
    // at the cap instead of overflowing.
    let exp = attempt.saturating_sub(1).min(32);
    let multiplier = 1u64 << exp;
    base_ms.saturating_mul(multiplier).min(cap_ms)
}
