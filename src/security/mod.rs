//! SQL guard and rate limiting.

pub mod extractor;
pub mod rate_limiter;
pub mod validator;

pub use extractor::extract;
pub use rate_limiter::{RateLimitStatus, RateLimiter};
pub use validator::{ValidatedStatement, ValidationOutcome, validate};

/// Extract a candidate statement from raw model output and validate it.
pub fn guard(raw: &str) -> ValidationOutcome {
    validate(&extract(raw))
}
