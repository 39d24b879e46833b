//! Common error types for Hangar components.

use thiserror::Error;

/// Faults raised by the abuse-defense services.
///
/// A request that is merely over its limit or a CAPTCHA answer that is wrong
/// is a normal outcome, not one of these.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Redis connection/operation error
    #[error("Redis error: {0}")]
    Redis(String),

    /// CAPTCHA generation error (image compositing, encoding)
    #[error("CAPTCHA error: {0}")]
    Captcha(String),

    /// Backing store returned data we could not interpret
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A store call outlived its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl GuardError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Redis(_) => 503,
            Self::Captcha(_) => 500,
            Self::Store(_) => 500,
            Self::InvalidInput(_) => 400,
            Self::Timeout(_) => 504,
        }
    }
}

impl From<redis::RedisError> for GuardError {
    fn from(err: redis::RedisError) -> Self {
        Self::Redis(err.to_string())
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GuardError::InvalidInput("author".into()).status_code(), 400);
        assert_eq!(GuardError::Captcha("png".into()).status_code(), 500);
        assert_eq!(GuardError::Redis("down".into()).status_code(), 503);
        assert_eq!(GuardError::Timeout("history".into()).status_code(), 504);
    }

    #[test]
    fn test_timeout_message() {
        let err = GuardError::Timeout("content history lookup after 500ms".into());
        assert_eq!(
            err.to_string(),
            "Operation timed out: content history lookup after 500ms"
        );
    }
}
