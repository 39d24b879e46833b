//! Core types shared across Hangar components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CAPTCHA difficulty levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptchaDifficulty {
    /// 4 tiles on a 2x2 grid, clean background
    Easy,
    /// 6 tiles on a 3x2 grid, light noise
    #[default]
    Medium,
    /// 9 tiles on a 3x3 grid, heavier noise
    Hard,
    /// 12 tiles on a 4x3 grid, dense noise
    Extreme,
}

impl CaptchaDifficulty {
    /// Number of option tiles offered to the user
    pub fn option_count(&self) -> usize {
        match self {
            Self::Easy => 4,
            Self::Medium => 6,
            Self::Hard => 9,
            Self::Extreme => 12,
        }
    }

    /// Tile grid (cols, rows) used when compositing the puzzle image
    pub fn grid_size(&self) -> (u8, u8) {
        match self {
            Self::Easy => (2, 2),
            Self::Medium => (3, 2),
            Self::Hard => (3, 3),
            Self::Extreme => (4, 3),
        }
    }

    /// Number of noise strokes drawn over the tiles
    pub fn noise_strokes(&self) -> u32 {
        match self {
            Self::Easy => 0,
            Self::Medium => 6,
            Self::Hard => 16,
            Self::Extreme => 32,
        }
    }
}

/// A selectable tile in a CAPTCHA puzzle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaOption {
    /// Opaque id the client submits when selecting this tile
    pub id: String,
    /// Tile position in the grid (col, row)
    pub cell: (u8, u8),
}

/// CAPTCHA challenge data sent to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    /// Unique challenge ID
    pub challenge_id: String,

    /// PNG puzzle image as a data URL
    pub image_data: String,

    /// Tiles the user can pick from
    pub options: Vec<CaptchaOption>,

    /// Grid dimensions (cols, rows)
    pub grid_size: (u8, u8),

    /// Instructions for the user
    pub instructions: String,

    /// Challenge expiry timestamp (Unix epoch seconds)
    pub expires_at: i64,
}

/// Why a CAPTCHA verification was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotFound,
    AlreadyUsed,
    Expired,
    Incorrect,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::AlreadyUsed => "already used",
            Self::Expired => "expired",
            Self::Incorrect => "incorrect answer",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CAPTCHA verification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaVerdict {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl CaptchaVerdict {
    pub fn accepted() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

/// Outcome of a fixed-window rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitOutcome {
    /// Whether the request fits in the current window
    pub success: bool,
    /// Requests left in the current window
    pub remaining: u32,
}

impl RateLimitOutcome {
    pub fn allowed(remaining: u32) -> Self {
        Self {
            success: true,
            remaining,
        }
    }

    pub fn denied() -> Self {
        Self {
            success: false,
            remaining: 0,
        }
    }
}

/// Spam probability for a piece of user content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpamReport {
    /// 0.0 (clean) to 1.0 (certain spam)
    pub score: f64,
    /// Human-readable signal descriptions
    pub reasons: Vec<String>,
}

/// Account facts consumed by risk scoring.
///
/// Every field is optional on the wire; absent values are defaulted by the
/// scorer rather than rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskSubject {
    /// Account creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Whether the account's email has been verified
    #[serde(default)]
    pub email_verified: bool,

    /// Community reputation points
    #[serde(default)]
    pub reputation: Option<i64>,

    /// Previously persisted risk score (0-100)
    #[serde(default)]
    pub prior_risk_score: Option<u8>,
}
