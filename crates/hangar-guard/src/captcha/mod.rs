//! CAPTCHA generation and verification.
//!
//! A challenge is a shape-matching puzzle: the user picks the tile that
//! shows the prompt shape. Only a salted hash of the correct tile id is
//! stored. Every verification attempt consumes the challenge, right or
//! wrong, and expired challenges never validate.

mod generator;
mod store;
mod verifier;

pub use generator::CaptchaGenerator;
pub use store::{Claim, ChallengeStore, MemoryChallengeStore, RedisChallengeStore};
pub use verifier::CaptchaVerifier;

use hangar_common::CaptchaDifficulty;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stored challenge data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChallenge {
    /// Challenge ID
    pub id: String,
    /// Hex SHA-256 of `"{id}:{answer}"`
    pub answer_hash: String,
    /// Difficulty level
    pub difficulty: CaptchaDifficulty,
    /// Creation timestamp
    pub created_at: i64,
    /// Expiry timestamp
    pub expires_at: i64,
    /// When a verification attempt consumed this challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<i64>,
}

impl StoredChallenge {
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Salted answer digest; the challenge id is the salt
pub fn answer_hash(challenge_id: &str, answer: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(challenge_id.as_bytes());
    hasher.update(b":");
    hasher.update(answer.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare two digests without short-circuiting on the first mismatch
fn digests_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}
