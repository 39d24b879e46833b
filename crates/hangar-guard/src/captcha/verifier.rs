//! CAPTCHA verification logic.

use hangar_common::{CaptchaVerdict, GuardError, RejectReason};

use super::{ChallengeStore, Claim, answer_hash, digests_match};

/// CAPTCHA verifier service
#[derive(Debug, Default)]
pub struct CaptchaVerifier;

impl CaptchaVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Verify a CAPTCHA response against the current time
    pub async fn verify(
        &self,
        store: &ChallengeStore,
        challenge_id: &str,
        selected: &str,
    ) -> Result<CaptchaVerdict, GuardError> {
        self.verify_at(store, challenge_id, selected, chrono::Utc::now().timestamp())
            .await
    }

    /// Verify a CAPTCHA response at `now` (unix seconds)
    ///
    /// A live challenge is consumed before the answer is compared, so a wrong
    /// answer burns it just like a correct one. Expired challenges are
    /// rejected without being consumed.
    pub async fn verify_at(
        &self,
        store: &ChallengeStore,
        challenge_id: &str,
        selected: &str,
        now: i64,
    ) -> Result<CaptchaVerdict, GuardError> {
        let challenge = match store.claim(challenge_id, now).await? {
            Claim::NotFound => return Ok(CaptchaVerdict::rejected(RejectReason::NotFound)),
            Claim::AlreadyUsed => {
                tracing::debug!(challenge_id = %challenge_id, "Replayed CAPTCHA challenge");
                return Ok(CaptchaVerdict::rejected(RejectReason::AlreadyUsed));
            }
            Claim::Expired => return Ok(CaptchaVerdict::rejected(RejectReason::Expired)),
            Claim::Claimed(challenge) => challenge,
        };

        if !digests_match(&answer_hash(challenge_id, selected), &challenge.answer_hash) {
            tracing::debug!(
                challenge_id = %challenge_id,
                difficulty = ?challenge.difficulty,
                "CAPTCHA answer incorrect"
            );
            return Ok(CaptchaVerdict::rejected(RejectReason::Incorrect));
        }

        tracing::debug!(challenge_id = %challenge_id, "CAPTCHA verified");
        Ok(CaptchaVerdict::accepted())
    }
}
