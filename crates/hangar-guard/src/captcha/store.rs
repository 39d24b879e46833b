//! Challenge persistence.
//!
//! `claim` is the single-use gate: it atomically flips a challenge from
//! unused to used and reports what it found, so two concurrent submissions
//! for one challenge can never both see it unused. Expired challenges are
//! reported without being consumed, so a late retry keeps reporting expiry
//! rather than replay.

use hangar_common::GuardError;
use hangar_common::constants::CAPTCHA_GRACE_SECS;
use hangar_common::constants::redis_keys::{CAPTCHA_PREFIX, CAPTCHA_USED_PREFIX};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::StoredChallenge;

/// Result of trying to consume a challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    NotFound,
    AlreadyUsed,
    /// Past its expiry and never used; left untouched
    Expired,
    /// This attempt consumed the challenge
    Claimed(StoredChallenge),
}

/// Challenge storage with a backend chosen at startup
pub enum ChallengeStore {
    Memory(MemoryChallengeStore),
    Redis(RedisChallengeStore),
}

impl ChallengeStore {
    pub async fn insert(&self, challenge: &StoredChallenge) -> Result<(), GuardError> {
        match self {
            Self::Memory(store) => {
                store.insert(challenge.clone());
                Ok(())
            }
            Self::Redis(store) => store.insert(challenge).await,
        }
    }

    pub async fn claim(&self, challenge_id: &str, now: i64) -> Result<Claim, GuardError> {
        match self {
            Self::Memory(store) => Ok(store.claim(challenge_id, now)),
            Self::Redis(store) => store.claim(challenge_id, now).await,
        }
    }

    /// Drop challenges past their expiry grace period
    pub fn sweep(&self, now: i64) -> usize {
        match self {
            Self::Memory(store) => store.sweep(now),
            // Redis rows carry a TTL
            Self::Redis(_) => 0,
        }
    }
}

/// Process-local challenge map
#[derive(Default)]
pub struct MemoryChallengeStore {
    challenges: Mutex<HashMap<String, StoredChallenge>>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, challenge: StoredChallenge) {
        self.challenges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(challenge.id.clone(), challenge);
    }

    pub fn claim(&self, challenge_id: &str, now: i64) -> Claim {
        let mut challenges = self.challenges.lock().unwrap_or_else(PoisonError::into_inner);
        match challenges.get_mut(challenge_id) {
            None => Claim::NotFound,
            Some(c) if c.used_at.is_some() => Claim::AlreadyUsed,
            Some(c) if c.is_expired(now) => Claim::Expired,
            Some(c) => {
                c.used_at = Some(now);
                Claim::Claimed(c.clone())
            }
        }
    }

    pub fn sweep(&self, now: i64) -> usize {
        let mut challenges = self.challenges.lock().unwrap_or_else(PoisonError::into_inner);
        let before = challenges.len();
        let grace = CAPTCHA_GRACE_SECS as i64;
        challenges.retain(|_, c| now <= c.expires_at + grace);
        before - challenges.len()
    }

    pub fn len(&self) -> usize {
        self.challenges.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Redis challenge rows: `captcha:{id}` holds the JSON challenge and
/// `captcha:used:{id}` is the consumption marker, claimed with `SET NX`
pub struct RedisChallengeStore {
    redis: ConnectionManager,
}

impl RedisChallengeStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn ttl(challenge: &StoredChallenge) -> u64 {
        let remaining = (challenge.expires_at - challenge.created_at).max(1) as u64;
        remaining + CAPTCHA_GRACE_SECS
    }

    pub async fn insert(&self, challenge: &StoredChallenge) -> Result<(), GuardError> {
        let mut conn = self.redis.clone();
        let key = format!("{CAPTCHA_PREFIX}{}", challenge.id);
        let value = serde_json::to_string(challenge)?;

        conn.set_ex::<_, _, ()>(&key, &value, Self::ttl(challenge))
            .await?;
        Ok(())
    }

    pub async fn claim(&self, challenge_id: &str, now: i64) -> Result<Claim, GuardError> {
        let mut conn = self.redis.clone();
        let key = format!("{CAPTCHA_PREFIX}{challenge_id}");

        let stored: Option<String> = conn.get(&key).await?;
        let Some(stored) = stored else {
            return Ok(Claim::NotFound);
        };
        let mut challenge: StoredChallenge = serde_json::from_str(&stored)?;

        let used_key = format!("{CAPTCHA_USED_PREFIX}{challenge_id}");
        if challenge.is_expired(now) {
            let used: bool = conn.exists(&used_key).await?;
            return Ok(if used { Claim::AlreadyUsed } else { Claim::Expired });
        }

        let claimed: Option<String> = redis::cmd("SET")
            .arg(&used_key)
            .arg(now)
            .arg("NX")
            .arg("EX")
            .arg(Self::ttl(&challenge))
            .query_async(&mut conn)
            .await?;

        if claimed.is_none() {
            return Ok(Claim::AlreadyUsed);
        }

        challenge.used_at = Some(now);
        Ok(Claim::Claimed(challenge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangar_common::CaptchaDifficulty;

    fn challenge(id: &str, expires_at: i64) -> StoredChallenge {
        StoredChallenge {
            id: id.to_string(),
            answer_hash: "00".to_string(),
            difficulty: CaptchaDifficulty::Easy,
            created_at: 0,
            expires_at,
            used_at: None,
        }
    }

    #[test]
    fn test_claim_is_single_use() {
        let store = MemoryChallengeStore::new();
        store.insert(challenge("c1", 100));

        match store.claim("c1", 10) {
            Claim::Claimed(c) => assert_eq!(c.used_at, Some(10)),
            other => panic!("unexpected claim: {other:?}"),
        }
        assert_eq!(store.claim("c1", 11), Claim::AlreadyUsed);
        assert_eq!(store.claim("nope", 11), Claim::NotFound);
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let store = std::sync::Arc::new(MemoryChallengeStore::new());
        store.insert(challenge("race", 100));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.claim("race", i))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|c| matches!(c, Claim::Claimed(_)))
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_sweep_keeps_grace_period() {
        let store = MemoryChallengeStore::new();
        store.insert(challenge("old", 100));
        store.insert(challenge("fresh", 1_000));

        assert_eq!(store.sweep(100 + CAPTCHA_GRACE_SECS as i64), 0);
        assert_eq!(store.sweep(101 + CAPTCHA_GRACE_SECS as i64), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expired_claim_does_not_consume() {
        let store = MemoryChallengeStore::new();
        store.insert(challenge("late", 100));

        assert_eq!(store.claim("late", 101), Claim::Expired);
        assert_eq!(store.claim("late", 102), Claim::Expired);
        assert_eq!(store.sweep(102), 0);
    }

    #[test]
    fn test_used_challenge_stays_used_after_expiry() {
        let store = MemoryChallengeStore::new();
        store.insert(challenge("c", 100));

        assert!(matches!(store.claim("c", 100), Claim::Claimed(_)));
        assert_eq!(store.claim("c", 500), Claim::AlreadyUsed);
    }

    #[tokio::test]
    async fn test_store_enum_dispatch() {
        let store = ChallengeStore::Memory(MemoryChallengeStore::new());
        store.insert(&challenge("c", 50)).await.unwrap();
        assert!(matches!(store.claim("c", 1).await.unwrap(), Claim::Claimed(_)));
        assert_eq!(store.claim("c", 2).await.unwrap(), Claim::AlreadyUsed);
    }
}
