//! Account risk scoring.
//!
//! Additive score in `0..=100`. Missing inputs take their riskiest sensible
//! default: no creation time is a brand-new account and no reputation is
//! zero reputation.

use chrono::{DateTime, Utc};
use hangar_common::RiskSubject;

const SECS_PER_DAY: f64 = 86_400.0;

/// Fraction of the previously persisted score carried into a new one
const MOMENTUM: f64 = 0.3;

/// Risk scorer with a configured list of suspicious IP prefixes
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    suspicious_prefixes: Vec<String>,
}

impl RiskScorer {
    pub fn new(suspicious_prefixes: Vec<String>) -> Self {
        let suspicious_prefixes = suspicious_prefixes
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            suspicious_prefixes,
        }
    }

    /// Score `subject` as of now
    pub fn score(&self, subject: &RiskSubject, ip: Option<&str>) -> u8 {
        self.calculate_risk_score(subject, ip, Utc::now())
    }

    pub fn calculate_risk_score(
        &self,
        subject: &RiskSubject,
        ip: Option<&str>,
        now: DateTime<Utc>,
    ) -> u8 {
        let mut score: u32 = 0;

        let age_days = subject
            .created_at
            .map(|created| (now - created).num_seconds() as f64 / SECS_PER_DAY)
            .unwrap_or(0.0);
        score += if age_days < 1.0 {
            25
        } else if age_days < 7.0 {
            15
        } else if age_days < 30.0 {
            5
        } else {
            0
        };

        if !subject.email_verified {
            score += 30;
        }

        let reputation = subject.reputation.unwrap_or(0);
        if reputation <= 0 {
            score += 20;
        } else if reputation < 10 {
            score += 10;
        }

        if ip.is_some_and(|ip| self.is_suspicious_ip(ip)) {
            score += 15;
        }

        if let Some(prior) = subject.prior_risk_score {
            score += (f64::from(prior) * MOMENTUM).round() as u32;
        }

        score.min(100) as u8
    }

    pub fn is_suspicious_ip(&self, ip: &str) -> bool {
        self.suspicious_prefixes.iter().any(|p| ip.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn veteran() -> RiskSubject {
        RiskSubject {
            created_at: Some(now() - Duration::days(365)),
            email_verified: true,
            reputation: Some(500),
            prior_risk_score: None,
        }
    }

    #[test]
    fn test_established_account_scores_zero() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.calculate_risk_score(&veteran(), Some("10.0.0.1"), now()), 0);
    }

    #[test]
    fn test_age_buckets() {
        let scorer = RiskScorer::default();
        let cases = [(0, 25), (3, 15), (10, 5), (30, 0)];
        for (days, expected) in cases {
            let subject = RiskSubject {
                created_at: Some(now() - Duration::days(days) - Duration::minutes(1)),
                ..veteran()
            };
            assert_eq!(scorer.calculate_risk_score(&subject, None, now()), expected, "{days} days");
        }
    }

    #[test]
    fn test_reputation_buckets_are_exclusive() {
        let scorer = RiskScorer::default();
        let with_rep = |reputation| RiskSubject {
            reputation,
            ..veteran()
        };
        assert_eq!(scorer.calculate_risk_score(&with_rep(Some(-5)), None, now()), 20);
        assert_eq!(scorer.calculate_risk_score(&with_rep(None), None, now()), 20);
        assert_eq!(scorer.calculate_risk_score(&with_rep(Some(5)), None, now()), 10);
        assert_eq!(scorer.calculate_risk_score(&with_rep(Some(10)), None, now()), 0);
    }

    #[test]
    fn test_suspicious_ip_and_momentum() {
        let scorer = RiskScorer::new(vec!["185.220.".into(), "  ".into()]);
        assert_eq!(scorer.calculate_risk_score(&veteran(), Some("185.220.101.4"), now()), 15);
        assert_eq!(scorer.calculate_risk_score(&veteran(), Some("8.8.8.8"), now()), 0);

        let subject = RiskSubject {
            prior_risk_score: Some(45),
            ..veteran()
        };
        // 13.5 rounds up
        assert_eq!(scorer.calculate_risk_score(&subject, None, now()), 14);
    }

    #[test]
    fn test_worst_case_is_clamped() {
        let scorer = RiskScorer::new(vec!["10.".into()]);
        let subject = RiskSubject {
            prior_risk_score: Some(100),
            ..RiskSubject::default()
        };
        // 25 + 30 + 20 + 15 + 30
        assert_eq!(scorer.calculate_risk_score(&subject, Some("10.1.2.3"), now()), 100);
    }

    #[test]
    fn test_missing_fields_default() {
        let subject: RiskSubject = serde_json::from_str("{}").unwrap();
        assert_eq!(RiskScorer::default().score(&subject, None), 75);
    }
}
