//! # Hangar Guard - abuse-defense pipeline
//!
//! Services consumed by the community site's form and API handlers:
//! fixed-window rate limiting, spam and account-risk scoring, and the
//! CAPTCHA challenge lifecycle used to gate registration.
//!
//! ## Architecture
//! ```text
//! Web app → Guard (HTTP) → Redis (shared counters, challenges)
//!                       ↘ in-process stores (single instance)
//! ```

pub mod captcha;
pub mod config;
pub mod ratelimit;
pub mod risk;
pub mod routes;
pub mod spam;
pub mod state;
pub mod sweeper;
