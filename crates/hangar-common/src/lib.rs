//! # Hangar Common
//!
//! Shared types, errors, and constants used across Hangar components.
//!
//! ## Modules
//! - `types` - Wire types (CAPTCHA payloads, rate-limit outcomes, spam reports)
//! - `error` - Common error type
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::GuardError;
pub use types::*;
