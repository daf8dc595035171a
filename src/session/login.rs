//! Phone login check.
//!
//! The number is validated locally first; only a well-formed number reaches
//! the [`LoginGateway`]. Every outcome becomes a short [`Notice`] for the user
//! and nothing is retried.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::phone::PhoneNumber;

/// Login failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    /// Input did not contain exactly ten digits.
    #[error("phone number must be exactly 10 digits")]
    InvalidPhone,
    /// The endpoint could not be reached.
    #[error("login request failed: {0}")]
    Transport(String),
    /// The endpoint answered with a failure.
    #[error("login rejected: {0}")]
    Rejected(String),
}

/// Outbound login check.
#[async_trait]
pub trait LoginGateway: Send + Sync {
    /// Asks the endpoint whether `phone` may sign in.
    async fn check(&self, phone: &PhoneNumber) -> Result<(), LoginError>;
}

/// Transient message shown after a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Local validation failed; no request was made.
    InvalidPhone,
    /// The endpoint accepted the number.
    LoginChecked,
    /// The request failed or was rejected.
    LoginFailed,
}

impl Notice {
    /// User-facing text.
    pub fn message(self) -> &'static str {
        match self {
            Notice::InvalidPhone => "Please enter a valid 10-digit number",
            Notice::LoginChecked => "Login check success",
            Notice::LoginFailed => "Login failed",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Validates `raw` and, when well-formed, runs the gateway check once.
#[instrument(name = "session::submit_login", skip(gateway, raw))]
pub async fn submit_login(gateway: &dyn LoginGateway, raw: &str) -> Notice {
    let phone = match PhoneNumber::parse(raw) {
        Ok(phone) => phone,
        Err(_) => return Notice::InvalidPhone,
    };

    match gateway.check(&phone).await {
        Ok(()) => {
            info!("login check succeeded");
            Notice::LoginChecked
        }
        Err(err) => {
            warn!(%err, "login check failed");
            Notice::LoginFailed
        }
    }
}
