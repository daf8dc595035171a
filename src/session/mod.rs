//! Sign-in and first-launch flows that sit beside the cart.

/// Login check against an external endpoint.
pub mod login;
/// Onboarding gate driven by the first-launch flag.
pub mod onboarding;
/// Phone number sanitizing and validation.
pub mod phone;
