//! Token claims, redacted secrets, and server-side refresh token records.

pub mod claims;
pub mod record;
pub mod secret;
