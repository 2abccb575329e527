//! Signing secrets, token lifetimes, and rotation policy for the issuer and validator.

// std
use std::env;
// self
use crate::{_prelude::*, auth::TokenKind, error::ConfigError};

/// Environment variable holding the access token signing secret.
pub const ENV_ACCESS_SECRET: &str = "JWT_ACCESS_SECRET";
/// Environment variable holding the access token TTL in seconds.
pub const ENV_ACCESS_EXPIRES_IN: &str = "JWT_ACCESS_EXPIRES_IN";
/// Environment variable holding the refresh token signing secret.
pub const ENV_REFRESH_SECRET: &str = "JWT_REFRESH_SECRET";
/// Environment variable holding the refresh token TTL in seconds.
pub const ENV_REFRESH_EXPIRES_IN: &str = "JWT_REFRESH_EXPIRES_IN";
/// Environment variable toggling lineage revocation on refresh token replay.
pub const ENV_REPLAY_DETECTION: &str = "JWT_REPLAY_DETECTION";

/// Signing secret and lifetime for one token kind.
#[derive(Clone)]
pub struct TokenPolicy {
	/// HMAC secret used to sign and verify tokens of this kind.
	pub secret: Vec<u8>,
	/// Lifetime of freshly minted tokens.
	pub ttl: Duration,
}
impl Debug for TokenPolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPolicy").field("secret", &"<redacted>").field("ttl", &self.ttl).finish()
	}
}

/// Validated issuer/validator configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
	/// Access token policy (default TTL 900 seconds).
	pub access: TokenPolicy,
	/// Refresh token policy (default TTL 604800 seconds).
	pub refresh: TokenPolicy,
	/// Revoke the whole lineage when an already revoked refresh token is presented again.
	pub replay_detection: bool,
}
impl AuthConfig {
	/// Default access token lifetime.
	pub const DEFAULT_ACCESS_TTL: Duration = Duration::seconds(900);
	/// Default refresh token lifetime.
	pub const DEFAULT_REFRESH_TTL: Duration = Duration::seconds(604_800);

	/// Returns a builder seeded with default lifetimes and no secrets.
	pub fn builder() -> AuthConfigBuilder {
		AuthConfigBuilder::default()
	}

	/// Reads the configuration from `JWT_*` environment variables.
	///
	/// Both secrets are required; an unset secret fails with [`ConfigError::EmptySecret`].
	/// Lifetimes and replay detection fall back to their defaults when unset.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
		let mut builder = Self::builder()
			.access_secret(lookup(ENV_ACCESS_SECRET).unwrap_or_default())
			.refresh_secret(lookup(ENV_REFRESH_SECRET).unwrap_or_default());

		if let Some(ttl) = read_seconds(ENV_ACCESS_EXPIRES_IN, lookup(ENV_ACCESS_EXPIRES_IN))? {
			builder = builder.access_ttl(ttl);
		}
		if let Some(ttl) = read_seconds(ENV_REFRESH_EXPIRES_IN, lookup(ENV_REFRESH_EXPIRES_IN))? {
			builder = builder.refresh_ttl(ttl);
		}
		if let Some(raw) = lookup(ENV_REPLAY_DETECTION) {
			let enabled = raw
				.trim()
				.parse::<bool>()
				.map_err(|_| ConfigError::InvalidEnv { name: ENV_REPLAY_DETECTION, value: raw })?;

			builder = builder.replay_detection(enabled);
		}

		builder.build()
	}

	/// Returns the policy for the requested token kind.
	pub fn policy(&self, kind: TokenKind) -> &TokenPolicy {
		match kind {
			TokenKind::Access => &self.access,
			TokenKind::Refresh => &self.refresh,
		}
	}
}

/// Builder for [`AuthConfig`] values.
#[derive(Debug)]
pub struct AuthConfigBuilder {
	access_secret: Vec<u8>,
	access_ttl: Duration,
	refresh_secret: Vec<u8>,
	refresh_ttl: Duration,
	replay_detection: bool,
}
impl Default for AuthConfigBuilder {
	fn default() -> Self {
		Self {
			access_secret: Vec::new(),
			access_ttl: AuthConfig::DEFAULT_ACCESS_TTL,
			refresh_secret: Vec::new(),
			refresh_ttl: AuthConfig::DEFAULT_REFRESH_TTL,
			replay_detection: false,
		}
	}
}
impl AuthConfigBuilder {
	/// Sets the access token signing secret.
	pub fn access_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
		self.access_secret = secret.into();

		self
	}

	/// Sets the access token lifetime.
	pub fn access_ttl(mut self, ttl: Duration) -> Self {
		self.access_ttl = ttl;

		self
	}

	/// Sets the refresh token signing secret.
	pub fn refresh_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
		self.refresh_secret = secret.into();

		self
	}

	/// Sets the refresh token lifetime.
	pub fn refresh_ttl(mut self, ttl: Duration) -> Self {
		self.refresh_ttl = ttl;

		self
	}

	/// Enables or disables lineage revocation on refresh token replay.
	pub fn replay_detection(mut self, enabled: bool) -> Self {
		self.replay_detection = enabled;

		self
	}

	/// Validates the inputs and produces an [`AuthConfig`].
	pub fn build(self) -> Result<AuthConfig, ConfigError> {
		if self.access_secret.is_empty() {
			return Err(ConfigError::EmptySecret { kind: TokenKind::Access.as_str() });
		}
		if self.refresh_secret.is_empty() {
			return Err(ConfigError::EmptySecret { kind: TokenKind::Refresh.as_str() });
		}
		if self.access_secret == self.refresh_secret {
			return Err(ConfigError::SharedSecret);
		}
		if !self.access_ttl.is_positive() {
			return Err(ConfigError::NonPositiveTtl { kind: TokenKind::Access.as_str() });
		}
		if !self.refresh_ttl.is_positive() {
			return Err(ConfigError::NonPositiveTtl { kind: TokenKind::Refresh.as_str() });
		}

		Ok(AuthConfig {
			access: TokenPolicy { secret: self.access_secret, ttl: self.access_ttl },
			refresh: TokenPolicy { secret: self.refresh_secret, ttl: self.refresh_ttl },
			replay_detection: self.replay_detection,
		})
	}
}

fn read_seconds(name: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
	let Some(raw) = raw else {
		return Ok(None);
	};
	let seconds =
		raw.trim().parse::<i64>().map_err(|_| ConfigError::InvalidEnv { name, value: raw })?;

	Ok(Some(Duration::seconds(seconds)))
}
