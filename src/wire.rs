//! JSON bodies and paths of the session HTTP contract, shared by the service and the client.

// self
use crate::{_prelude::*, directory::UserRecord, issuer::TokenPair};

/// Credential exchange endpoint.
pub const LOGIN_PATH: &str = "/auth/login";
/// Refresh token rotation endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh";
/// Lineage revocation endpoint.
pub const LOGOUT_PATH: &str = "/auth/logout";
/// Subject-wide revocation endpoint.
pub const LOGOUT_ALL_PATH: &str = "/auth/logout/all";
/// Caller identity endpoint.
pub const PROFILE_PATH: &str = "/auth/profile";
/// Durable storage key under which clients keep the refresh token.
pub const REFRESH_TOKEN_STORAGE_KEY: &str = "refreshToken";

/// `POST /auth/login` body.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
	/// Account email.
	pub email: String,
	/// Plaintext secret.
	pub password: String,
}
impl Debug for LoginRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// `POST /auth/login` success body.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
	/// Access token.
	pub access_token: String,
	/// Refresh token.
	pub refresh_token: String,
	/// Non-secret user fields.
	pub user: UserRecord,
}

/// `POST /auth/refresh` success body.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
	/// Access token.
	pub access_token: String,
	/// Refresh token.
	pub refresh_token: String,
}
impl From<&TokenPair> for TokenPairResponse {
	fn from(pair: &TokenPair) -> Self {
		Self {
			access_token: pair.access_token.expose().to_owned(),
			refresh_token: pair.refresh_token.expose().to_owned(),
		}
	}
}

/// `POST /auth/logout` success body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
	/// Human-readable confirmation.
	pub message: String,
}

/// `POST /auth/logout/all` success body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutAllResponse {
	/// Human-readable confirmation.
	pub message: String,
	/// Number of refresh tokens revoked.
	pub revoked: usize,
}

/// `GET /auth/profile` success body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
	/// Subject identifier.
	pub id: String,
	/// Subject identifier as carried in the `sub` claim.
	pub sub: String,
	/// Email carried by the token.
	pub email: String,
	/// Account creation instant, when the directory knows the user.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
	pub created_at: Option<OffsetDateTime>,
	/// Issued-at of the presented access token, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry of the presented access token, seconds since the Unix epoch.
	pub exp: i64,
}

/// Error body returned for every non-2xx response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
	/// HTTP status code.
	pub status_code: u16,
	/// Human-readable message.
	pub message: String,
	/// Status reason phrase.
	pub error: String,
}
