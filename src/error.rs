//! Crate-level error types shared across the issuer, validator, stores, and client.

// self
use crate::{_prelude::*, store::StoreError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(#[source] StoreError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, or an unreachable refresh endpoint).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Login rejected. Unknown identities and wrong secrets share this variant and message.
	#[error("Invalid credentials.")]
	InvalidCredential,
	/// Missing, malformed, expired, or revoked token on a protected call.
	#[error("Unauthorized.")]
	Unauthorized,
	/// A refresh token was registered twice.
	#[error("Refresh token is already registered.")]
	Conflict,
	/// Terminal client-side signal raised after a refresh attempt was rejected.
	#[error("Session expired; sign in again.")]
	SessionExpired,
	/// A response body could not be decoded into the expected shape.
	#[error("Response body is malformed.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// The server answered with a status the caller did not expect.
	#[error("Unexpected response status {status}.")]
	UnexpectedStatus {
		/// HTTP status code of the response.
		status: u16,
	},
}
impl Error {
	/// Returns `true` for the error kind the request dispatcher reacts to.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Unauthorized)
	}
}
impl From<StoreError> for Error {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::Conflict => Self::Conflict,
			other => Self::Storage(other),
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A signing secret is empty.
	#[error("The {kind} signing secret cannot be empty.")]
	EmptySecret {
		/// Which secret failed validation.
		kind: &'static str,
	},
	/// Access and refresh tokens must not share a signing secret.
	#[error("Access and refresh tokens must use distinct signing secrets.")]
	SharedSecret,
	/// Token lifetimes must be positive.
	#[error("The {kind} token TTL must be positive.")]
	NonPositiveTtl {
		/// Which TTL failed validation.
		kind: &'static str,
	},
	/// An environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{name}` is invalid: {value}.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Raw value read from the environment.
		value: String,
	},
	/// JWT encoding failed.
	#[error("Unable to sign token.")]
	Signing(#[from] jsonwebtoken::errors::Error),
	/// An outbound request could not be constructed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// The client base URL cannot be joined with an endpoint path.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A request body could not be serialized.
	#[error("Unable to serialize request body.")]
	Serialize(#[from] serde_json::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures. Never treated as an authorization failure.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {path}.")]
	Network {
		/// Endpoint path that failed.
		path: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Refresh endpoint failed for a reason other than rejecting the refresh token.
	#[error("Refresh endpoint is unavailable: {message}.")]
	RefreshUnavailable {
		/// Summary shared with every call that joined the refresh.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(path: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { path: path.into(), source: Box::new(src) }
	}
}
