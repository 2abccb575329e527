//! Secure token secret wrapper that redacts sensitive material, plus the hash used as a store key.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Computes the hash under which the token is tracked server-side.
	pub fn hash(&self) -> TokenHash {
		TokenHash::of(&self.0)
	}

	/// Formats the secret as an `Authorization` header value.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Base64 (URL-safe, no padding) SHA-256 digest of a token string.
///
/// Stores key refresh tokens by this digest so a leaked store snapshot cannot be replayed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenHash(String);
impl TokenHash {
	/// Hashes the provided token string.
	pub fn of(token: &str) -> Self {
		let mut hasher = Sha256::new();

		hasher.update(token.as_bytes());

		Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
	}

	/// Returns the encoded digest.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for TokenHash {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn parse_bearer(header: &str) -> Option<TokenSecret> {
	let (scheme, token) = header.trim().split_once(' ')?;
	let token = token.trim();

	if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
		return None;
	}

	Some(TokenSecret::new(token))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn hash_is_stable_and_hides_the_token() {
		let secret = TokenSecret::new("header.payload.signature");
		let hash = secret.hash();

		assert_eq!(hash, TokenHash::of("header.payload.signature"));
		assert_ne!(hash, TokenHash::of("header.payload.other"));
		assert!(!hash.as_str().contains("payload"));
		// 32 bytes, base64 without padding.
		assert_eq!(hash.as_str().len(), 43);
	}

	#[test]
	fn bearer_parsing_accepts_only_the_bearer_scheme() {
		let token = parse_bearer("Bearer abc.def.ghi").expect("Bearer header should parse.");

		assert_eq!(token.expose(), "abc.def.ghi");
		assert_eq!(token.bearer(), "Bearer abc.def.ghi");
		assert!(parse_bearer("bearer  abc").is_some());
		assert!(parse_bearer("Basic abc").is_none());
		assert!(parse_bearer("Bearer").is_none());
		assert!(parse_bearer("Bearer ").is_none());
	}
}
