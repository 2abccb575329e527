//! HS256 signing and verification for both token kinds.
//!
//! Each [`TokenKind`] gets its own key pair so a refresh token can never pass as an access token
//! (or the reverse). Expiry is checked here against a caller-supplied instant instead of the
//! library clock, which keeps `*_at` validation deterministic.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
// self
use crate::{
	_prelude::*,
	auth::{Claims, LineageId, SubjectId, TokenKind, TokenSecret, id},
	config::AuthConfig,
	error::ConfigError,
};

const JTI_LEN: usize = 32;

struct KindKeys {
	encoding: EncodingKey,
	decoding: DecodingKey,
	ttl: Duration,
}

/// A freshly minted token and the claims it carries.
#[derive(Clone, Debug)]
pub struct MintedToken {
	/// Encoded JWT.
	pub token: TokenSecret,
	/// Claims signed into the token.
	pub claims: Claims,
}

/// Signs and verifies access and refresh tokens.
pub struct TokenSigner {
	access: KindKeys,
	refresh: KindKeys,
	header: Header,
	validation: Validation,
}
impl TokenSigner {
	/// Derives both key pairs from the configuration.
	pub fn new(config: &AuthConfig) -> Self {
		let keys = |kind: TokenKind| {
			let policy = config.policy(kind);

			KindKeys {
				encoding: EncodingKey::from_secret(&policy.secret),
				decoding: DecodingKey::from_secret(&policy.secret),
				ttl: policy.ttl,
			}
		};
		let mut validation = Validation::new(Algorithm::HS256);

		validation.leeway = 0;
		validation.validate_exp = false;
		validation.set_required_spec_claims(&["exp", "iat", "sub"]);

		Self {
			access: keys(TokenKind::Access),
			refresh: keys(TokenKind::Refresh),
			header: Header::new(Algorithm::HS256),
			validation,
		}
	}

	/// Mints a token of the given kind, issued at `now`.
	pub fn mint(
		&self,
		kind: TokenKind,
		subject: &SubjectId,
		email: &str,
		lineage: &LineageId,
		now: OffsetDateTime,
	) -> Result<MintedToken> {
		let keys = self.keys(kind);
		let claims = Claims {
			sub: subject.clone(),
			email: email.to_owned(),
			iat: now.unix_timestamp(),
			exp: (now + keys.ttl).unix_timestamp(),
			jti: id::random_string(JTI_LEN),
			sid: lineage.clone(),
		};
		let token = jsonwebtoken::encode(&self.header, &claims, &keys.encoding)
			.map_err(ConfigError::from)?;

		Ok(MintedToken { token: TokenSecret::new(token), claims })
	}

	/// Verifies the signature of a token of the given kind and checks `now < exp`.
	///
	/// Every failure (malformed, wrong key, expired) surfaces as [`Error::Unauthorized`].
	pub fn verify(&self, kind: TokenKind, token: &str, now: OffsetDateTime) -> Result<Claims> {
		let data =
			jsonwebtoken::decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
				.map_err(|_| Error::Unauthorized)?;

		if !data.claims.is_live_at(now) {
			return Err(Error::Unauthorized);
		}

		Ok(data.claims)
	}

	fn keys(&self, kind: TokenKind) -> &KindKeys {
		match kind {
			TokenKind::Access => &self.access,
			TokenKind::Refresh => &self.refresh,
		}
	}
}
impl Debug for TokenSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSigner")
			.field("access_ttl", &self.access.ttl)
			.field("refresh_ttl", &self.refresh.ttl)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn signer() -> TokenSigner {
		let config = AuthConfig::builder()
			.access_secret("access-secret")
			.refresh_secret("refresh-secret")
			.build()
			.expect("Signer config should build.");

		TokenSigner::new(&config)
	}

	fn subject() -> (SubjectId, LineageId) {
		(
			SubjectId::new("user-1").expect("Subject fixture should be valid."),
			LineageId::new("lineage-1").expect("Lineage fixture should be valid."),
		)
	}

	#[test]
	fn minted_tokens_verify_until_expiry() {
		let signer = signer();
		let (subject, lineage) = subject();
		let now = OffsetDateTime::now_utc();
		let minted = signer
			.mint(TokenKind::Access, &subject, "a@b.com", &lineage, now)
			.expect("Minting should succeed.");
		let claims = signer
			.verify(TokenKind::Access, minted.token.expose(), now)
			.expect("Fresh token should verify.");

		assert_eq!(claims, minted.claims);
		assert_eq!(claims.exp - claims.iat, 900);

		let expired_at = now + Duration::seconds(900);
		let err = signer
			.verify(TokenKind::Access, minted.token.expose(), expired_at)
			.expect_err("Token should be rejected at its expiry instant.");

		assert!(matches!(err, Error::Unauthorized));
	}

	#[test]
	fn kinds_do_not_verify_with_each_other() {
		let signer = signer();
		let (subject, lineage) = subject();
		let now = OffsetDateTime::now_utc();
		let refresh = signer
			.mint(TokenKind::Refresh, &subject, "a@b.com", &lineage, now)
			.expect("Minting should succeed.");

		assert!(signer.verify(TokenKind::Refresh, refresh.token.expose(), now).is_ok());
		assert!(matches!(
			signer.verify(TokenKind::Access, refresh.token.expose(), now),
			Err(Error::Unauthorized)
		));
	}

	#[test]
	fn consecutive_mints_are_unique() {
		let signer = signer();
		let (subject, lineage) = subject();
		let now = OffsetDateTime::now_utc();
		let first = signer
			.mint(TokenKind::Refresh, &subject, "a@b.com", &lineage, now)
			.expect("Minting should succeed.");
		let second = signer
			.mint(TokenKind::Refresh, &subject, "a@b.com", &lineage, now)
			.expect("Minting should succeed.");

		assert_ne!(first.token, second.token);
	}

	#[test]
	fn malformed_and_tampered_tokens_are_unauthorized() {
		let signer = signer();
		let (subject, lineage) = subject();
		let now = OffsetDateTime::now_utc();
		let minted = signer
			.mint(TokenKind::Access, &subject, "a@b.com", &lineage, now)
			.expect("Minting should succeed.");
		let mut tampered = minted.token.expose().to_owned();

		tampered.push('x');

		assert!(matches!(
			signer.verify(TokenKind::Access, "not-a-jwt", now),
			Err(Error::Unauthorized)
		));
		assert!(matches!(
			signer.verify(TokenKind::Access, &tampered, now),
			Err(Error::Unauthorized)
		));
	}
}
