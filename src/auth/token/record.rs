//! Server-side refresh token records, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{
		LineageId, SubjectId,
		token::{claims::Claims, secret::TokenHash},
	},
};

/// Errors produced by [`RefreshTokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RefreshTokenRecordBuilderError {
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Registry entry for one issued refresh token. The raw token is never stored, only its hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
	/// Hash of the refresh token string; the store key.
	pub token_hash: TokenHash,
	/// Subject the token was issued to.
	pub subject: SubjectId,
	/// Session lineage shared with the tokens it was rotated from.
	pub lineage: LineageId,
	/// Issued-at instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
	/// Revocation instant if the record has been revoked.
	pub revoked_at: Option<OffsetDateTime>,
}
impl RefreshTokenRecord {
	/// Returns a builder for the provided token hash, subject, and lineage.
	pub fn builder(
		token_hash: TokenHash,
		subject: SubjectId,
		lineage: LineageId,
	) -> RefreshTokenRecordBuilder {
		RefreshTokenRecordBuilder::new(token_hash, subject, lineage)
	}

	/// Builds the record matching freshly minted refresh token claims.
	pub fn from_claims(token_hash: TokenHash, claims: &Claims) -> Self {
		Self {
			token_hash,
			subject: claims.sub.clone(),
			lineage: claims.sid.clone(),
			issued_at: claims.issued_at(),
			expires_at: claims.expires_at(),
			revoked_at: None,
		}
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the record has been revoked.
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}

	/// Marks the record as revoked. Keeps the first revocation instant.
	pub fn revoke(&mut self, instant: OffsetDateTime) {
		self.revoked_at.get_or_insert(instant);
	}
}

/// Builder for [`RefreshTokenRecord`].
#[derive(Clone, Debug)]
pub struct RefreshTokenRecordBuilder {
	token_hash: TokenHash,
	subject: SubjectId,
	lineage: LineageId,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl RefreshTokenRecordBuilder {
	fn new(token_hash: TokenHash, subject: SubjectId, lineage: LineageId) -> Self {
		Self { token_hash, subject, lineage, issued_at: None, expires_at: None, expires_in: None }
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`RefreshTokenRecord`].
	pub fn build(self) -> Result<RefreshTokenRecord, RefreshTokenRecordBuilderError> {
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(RefreshTokenRecordBuilderError::MissingExpiry),
		};

		Ok(RefreshTokenRecord {
			token_hash: self.token_hash,
			subject: self.subject,
			lineage: self.lineage,
			issued_at,
			expires_at,
			revoked_at: None,
		})
	}
}
