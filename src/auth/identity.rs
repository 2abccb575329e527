//! Login credentials and the identity attached to validated calls.

// self
use crate::{
	_prelude::*,
	auth::{Claims, LineageId, SubjectId},
};

/// Email + plaintext secret presented at login. Verified by an external collaborator.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
	/// Account identifier.
	pub email: String,
	/// Plaintext secret; never logged.
	pub password: String,
}
impl Credential {
	/// Creates a credential from an email and plaintext secret.
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Identity recovered from a validated token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Subject (user) identifier.
	pub subject: SubjectId,
	/// Email carried by the token.
	pub email: String,
	/// Session lineage the token belongs to.
	pub lineage: LineageId,
	/// Issued-at instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
impl From<Claims> for Identity {
	fn from(claims: Claims) -> Self {
		let issued_at = claims.issued_at();
		let expires_at = claims.expires_at();

		Self { subject: claims.sub, email: claims.email, lineage: claims.sid, issued_at, expires_at }
	}
}
