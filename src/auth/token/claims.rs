//! JWT claim set shared by access and refresh tokens.

// self
use crate::{
	_prelude::*,
	auth::{LineageId, SubjectId},
};

/// Distinguishes the two token kinds; each kind has its own signing secret and TTL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
	/// Short-lived, stateless credential presented on protected calls.
	Access,
	/// Long-lived credential tracked server-side and exchanged for a new pair.
	Refresh,
}
impl TokenKind {
	/// Returns a stable label suitable for span fields and error messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::Access => "access",
			TokenKind::Refresh => "refresh",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Signed claim set carried by both token kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// Subject (user) identifier.
	pub sub: SubjectId,
	/// Email of the subject at issuance time.
	pub email: String,
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry, seconds since the Unix epoch.
	pub exp: i64,
	/// Unique token identifier.
	pub jti: String,
	/// Session lineage the token belongs to.
	pub sid: LineageId,
}
impl Claims {
	/// Returns `true` while `instant` is strictly before the expiry.
	pub fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		instant.unix_timestamp() < self.exp
	}

	/// Issued-at as an [`OffsetDateTime`].
	pub fn issued_at(&self) -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(self.iat).unwrap_or(OffsetDateTime::UNIX_EPOCH)
	}

	/// Expiry as an [`OffsetDateTime`].
	pub fn expires_at(&self) -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn claims(exp: OffsetDateTime) -> Claims {
		Claims {
			sub: SubjectId::new("user-1").expect("Subject fixture should be valid."),
			email: "a@b.com".into(),
			iat: (exp - Duration::minutes(15)).unix_timestamp(),
			exp: exp.unix_timestamp(),
			jti: "jti-1".into(),
			sid: LineageId::new("lineage-1").expect("Lineage fixture should be valid."),
		}
	}

	#[test]
	fn liveness_is_strictly_before_expiry() {
		let exp = macros::datetime!(2025-01-01 00:15 UTC);
		let claims = claims(exp);

		assert!(claims.is_live_at(exp - Duration::seconds(1)));
		assert!(!claims.is_live_at(exp));
		assert!(!claims.is_live_at(exp + Duration::seconds(1)));
		assert_eq!(claims.expires_at(), exp);
		assert_eq!(claims.issued_at(), macros::datetime!(2025-01-01 00:00 UTC));
	}

	#[test]
	fn claim_names_match_the_wire_shape() {
		let value = serde_json::to_value(claims(macros::datetime!(2025-01-01 00:15 UTC)))
			.expect("Claims should serialize to JSON.");
		let object = value.as_object().expect("Claims should serialize to a JSON object.");
		let mut keys = object.keys().map(String::as_str).collect::<Vec<_>>();

		keys.sort_unstable();

		assert_eq!(keys, ["email", "exp", "iat", "jti", "sid", "sub"]);
		assert_eq!(object["sub"], "user-1");
	}
}
