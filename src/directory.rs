//! Collaborator contracts for user lookup and credential verification.
//!
//! Password hashing and user persistence live outside this crate. [`MemoryDirectory`] exists for
//! tests and demos only.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::SubjectId};

/// Boxed future returned by [`UserDirectory`] operations.
pub type DirectoryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Non-secret user fields returned at login and on the profile endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
	/// Subject identifier.
	pub id: SubjectId,
	/// Account email.
	pub email: String,
	/// Account creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}

/// User lookup and credential verification consumed by the issuer.
pub trait UserDirectory
where
	Self: Send + Sync,
{
	/// Finds the user registered under `email`.
	fn find_user_by_email<'a>(&'a self, email: &'a str) -> DirectoryFuture<'a, Option<UserRecord>>;

	/// Returns `true` if `plaintext` is the secret registered for `email`.
	fn verify_credential<'a>(
		&'a self,
		email: &'a str,
		plaintext: &'a str,
	) -> DirectoryFuture<'a, bool>;
}

/// In-memory directory keyed by email, holding SHA-256 digests of the registered secrets.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory(Arc<RwLock<HashMap<String, (UserRecord, [u8; 32])>>>);
impl MemoryDirectory {
	/// Registers (or replaces) a user. Returns the stored record.
	pub fn register(
		&self,
		id: SubjectId,
		email: impl Into<String>,
		password: &str,
	) -> UserRecord {
		let email = email.into();
		let record = UserRecord { id, email: email.clone(), created_at: OffsetDateTime::now_utc() };

		self.0.write().insert(email, (record.clone(), digest(password)));

		record
	}
}
impl UserDirectory for MemoryDirectory {
	fn find_user_by_email<'a>(&'a self, email: &'a str) -> DirectoryFuture<'a, Option<UserRecord>> {
		Box::pin(async move { Ok(self.0.read().get(email).map(|(record, _)| record.clone())) })
	}

	fn verify_credential<'a>(
		&'a self,
		email: &'a str,
		plaintext: &'a str,
	) -> DirectoryFuture<'a, bool> {
		Box::pin(async move {
			let candidate = digest(plaintext);

			Ok(self.0.read().get(email).is_some_and(|(_, stored)| *stored == candidate))
		})
	}
}

fn digest(plaintext: &str) -> [u8; 32] {
	let mut out = [0_u8; 32];

	out.copy_from_slice(&Sha256::digest(plaintext.as_bytes()));

	out
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn memory_directory_verifies_registered_secrets() {
		let directory = MemoryDirectory::default();

		directory.register(
			SubjectId::new("user-1").expect("Subject fixture should be valid."),
			"a@b.com",
			"Secret1!",
		);

		assert!(directory.verify_credential("a@b.com", "Secret1!").await.expect("Lookup failed."));
		assert!(!directory.verify_credential("a@b.com", "secret1!").await.expect("Lookup failed."));
		assert!(!directory.verify_credential("x@y.com", "Secret1!").await.expect("Lookup failed."));

		let user = directory
			.find_user_by_email("a@b.com")
			.await
			.expect("Lookup failed.")
			.expect("Registered user should be found.");

		assert_eq!(user.id.as_ref(), "user-1");
	}

	#[test]
	fn user_record_serializes_camel_case_rfc3339() {
		let record = UserRecord {
			id: SubjectId::new("user-1").expect("Subject fixture should be valid."),
			email: "a@b.com".into(),
			created_at: time::macros::datetime!(2025-01-01 00:00 UTC),
		};
		let value = serde_json::to_value(&record).expect("User record should serialize.");

		assert_eq!(value["createdAt"], "2025-01-01T00:00:00Z");
		assert_eq!(value["id"], "user-1");
	}
}
