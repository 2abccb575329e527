//! Storage contracts and built-in store implementations for refresh token records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{LineageId, RefreshTokenRecord, SubjectId, TokenHash},
};

/// Boxed future returned by [`RefreshTokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Registry of issued refresh tokens; the source of truth for existence and revocation.
///
/// Implementations must serialize mutations per token hash at minimum so that
/// [`rotate_atomic`](Self::rotate_atomic) has exactly one winner for a given token. The contract
/// is object safe so distributed backends can sit behind `Arc<dyn RefreshTokenStore>`.
pub trait RefreshTokenStore
where
	Self: Send + Sync,
{
	/// Registers a new record, failing with [`StoreError::Conflict`] if the hash already exists.
	fn add(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()>;

	/// Returns `true` if the token is registered and not revoked.
	fn exists<'a>(&'a self, token: &'a TokenHash) -> StoreFuture<'a, bool>;

	/// Fetches the record for the token, if present.
	fn fetch<'a>(&'a self, token: &'a TokenHash) -> StoreFuture<'a, Option<RefreshTokenRecord>>;

	/// Marks a record as revoked at the provided instant, returning the updated record.
	fn revoke<'a>(
		&'a self,
		token: &'a TokenHash,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<RefreshTokenRecord>>;

	/// Revokes every live record issued to the subject. Returns how many were revoked.
	fn revoke_all<'a>(
		&'a self,
		subject: &'a SubjectId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize>;

	/// Revokes every live record in the lineage. Returns how many were revoked.
	fn revoke_lineage<'a>(
		&'a self,
		lineage: &'a LineageId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize>;

	/// Revokes `old` and registers `replacement` as one indivisible step.
	///
	/// Fails with [`StoreError::Conflict`] (leaving `old` untouched) if the replacement hash is
	/// already registered.
	fn rotate_atomic<'a>(
		&'a self,
		old: &'a TokenHash,
		replacement: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RotationOutcome>;

	/// Deletes records whose expiry is at or before `now`. Returns how many were removed.
	fn purge_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize>;
}

/// Result of a [`RefreshTokenStore::rotate_atomic`] attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationOutcome {
	/// The old token was live; it is now revoked and the replacement is registered.
	Rotated,
	/// The old token was already revoked (a concurrent rotation won, or it is being replayed).
	Revoked,
	/// No record matched the old token.
	Missing,
}

/// Error type produced by [`RefreshTokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// The token hash is already registered.
	#[error("Token is already registered.")]
	Conflict,
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// In-process map shared by the built-in backends.
pub(crate) type RecordMap = HashMap<TokenHash, RefreshTokenRecord>;

pub(crate) fn add_locked(
	map: &mut RecordMap,
	record: RefreshTokenRecord,
) -> Result<(), StoreError> {
	if map.contains_key(&record.token_hash) {
		return Err(StoreError::Conflict);
	}

	map.insert(record.token_hash.clone(), record);

	Ok(())
}

pub(crate) fn exists_locked(map: &RecordMap, token: &TokenHash) -> bool {
	map.get(token).is_some_and(|record| !record.is_revoked())
}

pub(crate) fn revoke_locked(
	map: &mut RecordMap,
	token: &TokenHash,
	instant: OffsetDateTime,
) -> Option<RefreshTokenRecord> {
	let record = map.get_mut(token)?;

	record.revoke(instant);

	Some(record.clone())
}

pub(crate) fn revoke_where(
	map: &mut RecordMap,
	instant: OffsetDateTime,
	predicate: impl Fn(&RefreshTokenRecord) -> bool,
) -> usize {
	let mut revoked = 0;

	for record in map.values_mut().filter(|record| !record.is_revoked() && predicate(record)) {
		record.revoke(instant);

		revoked += 1;
	}

	revoked
}

pub(crate) fn rotate_locked(
	map: &mut RecordMap,
	old: &TokenHash,
	replacement: RefreshTokenRecord,
	instant: OffsetDateTime,
) -> Result<RotationOutcome, StoreError> {
	if map.contains_key(&replacement.token_hash) {
		return Err(StoreError::Conflict);
	}

	let outcome = match map.get_mut(old) {
		None => RotationOutcome::Missing,
		Some(record) if record.is_revoked() => RotationOutcome::Revoked,
		Some(record) => {
			record.revoke(instant);

			RotationOutcome::Rotated
		},
	};

	if matches!(outcome, RotationOutcome::Rotated) {
		map.insert(replacement.token_hash.clone(), replacement);
	}

	Ok(outcome)
}

pub(crate) fn purge_locked(map: &mut RecordMap, now: OffsetDateTime) -> usize {
	let before = map.len();

	map.retain(|_, record| !record.is_expired_at(now));

	before - map.len()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record(token: &str, subject: &str, lineage: &str) -> RefreshTokenRecord {
		RefreshTokenRecord::builder(
			TokenHash::of(token),
			SubjectId::new(subject).expect("Subject fixture should be valid."),
			LineageId::new(lineage).expect("Lineage fixture should be valid."),
		)
		.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
		.expires_in(Duration::days(7))
		.build()
		.expect("Record fixture should build.")
	}

	#[test]
	fn rotation_conflict_leaves_old_token_live() {
		let mut map = RecordMap::new();
		let now = macros::datetime!(2025-01-02 00:00 UTC);

		add_locked(&mut map, record("old", "user-1", "l-1")).expect("Seeding should succeed.");
		add_locked(&mut map, record("taken", "user-1", "l-2")).expect("Seeding should succeed.");

		let err = rotate_locked(&mut map, &TokenHash::of("old"), record("taken", "user-1", "l-1"), now)
			.expect_err("Rotating onto an existing hash should conflict.");

		assert_eq!(err, StoreError::Conflict);
		assert!(exists_locked(&map, &TokenHash::of("old")));
	}

	#[test]
	fn revoke_where_skips_already_revoked_records() {
		let mut map = RecordMap::new();
		let now = macros::datetime!(2025-01-02 00:00 UTC);

		add_locked(&mut map, record("a", "user-1", "l-1")).expect("Seeding should succeed.");
		add_locked(&mut map, record("b", "user-1", "l-2")).expect("Seeding should succeed.");
		add_locked(&mut map, record("c", "user-2", "l-3")).expect("Seeding should succeed.");
		revoke_locked(&mut map, &TokenHash::of("a"), now);

		let revoked = revoke_where(&mut map, now, |record| record.subject.as_ref() == "user-1");

		assert_eq!(revoked, 1);
		assert!(exists_locked(&map, &TokenHash::of("c")));
	}

	#[test]
	fn rotation_outcome_can_be_serialized() {
		let payload = serde_json::to_string(&RotationOutcome::Rotated)
			.expect("RotationOutcome should serialize to JSON.");

		assert_eq!(payload, "\"Rotated\"");
	}
}
