//! Thread-safe in-memory [`RefreshTokenStore`] for single-instance deployments and tests.

// self
use crate::{
	_prelude::*,
	auth::{LineageId, RefreshTokenRecord, SubjectId, TokenHash},
	store::{self, RecordMap, RefreshTokenStore, RotationOutcome, StoreFuture},
};

type StoreMap = Arc<RwLock<RecordMap>>;

/// Thread-safe storage backend that keeps records in-process.
///
/// Every mutation runs under one write guard, which serializes rotations of the same token.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of records currently held, revoked ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no records are held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl RefreshTokenStore for MemoryStore {
	fn add(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { store::add_locked(&mut map.write(), record) })
	}

	fn exists<'a>(&'a self, token: &'a TokenHash) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(store::exists_locked(&self.0.read(), token)) })
	}

	fn fetch<'a>(&'a self, token: &'a TokenHash) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		Box::pin(async move { Ok(self.0.read().get(token).cloned()) })
	}

	fn revoke<'a>(
		&'a self,
		token: &'a TokenHash,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		Box::pin(async move { Ok(store::revoke_locked(&mut self.0.write(), token, instant)) })
	}

	fn revoke_all<'a>(
		&'a self,
		subject: &'a SubjectId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize> {
		Box::pin(async move {
			Ok(store::revoke_where(&mut self.0.write(), instant, |record| {
				&record.subject == subject
			}))
		})
	}

	fn revoke_lineage<'a>(
		&'a self,
		lineage: &'a LineageId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize> {
		Box::pin(async move {
			Ok(store::revoke_where(&mut self.0.write(), instant, |record| {
				&record.lineage == lineage
			}))
		})
	}

	fn rotate_atomic<'a>(
		&'a self,
		old: &'a TokenHash,
		replacement: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RotationOutcome> {
		Box::pin(async move { store::rotate_locked(&mut self.0.write(), old, replacement, instant) })
	}

	fn purge_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move { Ok(store::purge_locked(&mut self.0.write(), now)) })
	}
}
