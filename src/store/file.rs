//! Simple file-backed [`RefreshTokenStore`] for durable single-instance deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{LineageId, RefreshTokenRecord, SubjectId, TokenHash},
	store::{self, RecordMap, RefreshTokenStore, RotationOutcome, StoreError, StoreFuture},
};

/// Persists refresh token records to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<RecordMap>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { load_snapshot(&path)? } else { HashMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn mutate<T>(
		&self,
		op: impl FnOnce(&mut RecordMap) -> Result<T, StoreError>,
		changed: impl FnOnce(&T) -> bool,
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let previous = guard.clone();
		let output = op(&mut guard)?;

		// Memory must never run ahead of the snapshot on disk.
		if changed(&output) {
			persist(&self.path, &guard).inspect_err(|_| *guard = previous)?;
		}

		Ok(output)
	}
}
impl RefreshTokenStore for FileStore {
	fn add(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|map| store::add_locked(map, record), |_| true) })
	}

	fn exists<'a>(&'a self, token: &'a TokenHash) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(store::exists_locked(&self.inner.read(), token)) })
	}

	fn fetch<'a>(&'a self, token: &'a TokenHash) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().get(token).cloned()) })
	}

	fn revoke<'a>(
		&'a self,
		token: &'a TokenHash,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		Box::pin(async move {
			self.mutate(|map| Ok(store::revoke_locked(map, token, instant)), Option::is_some)
		})
	}

	fn revoke_all<'a>(
		&'a self,
		subject: &'a SubjectId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize> {
		Box::pin(async move {
			self.mutate(
				|map| Ok(store::revoke_where(map, instant, |record| &record.subject == subject)),
				|revoked| *revoked > 0,
			)
		})
	}

	fn revoke_lineage<'a>(
		&'a self,
		lineage: &'a LineageId,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, usize> {
		Box::pin(async move {
			self.mutate(
				|map| Ok(store::revoke_where(map, instant, |record| &record.lineage == lineage)),
				|revoked| *revoked > 0,
			)
		})
	}

	fn rotate_atomic<'a>(
		&'a self,
		old: &'a TokenHash,
		replacement: RefreshTokenRecord,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, RotationOutcome> {
		Box::pin(async move {
			self.mutate(
				|map| store::rotate_locked(map, old, replacement, instant),
				|outcome| matches!(outcome, RotationOutcome::Rotated),
			)
		})
	}

	fn purge_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			self.mutate(|map| Ok(store::purge_locked(map, now)), |removed| *removed > 0)
		})
	}
}

fn load_snapshot(path: &Path) -> Result<RecordMap, StoreError> {
	let metadata = path.metadata().map_err(|e| StoreError::Backend {
		message: format!("Failed to inspect {}: {e}", path.display()),
	})?;

	if metadata.len() == 0 {
		return Ok(HashMap::new());
	}

	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;
	let records: Vec<RefreshTokenRecord> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

	Ok(records.into_iter().map(|record| (record.token_hash.clone(), record)).collect())
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

/// Writes `contents` as JSON to a sibling temp file, then renames it over `path`.
pub(crate) fn write_atomically<T>(path: &Path, contents: &T) -> Result<(), StoreError>
where
	T: ?Sized + Serialize,
{
	ensure_parent_exists(path)?;

	let serialized = serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize snapshot: {e}"),
	})?;
	let mut tmp_path = path.to_path_buf();

	tmp_path.set_extension("tmp");

	{
		let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
			message: format!("Failed to create {}: {e}", tmp_path.display()),
		})?;

		file.write_all(&serialized).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", tmp_path.display()),
		})?;
		file.sync_all().map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", tmp_path.display()),
		})?;
	}

	fs::rename(&tmp_path, path).map_err(|e| StoreError::Backend {
		message: format!("Failed to replace {}: {e}", path.display()),
	})
}

fn persist(path: &Path, contents: &RecordMap) -> Result<(), StoreError> {
	let snapshot: Vec<_> = contents.values().collect();

	write_atomically(path, &snapshot)
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path(tag: &str) -> PathBuf {
		let unique = format!(
			"auth_session_file_store_{tag}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_record(token: &str) -> RefreshTokenRecord {
		RefreshTokenRecord::builder(
			TokenHash::of(token),
			SubjectId::new("user-demo").expect("Failed to build subject fixture."),
			LineageId::new("lineage-demo").expect("Failed to build lineage fixture."),
		)
		.expires_in(Duration::days(7))
		.build()
		.expect("Failed to build file-store test record.")
	}

	#[test]
	fn add_and_reload_round_trip() {
		let path = temp_path("reload");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let record = build_record("refresh-a");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.add(record.clone())).expect("Failed to add fixture record.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.fetch(&record.token_hash))
			.expect("Failed to fetch fixture record from file store.")
			.expect("File store lost record after reopen.");

		assert_eq!(fetched, record);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn failed_persist_rolls_back_memory() {
		let path = temp_path("rollback");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let old = build_record("refresh-old");
		let new = build_record("refresh-new");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.add(old.clone())).expect("Failed to add fixture record.");

		// A directory squatting on the temp file path makes every write fail.
		let blocker = path.with_extension("tmp");

		fs::create_dir(&blocker).expect("Failed to create blocking directory.");

		rt.block_on(store.rotate_atomic(&old.token_hash, new.clone(), OffsetDateTime::now_utc()))
			.expect_err("Rotation should fail when the snapshot cannot be written.");

		assert!(rt.block_on(store.exists(&old.token_hash)).expect("Lookup should succeed."));
		assert!(!rt.block_on(store.exists(&new.token_hash)).expect("Lookup should succeed."));

		fs::remove_dir(&blocker).expect("Failed to remove blocking directory.");

		let outcome = rt
			.block_on(store.rotate_atomic(&old.token_hash, new.clone(), OffsetDateTime::now_utc()))
			.expect("Rotation should succeed once the snapshot is writable.");

		assert_eq!(outcome, RotationOutcome::Rotated);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn rotation_survives_reopen() {
		let path = temp_path("rotate");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let old = build_record("refresh-old");
		let new = build_record("refresh-new");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.add(old.clone())).expect("Failed to add fixture record.");

		let outcome = rt
			.block_on(store.rotate_atomic(&old.token_hash, new.clone(), OffsetDateTime::now_utc()))
			.expect("Rotation should succeed.");

		assert_eq!(outcome, RotationOutcome::Rotated);
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert!(!rt.block_on(reopened.exists(&old.token_hash)).expect("Lookup should succeed."));
		assert!(rt.block_on(reopened.exists(&new.token_hash)).expect("Lookup should succeed."));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
