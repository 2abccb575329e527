//! Durable key-value storage for the client's refresh token.

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// self
use crate::{_prelude::*, store::{StoreError, file}};

/// Synchronous key-value storage that survives process restarts.
pub trait SessionStorage
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`.
	fn load(&self, key: &str) -> Result<Option<String>>;

	/// Writes `value` under `key`, replacing any previous value.
	fn save(&self, key: &str, value: &str) -> Result<()>;

	/// Deletes `key`. Missing keys are not an error.
	fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local storage; nothing survives a restart. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Arc<Mutex<HashMap<String, String>>>);
impl SessionStorage for MemoryStorage {
	fn load(&self, key: &str) -> Result<Option<String>> {
		Ok(self.0.lock().get(key).cloned())
	}

	fn save(&self, key: &str, value: &str) -> Result<()> {
		self.0.lock().insert(key.to_owned(), value.to_owned());

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		self.0.lock().remove(key);

		Ok(())
	}
}

/// JSON object on disk, rewritten atomically after each change.
#[derive(Debug)]
pub struct FileStorage {
	path: PathBuf,
	entries: Mutex<HashMap<String, String>>,
}
impl FileStorage {
	/// Opens (or lazily creates) the storage file at `path`.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		let entries = if path.exists() { read_entries(&path)? } else { HashMap::new() };

		Ok(Self { path, entries: Mutex::new(entries) })
	}

	/// Location of the storage file.
	pub fn path(&self) -> &Path {
		&self.path
	}
}
impl SessionStorage for FileStorage {
	fn load(&self, key: &str) -> Result<Option<String>> {
		Ok(self.entries.lock().get(key).cloned())
	}

	fn save(&self, key: &str, value: &str) -> Result<()> {
		let mut entries = self.entries.lock();
		let previous = entries.clone();

		entries.insert(key.to_owned(), value.to_owned());

		Ok(file::write_atomically(&self.path, &*entries).inspect_err(|_| *entries = previous)?)
	}

	fn remove(&self, key: &str) -> Result<()> {
		let mut entries = self.entries.lock();
		let previous = entries.clone();

		if entries.remove(key).is_some() {
			file::write_atomically(&self.path, &*entries).inspect_err(|_| *entries = previous)?;
		}

		Ok(())
	}
}

fn read_entries(path: &Path) -> Result<HashMap<String, String>> {
	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.is_empty() {
		return Ok(HashMap::new());
	}

	Ok(serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})?)
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	#[test]
	fn file_storage_survives_reopen() {
		let path = env::temp_dir().join(format!(
			"auth_session_file_storage_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		));
		let storage = FileStorage::open(&path).expect("Storage should open.");

		storage.save("refreshToken", "r-1").expect("Save should succeed.");
		drop(storage);

		let reopened = FileStorage::open(&path).expect("Storage should reopen.");

		assert_eq!(reopened.load("refreshToken").expect("Load failed.").as_deref(), Some("r-1"));

		reopened.remove("refreshToken").expect("Remove should succeed.");

		assert_eq!(
			FileStorage::open(&path).expect("Storage should reopen.").load("refreshToken").ok(),
			Some(None)
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary storage file {}: {e}", path.display())
		});
	}
}
