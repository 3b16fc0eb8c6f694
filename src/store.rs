//! Durable persistence of the signed-in session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::StorageError;
use crate::role::Role;
use crate::types::{Identity, SessionToken};

pub const TOKEN_KEY: &str = "token";
pub const IDENTITY_KEY: &str = "user";
pub const ROLE_SNAPSHOT_KEY: &str = "userRole";

/// Key-value area the session is persisted into.
///
/// Implement this for whatever durable storage the host application has.
pub trait KeyValueStorage: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Storage backed by a single JSON object file.
///
/// Every write rewrites the whole file; a missing file reads as empty and
/// a corrupt one is replaced on the next write.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like `read_all`, but an unparsable file reads as empty so the next
    /// write replaces it.
    fn read_for_write(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.read_all() {
            Err(StorageError::Serde(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Session file is corrupt, overwriting"
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    /// Write to a sibling temp file, then rename it over the target so a
    /// crash never leaves a half-written file behind.
    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_for_write()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        match self.read_all() {
            Ok(mut entries) => {
                if entries.remove(key).is_some() {
                    self.write_all(&entries)?;
                }
            }
            Err(StorageError::Serde(_)) => {
                let entries = self.read_for_write()?;
                self.write_all(&entries)?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

/// A session read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub identity: Identity,
    pub token: SessionToken,
    /// Role recorded at the last identity write; `None` for sessions
    /// written before snapshots existed.
    pub role_snapshot: Option<Role>,
}

/// Why a stored session was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    RoleMismatch { persisted: Role, current: Role },
    Corrupt(String),
    /// Only one of identity and token was present.
    Incomplete,
}

/// Result of [`SessionStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Empty,
    Restored(PersistedSession),
    /// Something is stored but must not be trusted; the caller clears it.
    Invalid(InvalidReason),
}

/// Token/identity/role-snapshot persistence over a [`KeyValueStorage`].
#[derive(Debug)]
pub struct SessionStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> SessionStore<S> {
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Write token, identity and role snapshot.
    ///
    /// There is no partial-write recovery: if a later key fails the earlier
    /// ones stay written, and the caller is expected to [`clear`](Self::clear).
    pub fn save(&self, identity: &Identity, token: &SessionToken) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(identity)?;
        self.storage.set(TOKEN_KEY, token.as_str())?;
        self.storage.set(IDENTITY_KEY, &serialized)?;
        self.storage.set(ROLE_SNAPSHOT_KEY, identity.role.as_str())?;
        Ok(())
    }

    /// Read the stored session, rejecting it if the role snapshot disagrees
    /// with the stored identity.
    pub fn load(&self) -> Result<LoadOutcome, StorageError> {
        let token = self.storage.get(TOKEN_KEY)?;
        let identity = self.storage.get(IDENTITY_KEY)?;

        let (token, identity) = match (token, identity) {
            (None, None) => return Ok(LoadOutcome::Empty),
            (Some(token), Some(identity)) => (token, identity),
            _ => return Ok(LoadOutcome::Invalid(InvalidReason::Incomplete)),
        };

        let identity: Identity = match serde_json::from_str(&identity) {
            Ok(identity) => identity,
            Err(e) => return Ok(LoadOutcome::Invalid(InvalidReason::Corrupt(e.to_string()))),
        };

        let role_snapshot = self.role_snapshot()?;
        if let Some(persisted) = &role_snapshot {
            if *persisted != identity.role {
                return Ok(LoadOutcome::Invalid(InvalidReason::RoleMismatch {
                    persisted: persisted.clone(),
                    current: identity.role,
                }));
            }
        }

        Ok(LoadOutcome::Restored(PersistedSession {
            identity,
            token: SessionToken::new(token),
            role_snapshot,
        }))
    }

    /// Remove every session key. Safe to call when nothing is stored.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(IDENTITY_KEY)?;
        self.storage.remove(ROLE_SNAPSHOT_KEY)?;
        Ok(())
    }

    pub fn role_snapshot(&self) -> Result<Option<Role>, StorageError> {
        Ok(self.storage.get(ROLE_SNAPSHOT_KEY)?.map(Role::from))
    }

    pub fn write_role_snapshot(&self, role: &Role) -> Result<(), StorageError> {
        self.storage.set(ROLE_SNAPSHOT_KEY, role.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher() -> Identity {
        Identity::new("t-1", "t@example.com", Role::Teacher).with_name("Grace", "Hopper")
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = SessionStore::new(MemoryStorage::new());
        let token = SessionToken::new("tok-1");
        store.save(&teacher(), &token).unwrap();

        let LoadOutcome::Restored(session) = store.load().unwrap() else {
            panic!("expected restored session");
        };
        assert_eq!(session.identity, teacher());
        assert_eq!(session.token, token);
        assert_eq!(session.role_snapshot, Some(Role::Teacher));
    }

    #[test]
    fn load_on_empty_storage() {
        let store = SessionStore::new(MemoryStorage::new());
        assert_eq!(store.load().unwrap(), LoadOutcome::Empty);
    }

    #[test]
    fn role_mismatch_is_invalid() {
        let store = SessionStore::new(MemoryStorage::new());
        store.save(&teacher(), &SessionToken::new("tok")).unwrap();
        store.write_role_snapshot(&Role::Student).unwrap();

        assert_eq!(
            store.load().unwrap(),
            LoadOutcome::Invalid(InvalidReason::RoleMismatch {
                persisted: Role::Student,
                current: Role::Teacher,
            })
        );
    }

    #[test]
    fn missing_snapshot_still_restores() {
        let store = SessionStore::new(MemoryStorage::new());
        store.save(&teacher(), &SessionToken::new("tok")).unwrap();
        store.storage().remove(ROLE_SNAPSHOT_KEY).unwrap();

        let LoadOutcome::Restored(session) = store.load().unwrap() else {
            panic!("expected restored session");
        };
        assert_eq!(session.role_snapshot, None);
    }

    #[test]
    fn corrupt_and_incomplete_sessions_are_invalid() {
        let store = SessionStore::new(MemoryStorage::new());
        store.storage().set(TOKEN_KEY, "tok").unwrap();
        assert_eq!(
            store.load().unwrap(),
            LoadOutcome::Invalid(InvalidReason::Incomplete)
        );

        store.storage().set(IDENTITY_KEY, "{not json").unwrap();
        assert!(matches!(
            store.load().unwrap(),
            LoadOutcome::Invalid(InvalidReason::Corrupt(_))
        ));
    }

    #[test]
    fn clear_is_idempotent() {
        let store = SessionStore::new(MemoryStorage::new());
        store.clear().unwrap();
        store.save(&teacher(), &SessionToken::new("tok")).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), LoadOutcome::Empty);
        assert_eq!(store.role_snapshot().unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let path = std::env::temp_dir().join(format!(
            "academy-session-store-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        SessionStore::new(FileStorage::new(&path))
            .save(&teacher(), &SessionToken::new("tok-file"))
            .unwrap();

        let reopened = SessionStore::new(FileStorage::new(&path));
        let LoadOutcome::Restored(session) = reopened.load().unwrap() else {
            panic!("expected restored session");
        };
        assert_eq!(session.token.as_str(), "tok-file");

        reopened.clear().unwrap();
        assert_eq!(reopened.load().unwrap(), LoadOutcome::Empty);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn truncated_file_is_replaced_on_write() {
        let path = std::env::temp_dir().join(format!(
            "academy-session-truncated-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"token": "tok", "user": "#).unwrap();

        let store = SessionStore::new(FileStorage::new(&path));
        assert!(store.load().is_err());

        store.save(&teacher(), &SessionToken::new("tok-new")).unwrap();
        let LoadOutcome::Restored(session) = store.load().unwrap() else {
            panic!("expected restored session");
        };
        assert_eq!(session.identity, teacher());
        assert_eq!(session.token.as_str(), "tok-new");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn truncated_file_can_be_cleared() {
        let path = std::env::temp_dir().join(format!(
            "academy-session-truncated-clear-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"token": "#).unwrap();

        let store = SessionStore::new(FileStorage::new(&path));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), LoadOutcome::Empty);
        let _ = std::fs::remove_file(&path);
    }
}
