//! Detection of server-side role changes surviving in a client session.
//!
//! This narrows the window in which a stale client acts on outdated
//! privileges. It is not an authorization check: the backend re-validates
//! every privileged request regardless.

use std::sync::Arc;

use crate::error::StorageError;
use crate::role::Role;
use crate::store::{KeyValueStorage, SessionStore};

/// Outcome of comparing a live role to the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCheck {
    /// No snapshot existed; the current role became the snapshot.
    Adopted,
    Unchanged,
    /// The session must be torn down and the user sent to sign in again.
    Changed { persisted: Role, current: Role },
}

impl RoleCheck {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Compares live roles against the snapshot held by a [`SessionStore`].
pub struct RoleChangeDetector<S> {
    store: Arc<SessionStore<S>>,
}

impl<S: KeyValueStorage> RoleChangeDetector<S> {
    #[must_use]
    pub fn new(store: Arc<SessionStore<S>>) -> Self {
        Self { store }
    }

    /// Check `current` against the stored snapshot, adopting it when no
    /// snapshot exists.
    pub fn verify(&self, current: &Role) -> Result<RoleCheck, StorageError> {
        match self.store.role_snapshot()? {
            None => {
                self.store.write_role_snapshot(current)?;
                tracing::debug!(role = %current, "Adopted role snapshot");
                Ok(RoleCheck::Adopted)
            }
            Some(persisted) if persisted == *current => Ok(RoleCheck::Unchanged),
            Some(persisted) => Ok(RoleCheck::Changed {
                persisted,
                current: current.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;

    fn detector() -> (Arc<SessionStore<MemoryStorage>>, RoleChangeDetector<MemoryStorage>) {
        let store = Arc::new(SessionStore::new(MemoryStorage::new()));
        (store.clone(), RoleChangeDetector::new(store))
    }

    #[test]
    fn first_check_adopts_role() {
        let (store, detector) = detector();
        assert_eq!(detector.verify(&Role::Teacher).unwrap(), RoleCheck::Adopted);
        assert_eq!(store.role_snapshot().unwrap(), Some(Role::Teacher));
        assert_eq!(detector.verify(&Role::Teacher).unwrap(), RoleCheck::Unchanged);
    }

    #[test]
    fn differing_role_is_reported() {
        let (store, detector) = detector();
        store.write_role_snapshot(&Role::Teacher).unwrap();

        let check = detector.verify(&Role::Admin).unwrap();
        assert!(check.is_changed());
        assert_eq!(
            check,
            RoleCheck::Changed {
                persisted: Role::Teacher,
                current: Role::Admin,
            }
        );
        // Detection never rewrites the snapshot.
        assert_eq!(store.role_snapshot().unwrap(), Some(Role::Teacher));
    }

    #[test]
    fn legacy_alias_is_a_distinct_tag() {
        let (store, detector) = detector();
        store.write_role_snapshot(&Role::Member).unwrap();
        assert!(detector.verify(&Role::Student).unwrap().is_changed());
    }
}
