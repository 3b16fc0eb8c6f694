use std::collections::BTreeSet;
use std::sync::Arc;

use crate::client::AuthApi;
use crate::types::{Permission, SessionToken};

/// Permission tags held by the current identity. Empty means no elevated
/// permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(Permission::from).collect()
    }
}

/// Fetches the permission set for the signed-in principal.
pub struct PermissionLoader<A> {
    api: Arc<A>,
}

impl<A: AuthApi> PermissionLoader<A> {
    #[must_use]
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// One backend call, no retry. Any failure yields an empty set.
    pub async fn load(&self, token: &SessionToken) -> PermissionSet {
        match self.api.permissions(token).await {
            Ok(permissions) => {
                tracing::debug!(count = permissions.len(), "Permissions loaded");
                permissions.into_iter().collect()
            }
            Err(e) => {
                tracing::warn!(error = ?e, "Permission load failed, continuing without permissions");
                PermissionSet::new()
            }
        }
    }
}
