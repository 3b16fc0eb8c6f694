//! Client-side route gating.
//!
//! [`RouteRules::can_access`] drives UI-level redirects only. It is not a
//! security boundary: the backend authorizes every request on its own.

use crate::role::Role;
use crate::types::Identity;

pub const ADMIN_PREFIX: &str = "/admin";
pub const TEACHER_PREFIX: &str = "/teacher";
pub const STUDENT_PREFIX: &str = "/student";

pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
pub const TEACHER_DASHBOARD: &str = "/teacher/dashboard";
pub const STUDENT_DASHBOARD: &str = "/student/dashboard";

/// Routes open to every signed-in role.
pub const DEFAULT_SHARED_ROUTES: &[&str] = &[
    "/dashboard",
    "/ai-assistant",
    "/forums",
    "/community",
    "/leaderboards",
    "/resources",
    "/help",
];

/// Pre-split routes; allowed here so the router can redirect them.
pub const DEFAULT_LEGACY_ROUTES: &[&str] = &[
    "/courses",
    "/catalog",
    "/progress",
    "/achievements",
    "/record",
    "/students",
    "/analytics",
];

/// Route-access rules: fixed role prefixes plus configurable shared and
/// legacy route lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRules {
    shared: Vec<String>,
    legacy: Vec<String>,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            shared: DEFAULT_SHARED_ROUTES.iter().map(|r| (*r).to_owned()).collect(),
            legacy: DEFAULT_LEGACY_ROUTES.iter().map(|r| (*r).to_owned()).collect(),
        }
    }
}

impl RouteRules {
    /// Replace the shared route list.
    #[must_use]
    pub fn with_shared_routes(mut self, routes: Vec<String>) -> Self {
        self.shared = routes;
        self
    }

    /// Replace the legacy route list.
    #[must_use]
    pub fn with_legacy_routes(mut self, routes: Vec<String>) -> Self {
        self.legacy = routes;
        self
    }

    #[must_use]
    pub fn shared_routes(&self) -> &[String] {
        &self.shared
    }

    #[must_use]
    pub fn legacy_routes(&self) -> &[String] {
        &self.legacy
    }

    /// Decide whether `identity` may view `path`. First matching rule wins.
    #[must_use]
    pub fn can_access(&self, identity: Option<&Identity>, path: &str) -> bool {
        let Some(identity) = identity else {
            return false;
        };
        let path = normalize_path(path);

        if is_under(path, ADMIN_PREFIX) {
            return identity.role == Role::TOP;
        }
        if is_under(path, TEACHER_PREFIX) {
            return identity.role.is_at_least(&Role::Teacher);
        }
        if is_under(path, STUDENT_PREFIX) {
            return true;
        }

        self.shared
            .iter()
            .chain(self.legacy.iter())
            .any(|route| is_under(path, route))
    }
}

/// Canonical landing route for `role`.
#[must_use]
pub fn dashboard_for(role: &Role) -> &'static str {
    if *role == Role::TOP {
        ADMIN_DASHBOARD
    } else if role.is_at_least(&Role::Teacher) {
        TEACHER_DASHBOARD
    } else {
        STUDENT_DASHBOARD
    }
}

/// Strip the query string, then one trailing slash. `/` stays `/`.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}

/// Boundary-aware prefix match: `/teacher` covers `/teacher` and
/// `/teacher/x` but not `/teacher-resources`.
fn is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
