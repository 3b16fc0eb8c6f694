//! The session facade: the one object the host application talks to.
//!
//! ```rust,ignore
//! use academy_session::{HttpAuthApi, MemoryStorage, SessionConfig, SessionFacade};
//!
//! let config = SessionConfig::from_env()?;
//! let api = HttpAuthApi::new(config.api().clone());
//! let session = SessionFacade::init(config, api, MemoryStorage::new(), |path: &str| {
//!     router.push(path);
//! })
//! .await;
//!
//! session.login("ada@example.com", "secret").await?;
//! if session.can_access_route("/teacher/courses") { /* ... */ }
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::{AuthApi, AuthPayload, Operation};
use crate::config::SessionConfig;
use crate::detector::{RoleChangeDetector, RoleCheck};
use crate::error::Error;
use crate::navigation::Navigator;
use crate::permissions::{PermissionLoader, PermissionSet};
use crate::role::Role;
use crate::route;
use crate::store::{InvalidReason, KeyValueStorage, LoadOutcome, SessionStore};
use crate::types::{Credentials, GoogleProfile, Identity, Registration, SessionToken};

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    token: Option<SessionToken>,
    permissions: PermissionSet,
    /// Bumped on every establish/teardown; permission responses for an
    /// older generation are dropped.
    generation: u64,
}

/// Signed-in session plus the authorization queries built on it.
///
/// Constructed only through [`SessionFacade::init`], which restores any
/// persisted session before returning, so a facade is always ready.
/// All session state is mutated here and nowhere else.
pub struct SessionFacade<A, S, N> {
    config: SessionConfig,
    api: Arc<A>,
    store: Arc<SessionStore<S>>,
    permission_loader: PermissionLoader<A>,
    detector: RoleChangeDetector<S>,
    navigator: N,
    state: RwLock<SessionState>,
}

impl<A, S, N> SessionFacade<A, S, N>
where
    A: AuthApi,
    S: KeyValueStorage,
    N: Navigator,
{
    /// Restore the persisted session (if any), run the start-up role check
    /// and load permissions.
    pub async fn init(config: SessionConfig, api: A, storage: S, navigator: N) -> Self {
        let api = Arc::new(api);
        let store = Arc::new(SessionStore::new(storage));
        let facade = Self {
            config,
            permission_loader: PermissionLoader::new(api.clone()),
            detector: RoleChangeDetector::new(store.clone()),
            api,
            store,
            navigator,
            state: RwLock::new(SessionState::default()),
        };
        facade.restore().await;
        facade
    }

    async fn restore(&self) {
        let session = match self.store.load() {
            Ok(LoadOutcome::Empty) => return,
            Ok(LoadOutcome::Restored(session)) => session,
            Ok(LoadOutcome::Invalid(InvalidReason::RoleMismatch { persisted, current })) => {
                tracing::warn!(
                    persisted = %persisted,
                    current = %current,
                    "Stored role changed since last sign-in, forcing re-authentication"
                );
                self.clear_store();
                self.navigator.navigate(&self.config.login_route);
                return;
            }
            Ok(LoadOutcome::Invalid(reason)) => {
                tracing::warn!(reason = ?reason, "Discarding invalid stored session");
                self.clear_store();
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Session storage unreadable, starting signed out");
                return;
            }
        };

        match self.detector.verify(&session.identity.role) {
            Ok(RoleCheck::Changed { persisted, current }) => {
                tracing::warn!(
                    persisted = %persisted,
                    current = %current,
                    "Role changed since last sign-in, forcing re-authentication"
                );
                self.clear_store();
                self.navigator.navigate(&self.config.login_route);
                return;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Role snapshot check failed"),
        }

        tracing::debug!(user_id = %session.identity.id, "Restored stored session");
        let token = session.token.clone();
        let generation = self.replace_session(session.identity, session.token);
        self.load_permissions(&token, generation).await;
    }

    // ── Authentication ─────────────────────────────────────────────

    /// Sign in with email and password.
    ///
    /// Resolves after the session is stored and permissions are loaded.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCredentials`], [`Error::AccountDeactivated`], or any
    /// other backend/transport error. No state is changed on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, Error> {
        let credentials = Credentials::new(email, password);
        let payload = self
            .api
            .login(&credentials)
            .await
            .inspect_err(|e| tracing::warn!(error = ?e, "Login failed"))?;
        self.establish(Operation::Login, payload).await
    }

    /// Create an account and sign in to it.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateAccount`] if the email is taken, or any other
    /// backend/transport error. No state is changed on failure.
    pub async fn register(&self, registration: &Registration) -> Result<Identity, Error> {
        let payload = self
            .api
            .register(registration)
            .await
            .inspect_err(|e| tracing::warn!(error = ?e, "Registration failed"))?;
        self.establish(Operation::Register, payload).await
    }

    /// Sign in with a Google profile.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    pub async fn login_with_google(&self, profile: &GoogleProfile) -> Result<Identity, Error> {
        let payload = self
            .api
            .google_login(profile)
            .await
            .inspect_err(|e| tracing::warn!(error = ?e, "Google login failed"))?;
        self.establish(Operation::GoogleLogin, payload).await
    }

    /// Drop the session locally, then tell the backend. Never fails.
    pub async fn logout(&self) {
        let Some(token) = self.teardown() else {
            tracing::debug!("Logout without a session");
            return;
        };
        if let Err(e) = self.api.logout(&token).await {
            tracing::debug!(error = ?e, "Backend logout failed, ignoring");
        }
        tracing::info!("Signed out");
    }

    async fn establish(&self, operation: Operation, payload: AuthPayload) -> Result<Identity, Error> {
        let AuthPayload { token, user } = payload
            .validate(operation)
            .inspect_err(|e| tracing::warn!(error = ?e, "Rejected authentication response"))?;

        if let Err(e) = self.store.save(&user, &token) {
            tracing::error!(
                error = %e,
                operation = operation.as_str(),
                "Failed to persist session"
            );
            self.rollback_store();
            return Err(e.into());
        }

        tracing::info!(
            user_id = %user.id,
            role = %user.role,
            operation = operation.as_str(),
            "Session established"
        );

        let generation = self.replace_session(user.clone(), token.clone());
        self.load_permissions(&token, generation).await;
        Ok(user)
    }

    // ── Live updates ───────────────────────────────────────────────

    /// Apply a fresh copy of the signed-in identity (e.g. from a profile
    /// reload) and check its role against the persisted snapshot.
    ///
    /// A changed role forces a logout and a redirect to the login route.
    /// Otherwise the identity replaces the live one and is persisted.
    /// Returns `None` when there is no session, the identity belongs to a
    /// different user, or the snapshot is unreadable.
    pub async fn update_identity(&self, identity: Identity) -> Option<RoleCheck> {
        let live_id = self.state.read().identity.as_ref().map(|i| i.id.clone());
        let Some(live_id) = live_id else {
            tracing::debug!("Ignoring identity update without a session");
            return None;
        };
        if live_id != identity.id {
            tracing::warn!(
                user_id = %live_id,
                update_id = %identity.id,
                "Ignoring identity update for a different user"
            );
            return None;
        }

        let check = match self.detector.verify(&identity.role) {
            Ok(check) => check,
            Err(e) => {
                tracing::warn!(error = %e, "Role snapshot check failed");
                return None;
            }
        };

        if let RoleCheck::Changed { persisted, current } = &check {
            self.force_logout(persisted, current).await;
            return Some(check);
        }

        let token = {
            let mut state = self.state.write();
            state.identity = Some(identity.clone());
            state.token.clone()
        };
        if let Some(token) = token {
            if let Err(e) = self.store.save(&identity, &token) {
                tracing::error!(error = %e, "Failed to persist updated identity");
            }
        }
        Some(check)
    }

    async fn force_logout(&self, persisted: &Role, current: &Role) {
        tracing::warn!(
            persisted = %persisted,
            current = %current,
            "Role changed during session, forcing re-authentication"
        );
        self.logout().await;
        self.navigator.navigate(&self.config.login_route);
    }

    // ── Permissions ────────────────────────────────────────────────

    /// Reload the permission set for the current session.
    pub async fn refresh_permissions(&self) {
        let (token, generation) = {
            let state = self.state.read();
            (state.token.clone(), state.generation)
        };
        match token {
            Some(token) => self.load_permissions(&token, generation).await,
            None => tracing::debug!("No session, skipping permission refresh"),
        }
    }

    async fn load_permissions(&self, token: &SessionToken, generation: u64) {
        let permissions = self.permission_loader.load(token).await;
        let mut state = self.state.write();
        if state.generation == generation {
            state.permissions = permissions;
        } else {
            tracing::debug!("Discarding permissions for a superseded session");
        }
    }

    // ── Queries ────────────────────────────────────────────────────

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.read().identity.is_some()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.read().identity.clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<SessionToken> {
        self.state.read().token.clone()
    }

    #[must_use]
    pub fn permissions(&self) -> PermissionSet {
        self.state.read().permissions.clone()
    }

    #[must_use]
    pub fn has_permission(&self, tag: &str) -> bool {
        let state = self.state.read();
        state.identity.is_some() && state.permissions.contains(tag)
    }

    #[must_use]
    pub fn has_role(&self, role: &Role) -> bool {
        self.state
            .read()
            .identity
            .as_ref()
            .is_some_and(|i| i.role == *role)
    }

    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.state
            .read()
            .identity
            .as_ref()
            .is_some_and(|i| roles.contains(&i.role))
    }

    #[must_use]
    pub fn is_role_or_higher(&self, role: &Role) -> bool {
        self.state
            .read()
            .identity
            .as_ref()
            .is_some_and(|i| i.role.is_at_least(role))
    }

    /// Client-side route gate; see [`RouteRules::can_access`](crate::RouteRules::can_access).
    #[must_use]
    pub fn can_access_route(&self, path: &str) -> bool {
        let state = self.state.read();
        self.config
            .route_rules
            .can_access(state.identity.as_ref(), path)
    }

    /// Landing route for the signed-in role, or the login route.
    #[must_use]
    pub fn role_dashboard(&self) -> &str {
        let dashboard = self
            .state
            .read()
            .identity
            .as_ref()
            .map(|i| route::dashboard_for(&i.role));
        dashboard.unwrap_or(self.config.login_route.as_str())
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    // ── State transitions ──────────────────────────────────────────

    fn replace_session(&self, identity: Identity, token: SessionToken) -> u64 {
        let mut state = self.state.write();
        state.identity = Some(identity);
        state.token = Some(token);
        state.permissions = PermissionSet::new();
        state.generation += 1;
        state.generation
    }

    fn teardown(&self) -> Option<SessionToken> {
        self.clear_store();
        let mut state = self.state.write();
        state.identity = None;
        state.permissions = PermissionSet::new();
        state.generation += 1;
        state.token.take()
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear session storage");
        }
    }

    /// Put the store back to the live session after a failed save.
    fn rollback_store(&self) {
        let previous = {
            let state = self.state.read();
            state.identity.clone().zip(state.token.clone())
        };
        let restored = match &previous {
            Some((identity, token)) => self.store.save(identity, token).is_ok(),
            None => false,
        };
        if !restored {
            self.clear_store();
        }
    }
}
