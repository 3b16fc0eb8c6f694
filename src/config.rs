use url::Url;

use crate::client::ApiConfig;
use crate::error::Error;
use crate::route::RouteRules;

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Session configuration.
///
/// Required field (`api`) is a constructor parameter; everything else has a
/// default and a `with_*` override.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) api: ApiConfig,
    pub(crate) login_route: String,
    pub(crate) route_rules: RouteRules,
}

impl SessionConfig {
    #[must_use]
    pub fn new(api: ApiConfig) -> Self {
        Self {
            api,
            login_route: DEFAULT_LOGIN_ROUTE.into(),
            route_rules: RouteRules::default(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `ACADEMY_API_URL`: backend base URL
    ///
    /// # Optional env vars
    /// - `ACADEMY_LOGIN_ROUTE`: sign-in route (default `/login`)
    /// - `ACADEMY_SHARED_ROUTES`: comma-separated routes open to every role
    /// - `ACADEMY_LEGACY_ROUTES`: comma-separated legacy routes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `ACADEMY_API_URL` is missing or invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let api_url = lookup("ACADEMY_API_URL")
            .ok_or_else(|| Error::Config("ACADEMY_API_URL is required".into()))?;
        let api_url: Url = api_url
            .parse()
            .map_err(|e| Error::Config(format!("ACADEMY_API_URL: {e}")))?;

        let mut config = Self::new(ApiConfig::new(api_url));

        if let Some(route) = lookup("ACADEMY_LOGIN_ROUTE") {
            config = config.with_login_route(route);
        }
        let mut rules = config.route_rules.clone();
        if let Some(routes) = lookup("ACADEMY_SHARED_ROUTES") {
            rules = rules.with_shared_routes(split_routes(&routes));
        }
        if let Some(routes) = lookup("ACADEMY_LEGACY_ROUTES") {
            rules = rules.with_legacy_routes(split_routes(&routes));
        }

        Ok(config.with_route_rules(rules))
    }

    #[must_use]
    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    #[must_use]
    pub fn with_route_rules(mut self, rules: RouteRules) -> Self {
        self.route_rules = rules;
        self
    }

    #[must_use]
    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    #[must_use]
    pub fn route_rules(&self) -> &RouteRules {
        &self.route_rules
    }
}

fn split_routes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::route::DEFAULT_SHARED_ROUTES;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn api_url_is_required() {
        let err = SessionConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn invalid_api_url_is_rejected() {
        let err =
            SessionConfig::from_lookup(lookup(&[("ACADEMY_API_URL", "not a url")])).unwrap_err();
        assert!(err.to_string().contains("ACADEMY_API_URL"));
    }

    #[test]
    fn defaults_apply() {
        let config =
            SessionConfig::from_lookup(lookup(&[("ACADEMY_API_URL", "https://api.example.com")]))
                .unwrap();
        assert_eq!(config.login_route(), "/login");
        assert_eq!(
            config.route_rules().shared_routes().len(),
            DEFAULT_SHARED_ROUTES.len()
        );
    }

    #[test]
    fn overrides_from_env() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("ACADEMY_API_URL", "https://api.example.com/v1"),
            ("ACADEMY_LOGIN_ROUTE", "/sign-in"),
            ("ACADEMY_SHARED_ROUTES", "/calendar, /help ,"),
            ("ACADEMY_LEGACY_ROUTES", ""),
        ]))
        .unwrap();
        assert_eq!(config.login_route(), "/sign-in");
        assert_eq!(config.route_rules().shared_routes(), ["/calendar", "/help"]);
        assert!(config.route_rules().legacy_routes().is_empty());
        assert_eq!(config.api().base_url().as_str(), "https://api.example.com/v1/");
    }
}
