use std::future::Future;

use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::types::{Credentials, GoogleProfile, Identity, Permission, Registration, SessionToken};

/// Backend location.
///
/// ```rust,ignore
/// use academy_session::ApiConfig;
///
/// let config = ApiConfig::new("https://api.example.com/api".parse()?);
/// assert_eq!(config.endpoint(Operation::Login)?.as_str(), "https://api.example.com/api/auth/login");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiConfig {
    pub(crate) base_url: Url,
}

impl ApiConfig {
    /// Endpoints are resolved relative to `base_url`; a trailing slash is
    /// added if missing so the last path segment is kept.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of the endpoint behind `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL cannot be joined.
    pub fn endpoint(&self, operation: Operation) -> Result<Url, Error> {
        self.base_url
            .join(operation.path())
            .map_err(|e| Error::Config(format!("{}: {e}", operation.as_str())))
    }
}

/// Backend call issued by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Register,
    GoogleLogin,
    Permissions,
    Logout,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::GoogleLogin => "google login",
            Self::Permissions => "permission load",
            Self::Logout => "logout",
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::Login => "auth/login",
            Self::Register => "auth/register",
            Self::GoogleLogin => "auth/google-login",
            Self::Permissions => "auth/permissions",
            Self::Logout => "auth/logout",
        }
    }
}

/// Successful authentication: token plus the identity it belongs to.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AuthPayload {
    pub token: SessionToken,
    pub user: Identity,
}

impl AuthPayload {
    #[must_use]
    pub fn new(token: SessionToken, user: Identity) -> Self {
        Self { token, user }
    }

    /// Reject payloads the session cannot be built from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if the token, user id or email is empty.
    pub fn validate(self, operation: Operation) -> Result<Self, Error> {
        let missing = if self.token.as_str().is_empty() {
            Some("token")
        } else if self.user.id.0.is_empty() {
            Some("user.id")
        } else if self.user.email.is_empty() {
            Some("user.email")
        } else {
            None
        };
        match missing {
            Some(field) => Err(Error::MalformedResponse {
                operation: operation.as_str(),
                detail: format!("empty {field}"),
            }),
            None => Ok(self),
        }
    }
}

/// `{success, data?, message?}` wrapper used by every backend response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    pub(crate) fn into_data(self, operation: Operation) -> Result<T, Error> {
        if !self.success {
            return Err(Error::Rejected {
                operation: operation.as_str(),
                message: self
                    .message
                    .unwrap_or_else(|| format!("{} failed", operation.as_str())),
            });
        }
        self.data.ok_or_else(|| Error::MalformedResponse {
            operation: operation.as_str(),
            detail: "missing data".into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PermissionsData {
    #[serde(default)]
    pub(crate) permissions: Vec<Permission>,
}

/// Map a non-success HTTP status to the error the caller sees.
pub(crate) fn classify_failure(operation: Operation, status: u16, detail: String) -> Error {
    let signs_in = matches!(operation, Operation::Login | Operation::GoogleLogin);
    match status {
        401 if signs_in => Error::InvalidCredentials,
        403 if signs_in => Error::AccountDeactivated,
        409 if operation == Operation::Register => Error::DuplicateAccount,
        422 => Error::Validation { detail },
        500..=599 => Error::Server { status, detail },
        _ => Error::Request {
            operation: operation.as_str(),
            status: Some(status),
            detail,
        },
    }
}

/// Backend authentication API consumed by the session facade.
///
/// [`HttpAuthApi`] talks to the real backend; tests provide scripted fakes.
pub trait AuthApi: Send + Sync + 'static {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthPayload, Error>> + Send;

    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthPayload, Error>> + Send;

    fn google_login(
        &self,
        profile: &GoogleProfile,
    ) -> impl Future<Output = Result<AuthPayload, Error>> + Send;

    fn permissions(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<Vec<Permission>, Error>> + Send;

    fn logout(&self, token: &SessionToken) -> impl Future<Output = Result<(), Error>> + Send;
}

#[cfg(feature = "http")]
pub use http::HttpAuthApi;

#[cfg(feature = "http")]
mod http {
    use serde::Serialize;
    use serde::de::DeserializeOwned;

    use super::{
        ApiConfig, AuthApi, AuthPayload, Envelope, Operation, PermissionsData, classify_failure,
    };
    use crate::error::Error;
    use crate::types::{Credentials, GoogleProfile, Permission, Registration, SessionToken};

    /// `reqwest`-backed [`AuthApi`].
    pub struct HttpAuthApi {
        config: ApiConfig,
        http: reqwest::Client,
    }

    impl HttpAuthApi {
        #[must_use]
        pub fn new(config: ApiConfig) -> Self {
            Self {
                config,
                http: reqwest::Client::new(),
            }
        }

        /// Use a custom HTTP client (timeouts, connection pool reuse, proxies).
        #[must_use]
        pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
            self.http = client;
            self
        }

        #[must_use]
        pub fn config(&self) -> &ApiConfig {
            &self.config
        }

        async fn post_auth<B: Serialize + ?Sized>(
            &self,
            operation: Operation,
            body: &B,
        ) -> Result<AuthPayload, Error> {
            let response = self
                .http
                .post(self.config.endpoint(operation)?)
                .json(body)
                .send()
                .await?;

            Self::read_envelope(response, operation).await
        }

        async fn read_envelope<T: DeserializeOwned>(
            response: reqwest::Response,
            operation: Operation,
        ) -> Result<T, Error> {
            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                let detail = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                    .ok()
                    .and_then(|e| e.message)
                    .unwrap_or(body);
                return Err(classify_failure(operation, status.as_u16(), detail));
            }

            serde_json::from_str::<Envelope<T>>(&body)
                .map_err(|e| Error::MalformedResponse {
                    operation: operation.as_str(),
                    detail: e.to_string(),
                })?
                .into_data(operation)
        }
    }

    impl AuthApi for HttpAuthApi {
        async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, Error> {
            self.post_auth(Operation::Login, credentials).await
        }

        async fn register(&self, registration: &Registration) -> Result<AuthPayload, Error> {
            self.post_auth(Operation::Register, registration).await
        }

        async fn google_login(&self, profile: &GoogleProfile) -> Result<AuthPayload, Error> {
            self.post_auth(Operation::GoogleLogin, profile).await
        }

        async fn permissions(&self, token: &SessionToken) -> Result<Vec<Permission>, Error> {
            let response = self
                .http
                .get(self.config.endpoint(Operation::Permissions)?)
                .bearer_auth(token.as_str())
                .send()
                .await?;

            let data: PermissionsData =
                Self::read_envelope(response, Operation::Permissions).await?;
            Ok(data.permissions)
        }

        async fn logout(&self, token: &SessionToken) -> Result<(), Error> {
            let response = self
                .http
                .post(self.config.endpoint(Operation::Logout)?)
                .bearer_auth(token.as_str())
                .send()
                .await?;

            if response.status().is_success() {
                return Ok(());
            }
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(classify_failure(Operation::Logout, status, body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    fn config(base: &str) -> ApiConfig {
        ApiConfig::new(base.parse().unwrap())
    }

    #[test]
    fn endpoints_keep_base_path() {
        let config = config("https://api.example.com/api");
        assert_eq!(config.base_url().as_str(), "https://api.example.com/api/");
        assert_eq!(
            config.endpoint(Operation::Login).unwrap().as_str(),
            "https://api.example.com/api/auth/login"
        );
        assert_eq!(
            config.endpoint(Operation::GoogleLogin).unwrap().as_str(),
            "https://api.example.com/api/auth/google-login"
        );
    }

    #[test]
    fn endpoints_on_bare_host() {
        let config = config("https://api.example.com");
        assert_eq!(
            config.endpoint(Operation::Permissions).unwrap().as_str(),
            "https://api.example.com/auth/permissions"
        );
    }

    #[test]
    fn status_classification() {
        let d = || String::from("detail");
        assert!(matches!(
            classify_failure(Operation::Login, 401, d()),
            Error::InvalidCredentials
        ));
        assert!(matches!(
            classify_failure(Operation::Login, 403, d()),
            Error::AccountDeactivated
        ));
        assert!(matches!(
            classify_failure(Operation::Register, 409, d()),
            Error::DuplicateAccount
        ));
        assert!(matches!(
            classify_failure(Operation::Register, 422, d()),
            Error::Validation { .. }
        ));
        assert!(matches!(
            classify_failure(Operation::GoogleLogin, 503, d()),
            Error::Server { status: 503, .. }
        ));
        assert!(matches!(
            classify_failure(Operation::Permissions, 401, d()),
            Error::Request {
                status: Some(401),
                ..
            }
        ));
        assert!(matches!(
            classify_failure(Operation::Login, 409, d()),
            Error::Request { .. }
        ));
    }

    #[test]
    fn envelope_success_yields_data() {
        let json = r#"{
            "success": true,
            "data": {
                "token": "tok",
                "user": {"id": "u1", "email": "a@b.c", "role": "student"}
            }
        }"#;
        let envelope: Envelope<AuthPayload> = serde_json::from_str(json).unwrap();
        let payload = envelope
            .into_data(Operation::Login)
            .unwrap()
            .validate(Operation::Login)
            .unwrap();
        assert_eq!(payload.token.as_str(), "tok");
        assert_eq!(payload.user.role, Role::Student);
    }

    #[test]
    fn envelope_failure_carries_server_message() {
        let json = r#"{"success": false, "message": "Email not verified"}"#;
        let envelope: Envelope<AuthPayload> = serde_json::from_str(json).unwrap();
        let err = envelope.into_data(Operation::Login).unwrap_err();
        assert_eq!(err.to_string(), "Email not verified");
    }

    #[test]
    fn envelope_without_data_is_malformed() {
        let envelope: Envelope<PermissionsData> =
            serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(
            envelope.into_data(Operation::Permissions),
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[test]
    fn empty_token_is_rejected() {
        let payload = AuthPayload::new(
            SessionToken::new(""),
            Identity::new("u1", "a@b.c", Role::Member),
        );
        assert!(matches!(
            payload.validate(Operation::Register),
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[test]
    fn permissions_payload_defaults_to_empty() {
        let envelope: Envelope<PermissionsData> =
            serde_json::from_str(r#"{"success": true, "data": {}}"#).unwrap();
        let data = envelope.into_data(Operation::Permissions).unwrap();
        assert!(data.permissions.is_empty());
    }
}
