use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Backend user identifier (opaque string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Fine-grained capability tag granted by the backend.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct Permission(pub String);

impl From<&str> for Permission {
    fn from(tag: &str) -> Self {
        Self(tag.to_owned())
    }
}

impl std::borrow::Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Opaque bearer credential issued by the backend.
///
/// Never decoded on the client. `Debug` is redacted so tokens do not leak
/// into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// The signed-in principal as described by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Identity {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl Identity {
    /// Create an identity with the required fields; names default to empty.
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId(id.into()),
            first_name: String::new(),
            last_name: String::new(),
            email: email.into(),
            role,
            chapter: None,
            profile_picture: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    #[must_use]
    pub fn with_chapter(mut self, chapter: impl Into<String>) -> Self {
        self.chapter = Some(chapter.into());
        self
    }

    #[must_use]
    pub fn with_profile_picture(mut self, url: impl Into<String>) -> Self {
        self.profile_picture = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Email/password pair for `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account creation payload for `POST /auth/register`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("chapter", &self.chapter)
            .finish()
    }
}

/// Federated profile for `POST /auth/google-login`. No password.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProfile {
    pub google_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_accepts_mongo_style_id() {
        let json = r#"{
            "_id": "64f0c1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "role": "teacher",
            "chapter": "London"
        }"#;
        let identity: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.id, UserId("64f0c1".into()));
        assert_eq!(identity.role, Role::Teacher);
        assert_eq!(identity.chapter.as_deref(), Some("London"));
        assert_eq!(identity.profile_picture, None);
        assert_eq!(identity.full_name(), "Ada Lovelace");
    }

    #[test]
    fn identity_serializes_camel_case() {
        let identity = Identity::new("u1", "a@b.c", Role::Admin).with_profile_picture("p.png");
        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(value["id"], "u1");
        assert_eq!(value["role"], "admin");
        assert_eq!(value["profilePicture"], "p.png");
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let token = SessionToken::new("secret-token");
        assert!(!format!("{token:?}").contains("secret-token"));

        let creds = Credentials::new("a@b.c", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("a@b.c"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn google_profile_wire_format() {
        let profile = GoogleProfile {
            google_id: "g-1".into(),
            email: "a@b.c".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            profile_picture: None,
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["googleId"], "g-1");
        assert!(value.get("profilePicture").is_none());
    }
}
