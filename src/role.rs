use serde::{Deserialize, Serialize};

/// Coarse-grained role tag carried by an [`Identity`](crate::types::Identity).
///
/// Tags the client does not recognize are kept verbatim in [`Role::Other`]
/// so the persisted role snapshot still compares correctly, but they rank
/// below every known role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Member,
    /// Legacy alias for [`Role::Member`]; same rank.
    Student,
    Teacher,
    Admin,
    Other(String),
}

impl Role {
    /// The most privileged role.
    pub const TOP: Role = Role::Admin;

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Member => "member",
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
            Self::Other(tag) => tag,
        }
    }

    /// Ordinal rank in the role hierarchy (higher = more privileged).
    ///
    /// Unknown roles rank 0.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Admin => 3,
            Self::Teacher => 2,
            Self::Member | Self::Student => 1,
            Self::Other(_) => 0,
        }
    }

    /// `true` if this role is at least as privileged as `other`.
    #[must_use]
    pub fn is_at_least(&self, other: &Role) -> bool {
        self.rank() >= other.rank()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(tag: &str) -> Self {
        match tag {
            "member" => Self::Member,
            "student" => Self::Student,
            "teacher" => Self::Teacher,
            "admin" => Self::Admin,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for Role {
    fn from(tag: String) -> Self {
        match Role::from(tag.as_str()) {
            Self::Other(_) => Self::Other(tag),
            known => known,
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}
