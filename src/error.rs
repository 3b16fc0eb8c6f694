/// Errors surfaced by the session facade and the backend client.
///
/// `Display` renders a message fit for showing to the end user; technical
/// detail (status codes, response bodies) lives in the variant fields.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account has been deactivated. Please contact an administrator")]
    AccountDeactivated,

    #[error("An account with this email already exists")]
    DuplicateAccount,

    #[error("Please check your input and try again")]
    Validation { detail: String },

    #[error("Server error, please try again later")]
    Server { status: u16, detail: String },

    /// Backend answered 2xx with `success: false`.
    #[error("{message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("Something went wrong, please try again")]
    Request {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[cfg(feature = "http")]
    #[error("Something went wrong, please try again")]
    Http(#[from] reqwest::Error),

    #[error("Something went wrong, please try again")]
    MalformedResponse {
        operation: &'static str,
        detail: String,
    },

    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures of the durable key-value area backing the session store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
