#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod detector;
pub mod error;
pub mod navigation;
pub mod permissions;
pub mod role;
pub mod route;
pub mod session;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use client::{ApiConfig, AuthApi, AuthPayload, Operation};
#[cfg(feature = "http")]
pub use client::HttpAuthApi;
pub use config::SessionConfig;
pub use detector::{RoleChangeDetector, RoleCheck};
pub use error::{Error, StorageError};
pub use navigation::{LogNavigator, Navigator};
pub use permissions::{PermissionLoader, PermissionSet};
pub use role::Role;
pub use route::RouteRules;
pub use session::SessionFacade;
pub use store::{FileStorage, KeyValueStorage, LoadOutcome, MemoryStorage, SessionStore};
pub use types::{Credentials, GoogleProfile, Identity, Permission, Registration, SessionToken, UserId};
