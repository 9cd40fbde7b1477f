//! Application-wide constants
//!
//! Centralized location for endpoint paths, storage keys and defaults
//! that are used across multiple modules.

/// Default API server when `WAXTAAN_API_BASE_URL` is not set
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Default interval between reconciliation passes
/// Resolved user profiles are looked up again after this long
pub const DIRECTORY_TTL_SECS: u64 = 60;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Local storage key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// File name of the local key/value store inside the data dir
pub const LOCAL_STORAGE_FILE: &str = "local_storage.json";

/// Directory name used under the platform data dir
pub const APP_DIR_NAME: &str = "waxtaan";

// REST endpoints, relative to the API base URL
pub mod endpoints {
    pub const LOGIN: &str = "api/users/login";
    pub const REGISTER: &str = "api/users/register";
    pub const ME: &str = "api/users/me";
    /// Prefix for `api/users/{id}` and `api/users/{id}/contacts`
    pub const USERS: &str = "api/users";
    /// Prefix for `api/users/by-username/{name}`
    pub const USER_BY_USERNAME: &str = "api/users/by-username";
    pub const MESSAGES: &str = "api/messages";
    pub const GROUPS: &str = "api/groups";
}
