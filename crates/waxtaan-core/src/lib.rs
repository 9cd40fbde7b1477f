pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod poller;
pub mod reconcile;
pub mod store;
pub mod validation;

// Re-export the types most callers need at crate root for convenience
pub use api::{ApiClient, ApiError};
pub use config::CoreConfig;
pub use error::CoreError;
pub use models::{Conversation, ConversationKey, ConversationKind, Identity};
pub use poller::{PollEvent, Poller, PollerHandle};
pub use store::{ChatStore, LocalStorage, TokenStore, UnreadState};
