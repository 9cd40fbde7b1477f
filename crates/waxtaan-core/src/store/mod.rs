pub mod chat_store;
pub mod local_storage;
pub mod unread;

pub use chat_store::ChatStore;
pub use local_storage::{LocalStorage, StorageError, TokenStore};
pub use unread::{UnreadEntry, UnreadState};
