pub mod conversation;
pub mod group;
pub mod identity;
pub mod message;
pub mod user;

pub use conversation::{initials, Conversation, ConversationKey, ConversationKind, MemberInfo};
pub use group::Group;
pub use identity::Identity;
pub use message::{Attachment, DisplayMessage, MessageKind, OutgoingMessage, RawMessage};
pub use user::{ProfileUpdate, User, UserProfile};
