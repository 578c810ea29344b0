/// Draft composition and submission.
pub mod message_input;
/// Conversation display state kept in sync with the store.
pub mod view;

pub use message_input::MessageInput;
pub use view::ConversationView;
