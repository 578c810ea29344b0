#![deny(unsafe_code)]

pub mod error;
pub mod fixtures;
pub mod log;
pub mod message;
pub mod notifier;
pub mod store;

pub use error::{MessagingError, MessagingResult};
#[cfg(any(test, feature = "test-util"))]
pub use log::RecordingLogger;
pub use log::{Logger, TracingLogger};
pub use message::{ConversationId, Message, Sender, SequenceNumber};
pub use notifier::{EmitReport, Notifier, Subscription};
pub use store::{MessagingStore, STORE_INITIALIZED_MESSAGE};

/// Read and write surface that view components depend on.
///
/// Accessors return owned copies. Each `add_*` call publishes the whole
/// updated collection on the matching `*_changed` notifier.
pub trait MessageStore {
    fn sender_messages(&self) -> Vec<Message>;
    fn user_messages(&self) -> Vec<Message>;
    fn sender_message_count(&self) -> usize;
    fn user_message_count(&self) -> usize;
    fn add_sender_message(&self, new_message: Message);
    fn add_user_message(&self, new_message: Message);
    fn sender_messages_changed(&self) -> &Notifier<Vec<Message>>;
    fn user_messages_changed(&self) -> &Notifier<Vec<Message>>;
    /// One past the highest sequence number held in either collection.
    ///
    /// A helper for producers; the store itself never assigns numbers.
    fn next_sequence_number(&self) -> SequenceNumber;
}
