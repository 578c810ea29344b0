use std::rc::Rc;

use parley_store::{ConversationId, Message, MessageStore, MessagingResult, Sender};

/// Draft editor that submits user messages to the store.
pub struct MessageInput<S: MessageStore + ?Sized> {
    store: Rc<S>,
    author: Sender,
    conversation_id: ConversationId,
    draft: String,
}

impl<S: MessageStore + ?Sized> MessageInput<S> {
    pub fn new(store: Rc<S>, author: Sender, conversation_id: ConversationId) -> Self {
        Self {
            store,
            author,
            conversation_id,
            draft: String::new(),
        }
    }

    pub fn author(&self) -> &Sender {
        &self.author
    }

    /// Applies to messages submitted from now on; sent ones keep their snapshot.
    pub fn set_author(&mut self, author: Sender) {
        self.author = author;
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Builds a message from the draft and appends it to the store.
    ///
    /// Blank drafts are rejected and kept as-is; on success the draft is
    /// cleared and the stored message returned.
    pub fn submit(&mut self) -> MessagingResult<Message> {
        let message = Message::try_new(
            self.author.clone(),
            self.draft.trim(),
            self.conversation_id,
            self.store.next_sequence_number(),
        )?;

        self.store.add_user_message(message.clone());
        self.draft.clear();
        tracing::debug!(
            sequence_number = %message.sequence_number,
            "submitted user message"
        );
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use parley_store::{MessagingError, MessagingStore, RecordingLogger, SequenceNumber, fixtures};

    use super::*;

    fn input_for(store: &Rc<MessagingStore>) -> MessageInput<MessagingStore> {
        MessageInput::new(Rc::clone(store), Sender::new("Bob"), ConversationId::new(1))
    }

    fn sample_store() -> Rc<MessagingStore> {
        Rc::new(MessagingStore::with_messages(
            RecordingLogger::new(),
            fixtures::sender_messages(),
            fixtures::user_messages(),
        ))
    }

    #[test]
    fn submit_appends_with_next_sequence_number() {
        let store = sample_store();
        let mut input = input_for(&store);
        input.set_draft("  Hi  ");

        let message = input.submit().unwrap();

        assert_eq!(message.text, "Hi");
        assert_eq!(message.sequence_number, SequenceNumber::new(3));
        assert_eq!(store.user_messages().last(), Some(&message));
        assert!(input.draft().is_empty());
    }

    #[test]
    fn consecutive_submits_keep_sequence_increasing() {
        let store = sample_store();
        let mut input = input_for(&store);

        input.set_draft("first");
        let first = input.submit().unwrap();
        input.set_draft("second");
        let second = input.submit().unwrap();

        assert!(second.sequence_number > first.sequence_number);
    }

    #[test]
    fn blank_draft_is_rejected_without_touching_store() {
        let store = sample_store();
        let mut input = input_for(&store);
        input.set_draft("   ");

        let result = input.submit();

        assert!(matches!(
            result,
            Err(MessagingError::InvalidMessage { field: "text", .. })
        ));
        assert_eq!(store.user_messages(), fixtures::user_messages());
        assert_eq!(input.draft(), "   ");
    }

    #[test]
    fn author_change_leaves_sent_messages_alone() {
        let store = sample_store();
        let mut input = input_for(&store);
        input.set_draft("before");
        let before = input.submit().unwrap();

        input.set_author(Sender::new("Robert"));
        input.set_draft("after");
        let after = input.submit().unwrap();

        let users = store.user_messages();
        assert_eq!(users[users.len() - 2], before);
        assert_eq!(before.sender.first_name, "Bob");
        assert_eq!(after.sender.first_name, "Robert");
    }
}
