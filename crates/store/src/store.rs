use std::cell::RefCell;
use std::fmt;

use crate::MessageStore;
use crate::log::Logger;
use crate::message::{Message, SequenceNumber};
use crate::notifier::Notifier;

/// Fixed line logged once per store construction.
pub const STORE_INITIALIZED_MESSAGE: &str = "Messaging store initialized";

/// Single source of truth for the sender and user message collections.
///
/// Reads hand out owned copies and writes go through the `add_*` methods of
/// [`MessageStore`], so no caller can reach the internal vectors. Share one
/// instance per process via `Rc<MessagingStore>`.
pub struct MessagingStore {
    logger: Box<dyn Logger>,
    sender_messages: RefCell<Vec<Message>>,
    user_messages: RefCell<Vec<Message>>,
    sender_messages_changed: Notifier<Vec<Message>>,
    user_messages_changed: Notifier<Vec<Message>>,
}

impl fmt::Debug for MessagingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingStore")
            .field("sender_messages", &self.sender_messages.borrow().len())
            .field("user_messages", &self.user_messages.borrow().len())
            .field("sender_messages_changed", &self.sender_messages_changed)
            .field("user_messages_changed", &self.user_messages_changed)
            .finish()
    }
}

impl MessagingStore {
    /// Creates an empty store.
    pub fn new(logger: impl Logger + 'static) -> Self {
        Self::with_messages(logger, Vec::new(), Vec::new())
    }

    /// Creates a store seeded with existing messages.
    pub fn with_messages(
        logger: impl Logger + 'static,
        sender_messages: Vec<Message>,
        user_messages: Vec<Message>,
    ) -> Self {
        let store = Self {
            logger: Box::new(logger),
            sender_messages: RefCell::new(sender_messages),
            user_messages: RefCell::new(user_messages),
            sender_messages_changed: Notifier::new("sender-messages-changed"),
            user_messages_changed: Notifier::new("user-messages-changed"),
        };
        store.logger.log(STORE_INITIALIZED_MESSAGE);
        store
    }

    fn append(
        &self,
        collection: &RefCell<Vec<Message>>,
        notifier: &Notifier<Vec<Message>>,
        new_message: Message,
    ) {
        // Mutate and snapshot under one borrow, then release it before fan-out.
        let snapshot = {
            let mut messages = collection.borrow_mut();
            if let Some(last) = messages.last() {
                if new_message.sequence_number <= last.sequence_number {
                    tracing::warn!(
                        channel = notifier.channel(),
                        previous = %last.sequence_number,
                        appended = %new_message.sequence_number,
                        "appending message with non-increasing sequence number"
                    );
                }
            }
            messages.push(new_message);
            messages.clone()
        };
        let len = snapshot.len();

        let report = notifier.emit(snapshot);
        if report.deferred {
            // The outer append delivers this snapshot and logs its failures.
            return;
        }
        tracing::debug!(
            channel = notifier.channel(),
            len,
            rounds = report.rounds,
            delivered = report.delivered,
            failed = report.failures.len(),
            "published message collection"
        );
        for failure in &report.failures {
            self.logger.log(&failure.to_string());
        }
    }
}

impl MessageStore for MessagingStore {
    fn sender_messages(&self) -> Vec<Message> {
        self.sender_messages.borrow().clone()
    }

    fn user_messages(&self) -> Vec<Message> {
        self.user_messages.borrow().clone()
    }

    fn sender_message_count(&self) -> usize {
        self.sender_messages.borrow().len()
    }

    fn user_message_count(&self) -> usize {
        self.user_messages.borrow().len()
    }

    /// Every subscriber has observed the new collection when the outermost
    /// append returns. Appends made from a subscriber are delivered right
    /// after the round in progress.
    fn add_user_message(&self, new_message: Message) {
        self.append(&self.user_messages, &self.user_messages_changed, new_message);
    }

    fn add_sender_message(&self, new_message: Message) {
        self.append(
            &self.sender_messages,
            &self.sender_messages_changed,
            new_message,
        );
    }

    fn user_messages_changed(&self) -> &Notifier<Vec<Message>> {
        &self.user_messages_changed
    }

    fn sender_messages_changed(&self) -> &Notifier<Vec<Message>> {
        &self.sender_messages_changed
    }

    fn next_sequence_number(&self) -> SequenceNumber {
        let sender_messages = self.sender_messages.borrow();
        let user_messages = self.user_messages.borrow();
        sender_messages
            .iter()
            .chain(user_messages.iter())
            .map(|message| message.sequence_number)
            .max()
            .map(SequenceNumber::next)
            .unwrap_or_default()
    }
}
