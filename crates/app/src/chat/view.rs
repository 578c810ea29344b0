use std::cell::RefCell;
use std::rc::Rc;

use parley_store::{Message, MessageStore, Subscription};

/// Locally cached copies of the store collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ConversationState {
    sender_messages: Vec<Message>,
    user_messages: Vec<Message>,
    refreshes: usize,
}

/// Conversation pane fed from a shared [`MessageStore`].
///
/// Construction only wires the store in. [`initialize`](Self::initialize)
/// seeds the local caches and starts listening on both change channels; the
/// composition root calls it once after wiring. Dropping the view ends its
/// subscriptions.
pub struct ConversationView<S: MessageStore + ?Sized> {
    store: Rc<S>,
    state: Rc<RefCell<ConversationState>>,
    subscriptions: Vec<Subscription>,
}

impl<S: MessageStore + ?Sized> ConversationView<S> {
    pub fn new(store: Rc<S>) -> Self {
        Self {
            store,
            state: Rc::new(RefCell::new(ConversationState::default())),
            subscriptions: Vec::new(),
        }
    }

    /// Reads the initial collections and subscribes to their updates.
    ///
    /// Each notification replaces the matching cache wholesale. Later calls
    /// are no-ops.
    pub fn initialize(&mut self) {
        if self.is_initialized() {
            return;
        }

        {
            let mut state = self.state.borrow_mut();
            state.sender_messages = self.store.sender_messages();
            state.user_messages = self.store.user_messages();
        }

        // Weak so the store's callback lists never keep a dropped view alive.
        let weak_state = Rc::downgrade(&self.state);
        let users = self
            .store
            .user_messages_changed()
            .subscribe(move |messages: &Vec<Message>| {
                if let Some(state) = weak_state.upgrade() {
                    let mut state = state.borrow_mut();
                    state.user_messages = messages.clone();
                    state.refreshes += 1;
                }
            });

        let weak_state = Rc::downgrade(&self.state);
        let senders = self
            .store
            .sender_messages_changed()
            .subscribe(move |messages: &Vec<Message>| {
                if let Some(state) = weak_state.upgrade() {
                    let mut state = state.borrow_mut();
                    state.sender_messages = messages.clone();
                    state.refreshes += 1;
                }
            });

        tracing::debug!(
            users = users.id(),
            senders = senders.id(),
            "conversation view initialized"
        );
        self.subscriptions = vec![users, senders];
    }

    pub fn is_initialized(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn sender_messages(&self) -> Vec<Message> {
        self.state.borrow().sender_messages.clone()
    }

    pub fn user_messages(&self) -> Vec<Message> {
        self.state.borrow().user_messages.clone()
    }

    /// Number of times a cache was replaced by a notification.
    pub fn refresh_count(&self) -> usize {
        self.state.borrow().refreshes
    }

    /// Text rows for the rendering host: sender messages, then user messages.
    pub fn render_lines(&self) -> Vec<String> {
        let state = self.state.borrow();
        let mut lines = render_group(&state.sender_messages);
        lines.extend(render_group(&state.user_messages));
        lines
    }
}

fn render_group(messages: &[Message]) -> Vec<String> {
    let mut ordered = messages.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|message| message.sequence_number);
    ordered
        .into_iter()
        .map(|message| {
            let presence = match message.sender.is_online {
                Some(true) => " (online)",
                Some(false) | None => "",
            };
            format!("{}{}: {}", message.sender.first_name, presence, message.text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use parley_store::{
        ConversationId, MessagingStore, RecordingLogger, Sender, SequenceNumber, fixtures,
    };

    use super::*;

    fn sample_store() -> Rc<MessagingStore> {
        Rc::new(MessagingStore::with_messages(
            RecordingLogger::new(),
            fixtures::sender_messages(),
            fixtures::user_messages(),
        ))
    }

    fn bob_says_hi() -> Message {
        Message::new(
            Sender::new("Bob"),
            "Hi",
            ConversationId::new(1),
            SequenceNumber::new(3),
        )
    }

    #[test]
    fn view_is_empty_until_initialized() {
        let store = sample_store();
        let view = ConversationView::new(Rc::clone(&store));

        assert!(!view.is_initialized());
        assert!(view.render_lines().is_empty());
        assert!(store.user_messages_changed().is_empty());
    }

    #[test]
    fn initialize_seeds_caches_and_subscribes_once() {
        let store = sample_store();
        let mut view = ConversationView::new(Rc::clone(&store));

        view.initialize();
        view.initialize();

        assert_eq!(view.sender_messages(), fixtures::sender_messages());
        assert_eq!(view.user_messages(), fixtures::user_messages());
        assert_eq!(store.user_messages_changed().subscriber_count(), 1);
        assert_eq!(
            view.render_lines(),
            vec![
                "Ludovic (online): Message from Ludovic".to_string(),
                "Jessica: Message from Jessica".to_string(),
                "Aurelie: Message from Aurelie".to_string(),
            ]
        );
    }

    #[test]
    fn store_additions_replace_user_cache() {
        let store = sample_store();
        let mut view = ConversationView::new(Rc::clone(&store));
        view.initialize();

        store.add_user_message(bob_says_hi());

        assert_eq!(view.refresh_count(), 1);
        assert_eq!(view.user_messages(), store.user_messages());
        assert_eq!(view.render_lines().last().map(String::as_str), Some("Bob: Hi"));
    }

    #[test]
    fn two_views_share_one_store() {
        let store = sample_store();
        let mut first = ConversationView::new(Rc::clone(&store));
        let mut second = ConversationView::new(Rc::clone(&store));
        first.initialize();
        second.initialize();

        store.add_user_message(bob_says_hi());

        assert_eq!(first.user_messages(), second.user_messages());
        assert_eq!(first.user_messages().len(), 2);
    }

    #[test]
    fn dropping_view_unsubscribes() {
        let store = sample_store();
        let mut view = ConversationView::new(Rc::clone(&store));
        view.initialize();
        assert_eq!(store.user_messages_changed().subscriber_count(), 1);

        drop(view);
        store.add_user_message(bob_says_hi());

        assert!(store.user_messages_changed().is_empty());
    }

    #[test]
    fn render_orders_each_group_by_sequence_number() {
        let store = Rc::new(MessagingStore::with_messages(
            RecordingLogger::new(),
            fixtures::sender_messages().into_iter().rev().collect(),
            Vec::new(),
        ));
        let mut view = ConversationView::new(store);
        view.initialize();

        assert_eq!(
            view.render_lines(),
            vec![
                "Ludovic (online): Message from Ludovic".to_string(),
                "Jessica: Message from Jessica".to_string(),
            ]
        );
    }

    #[test]
    fn sender_additions_replace_sender_cache() {
        let store = sample_store();
        let mut view = ConversationView::new(Rc::clone(&store));
        view.initialize();

        store.add_sender_message(Message::new(
            Sender::new("Jessica"),
            "Welcome Bob",
            ConversationId::new(1),
            SequenceNumber::new(4),
        ));

        assert_eq!(view.sender_messages(), store.sender_messages());
        assert_eq!(view.sender_messages().len(), 3);
        assert_eq!(view.refresh_count(), 1);
    }

    #[test]
    fn view_ends_in_sync_when_an_earlier_subscriber_replies() {
        let store = sample_store();
        let weak_store = Rc::downgrade(&store);
        let _auto_reply = store.user_messages_changed().subscribe(move |messages| {
            let Some(store) = weak_store.upgrade() else {
                return;
            };
            if messages.last().map(|message| message.text.as_str()) == Some("Hi") {
                store.add_user_message(Message::new(
                    Sender::new("Aurelie"),
                    "auto-reply",
                    ConversationId::new(1),
                    store.next_sequence_number(),
                ));
            }
        });
        let mut view = ConversationView::new(Rc::clone(&store));
        view.initialize();

        store.add_user_message(bob_says_hi());

        assert_eq!(store.user_message_count(), 3);
        assert_eq!(view.user_messages(), store.user_messages());
        assert_eq!(view.refresh_count(), 2);
        assert_eq!(
            view.render_lines().last().map(String::as_str),
            Some("Aurelie: auto-reply")
        );
    }
}
