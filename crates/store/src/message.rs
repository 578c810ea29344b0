use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{InvalidMessageSnafu, MessagingResult};

// Keeps numeric id wrappers structurally identical.
macro_rules! define_message_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

define_message_id!(
    /// Groups messages into one conversation.
    ConversationId
);
define_message_id!(
    /// Total order of messages within a conversation.
    SequenceNumber
);

impl SequenceNumber {
    /// Returns the following sequence number, saturating at `u64::MAX`.
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Snapshot of the participant who wrote a message.
///
/// This is a copy taken when the message was built, not a live reference to
/// the participant, so presence changes never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
}

impl Sender {
    pub fn new(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            is_online: None,
        }
    }

    pub fn online(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            is_online: Some(true),
        }
    }

    pub fn with_presence(mut self, is_online: bool) -> Self {
        self.is_online = Some(is_online);
        self
    }
}

/// One chat message.
///
/// The store never edits a message in place; replacing content means building
/// a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub conversation_id: ConversationId,
    pub sequence_number: SequenceNumber,
}

impl Message {
    pub fn new(
        sender: Sender,
        text: impl Into<String>,
        conversation_id: ConversationId,
        sequence_number: SequenceNumber,
    ) -> Self {
        Self {
            sender,
            text: text.into(),
            conversation_id,
            sequence_number,
        }
    }

    /// Builds a message and rejects blank sender names or bodies.
    pub fn try_new(
        sender: Sender,
        text: impl Into<String>,
        conversation_id: ConversationId,
        sequence_number: SequenceNumber,
    ) -> MessagingResult<Self> {
        let message = Self::new(sender, text, conversation_id, sequence_number);
        message.validate()?;
        Ok(message)
    }

    pub fn validate(&self) -> MessagingResult<()> {
        ensure!(
            !self.sender.first_name.trim().is_empty(),
            InvalidMessageSnafu {
                stage: "validate-message",
                field: "sender.firstName",
                reason: "sender name must not be blank",
            }
        );
        ensure!(
            !self.text.trim().is_empty(),
            InvalidMessageSnafu {
                stage: "validate-message",
                field: "text",
                reason: "message text must not be blank",
            }
        );
        Ok(())
    }
}
