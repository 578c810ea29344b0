//! The sample conversation used to seed a fresh store.

use crate::message::{ConversationId, Message, SequenceNumber, Sender};

pub const SAMPLE_CONVERSATION_ID: ConversationId = ConversationId::new(1);

pub fn sender_messages() -> Vec<Message> {
    vec![
        Message::new(
            Sender::online("Ludovic"),
            "Message from Ludovic",
            SAMPLE_CONVERSATION_ID,
            SequenceNumber::new(0),
        ),
        Message::new(
            Sender::new("Jessica"),
            "Message from Jessica",
            SAMPLE_CONVERSATION_ID,
            SequenceNumber::new(1),
        ),
    ]
}

pub fn user_messages() -> Vec<Message> {
    vec![Message::new(
        Sender::new("Aurelie"),
        "Message from Aurelie",
        SAMPLE_CONVERSATION_ID,
        SequenceNumber::new(2),
    )]
}
