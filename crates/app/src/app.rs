use std::io::{BufRead, Write};
use std::rc::Rc;

use parley_store::{Message, MessageStore, MessagingError, MessagingStore, TracingLogger};
use snafu::{ResultExt, Snafu};

use crate::chat::{ConversationView, MessageInput};
use crate::settings::{SettingsError, SettingsStore};

/// Input prefix that renames the author instead of sending a message.
pub const RENAME_COMMAND: &str = "/name";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("failed to read input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to write output on `{stage}`: {source}"))]
    WriteOutput {
        stage: &'static str,
        source: std::io::Error,
    },
}

/// Composition root: owns the single store, the views wired to it and the
/// settings they were built from.
pub struct ChatApp {
    settings: SettingsStore,
    store: Rc<MessagingStore>,
    conversation: ConversationView<MessagingStore>,
    input: MessageInput<MessagingStore>,
}

impl ChatApp {
    /// Builds the store from settings, wires every view to the same instance
    /// and runs their initialization step.
    pub fn new(settings: SettingsStore) -> Self {
        let current = settings.current();
        let store = Rc::new(MessagingStore::with_messages(
            TracingLogger,
            current.sender_messages.clone(),
            current.user_messages.clone(),
        ));
        Self::with_store(store, settings)
    }

    pub fn with_store(store: Rc<MessagingStore>, settings: SettingsStore) -> Self {
        let current = settings.current();
        let mut conversation = ConversationView::new(Rc::clone(&store));
        let input = MessageInput::new(
            Rc::clone(&store),
            current.author.clone(),
            current.conversation_id,
        );

        conversation.initialize();

        Self {
            settings,
            store,
            conversation,
            input,
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn store(&self) -> &Rc<MessagingStore> {
        &self.store
    }

    pub fn conversation(&self) -> &ConversationView<MessagingStore> {
        &self.conversation
    }

    /// Submits `text` as the configured author.
    pub fn send(&mut self, text: &str) -> Result<Message, MessagingError> {
        self.input.set_draft(text);
        self.input.submit()
    }

    /// Saves a new author name and uses it for every later message.
    pub fn rename_author(&mut self, first_name: &str) -> Result<(), SettingsError> {
        let updated = self.settings.rename_author(first_name)?;
        self.input.set_author(updated.author.clone());
        Ok(())
    }

    /// Reads one message per input line and re-renders after each accepted one.
    ///
    /// A line starting with `/name ` renames the author instead.
    pub fn run(&mut self, input: impl BufRead, mut output: impl Write) -> Result<(), AppError> {
        self.render(&mut output)?;

        for line in input.lines() {
            let line = line.context(ReadInputSnafu {
                stage: "read-input-line",
            })?;
            if line.trim().is_empty() {
                continue;
            }

            if let Some(first_name) = line.trim().strip_prefix(RENAME_COMMAND) {
                if first_name.is_empty() || first_name.starts_with(char::is_whitespace) {
                    if let Err(error) = self.rename_author(first_name) {
                        tracing::warn!("rename rejected: {}", error);
                    }
                    continue;
                }
            }

            match self.send(&line) {
                Ok(_) => self.render(&mut output)?,
                Err(error) => tracing::warn!("message rejected: {}", error),
            }
        }

        tracing::info!(
            user_messages = self.store.user_message_count(),
            "input closed, shutting down"
        );
        Ok(())
    }

    fn render(&self, output: &mut impl Write) -> Result<(), AppError> {
        writeln!(output, "--- conversation ---").context(WriteOutputSnafu {
            stage: "render-header",
        })?;
        for line in self.conversation.render_lines() {
            writeln!(output, "{line}").context(WriteOutputSnafu {
                stage: "render-line",
            })?;
        }
        output.flush().context(WriteOutputSnafu {
            stage: "flush-output",
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::settings::SETTINGS_FILE_NAME;

    use super::*;

    fn app_in(dir: &TempDir) -> ChatApp {
        ChatApp::new(SettingsStore::open(dir.path().join(SETTINGS_FILE_NAME)))
    }

    #[test]
    fn new_app_shows_seeded_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(&dir);

        assert!(app.conversation().is_initialized());
        assert_eq!(app.conversation().render_lines().len(), 3);
    }

    #[test]
    fn send_flows_through_store_into_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);

        let message = app.send("Hello there").unwrap();

        assert_eq!(message.sender.first_name, "You");
        assert_eq!(app.store().user_messages().last(), Some(&message));
        assert_eq!(app.conversation().user_messages(), app.store().user_messages());
        assert_eq!(app.conversation().refresh_count(), 1);
    }

    #[test]
    fn run_renders_after_each_accepted_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        let mut output = Vec::new();

        app.run("Hi\n\n   \nBye\n".as_bytes(), &mut output).unwrap();

        let rendered = String::from_utf8(output).unwrap();
        assert_eq!(rendered.matches("--- conversation ---").count(), 3);
        assert!(rendered.ends_with("You: Hi\nYou: Bye\n"));
        assert_eq!(app.store().user_message_count(), 3);
    }

    #[test]
    fn name_command_renames_author_and_saves_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        let mut output = Vec::new();

        app.run("Hi\n/name Bob\nAgain\n".as_bytes(), &mut output)
            .unwrap();

        let rendered = String::from_utf8(output).unwrap();
        assert_eq!(rendered.matches("--- conversation ---").count(), 3);
        assert!(rendered.ends_with("You: Hi\nBob: Again\n"));
        assert_eq!(app.settings().current().author.first_name, "Bob");

        let reopened = SettingsStore::open(dir.path().join(SETTINGS_FILE_NAME));
        assert_eq!(reopened.current().author.first_name, "Bob");
        assert_eq!(app_in(&dir).send("Back").unwrap().sender.first_name, "Bob");
    }

    #[test]
    fn blank_name_command_keeps_author_and_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        let mut output = Vec::new();

        app.run("/name   \n/names are fun\n".as_bytes(), &mut output)
            .unwrap();

        assert_eq!(app.settings().current().author.first_name, "You");
        assert!(!dir.path().join(SETTINGS_FILE_NAME).exists());
        assert_eq!(
            app.store().user_messages().last().map(|message| message.text.as_str()),
            Some("/names are fun")
        );
    }
}
