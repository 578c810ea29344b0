use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use parley_store::{ConversationId, Message, Sender, fixtures};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};
use tempfile::NamedTempFile;

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_AUTHOR_NAME: &str = "You";
pub const SETTINGS_DIRECTORY_NAME: &str = "parley";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "PARLEY_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_conversation_id")]
    pub conversation_id: ConversationId,
    #[serde(default = "default_author")]
    pub author: Sender,
    #[serde(default = "fixtures::sender_messages")]
    pub sender_messages: Vec<Message>,
    #[serde(default = "fixtures::user_messages")]
    pub user_messages: Vec<Message>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            conversation_id: default_conversation_id(),
            author: default_author(),
            sender_messages: fixtures::sender_messages(),
            user_messages: fixtures::user_messages(),
        }
    }
}

impl AppSettings {
    pub fn normalized(mut self) -> Self {
        self.log_filter = if self.log_filter.trim().is_empty() {
            default_log_filter()
        } else {
            self.log_filter.trim().to_string()
        };
        self.author.first_name = if self.author.first_name.trim().is_empty() {
            DEFAULT_AUTHOR_NAME.to_string()
        } else {
            self.author.first_name.trim().to_string()
        };

        // Seeds that fail validation would render as empty rows.
        let before = self.sender_messages.len() + self.user_messages.len();
        self.sender_messages
            .retain(|message| message.validate().is_ok());
        self.user_messages.retain(|message| message.validate().is_ok());
        let dropped = before - (self.sender_messages.len() + self.user_messages.len());
        if dropped > 0 {
            tracing::warn!("dropped {} invalid seed message(s) from settings", dropped);
        }

        self
    }
}

/// Owns the settings in effect and the file they are saved back to.
///
/// Values are layered with figment: built-in defaults, then the JSON file,
/// then `PARLEY_LOG_FILTER`. Saves go through a staged file in the same
/// directory that is moved over the old one, so readers never observe a
/// half-written file.
pub struct SettingsStore {
    current: ArcSwap<AppSettings>,
    path: PathBuf,
}

impl SettingsStore {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_DIRECTORY_NAME)
            .join(SETTINGS_FILE_NAME)
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            current: ArcSwap::from_pointee(Self::read(&path)),
            path,
        }
    }

    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Arc<AppSettings> {
        self.current.load_full()
    }

    /// Changes the author name used for new messages and saves it.
    pub fn rename_author(&self, first_name: &str) -> Result<Arc<AppSettings>, SettingsError> {
        let first_name = first_name.trim();
        ensure!(
            !first_name.is_empty(),
            BlankAuthorSnafu {
                stage: "rename-author",
            }
        );

        let mut next = AppSettings::clone(&self.current());
        next.author.first_name = first_name.to_string();
        self.save(next)
    }

    /// Normalizes `settings`, writes them out, then makes them current.
    pub fn save(&self, settings: AppSettings) -> Result<Arc<AppSettings>, SettingsError> {
        let settings = Arc::new(settings.normalized());
        self.write(&settings)?;
        self.current.store(Arc::clone(&settings));
        Ok(settings)
    }

    fn read(path: &Path) -> AppSettings {
        let mut figment = Figment::from(Serialized::defaults(AppSettings::default()));
        if path.is_file() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!(path = ?path, "no settings file, starting from defaults");
        }
        let figment = figment.merge(Env::prefixed(SETTINGS_ENV_PREFIX).only(&["log_filter"]));

        figment
            .extract::<AppSettings>()
            .map(AppSettings::normalized)
            .unwrap_or_else(|error| {
                tracing::warn!(path = ?path, "ignoring unreadable settings: {}", error);
                AppSettings::default()
            })
    }

    fn write(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(directory).context(SettingsDirectorySnafu {
            stage: "create-settings-directory",
            path: directory,
        })?;

        let mut staged = NamedTempFile::new_in(directory).context(StageFileSnafu {
            stage: "stage-settings-file",
            path: directory,
        })?;
        serde_json::to_writer_pretty(&mut staged, settings).context(EncodeSnafu {
            stage: "encode-settings-json",
        })?;
        staged.persist(&self.path).context(ReplaceFileSnafu {
            stage: "replace-settings-file",
            path: &self.path,
        })?;

        tracing::info!(path = ?self.path, author = %settings.author.first_name, "settings saved");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("author name must not be blank on `{stage}`"))]
    BlankAuthor { stage: &'static str },
    #[snafu(display("cannot prepare settings directory {path:?} on `{stage}`: {source}"))]
    SettingsDirectory {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot stage a settings file in {path:?} on `{stage}`: {source}"))]
    StageFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot encode settings on `{stage}`: {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot move staged settings over {path:?} on `{stage}`: {source}"))]
    ReplaceFile {
        stage: &'static str,
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_conversation_id() -> ConversationId {
    fixtures::SAMPLE_CONVERSATION_ID
}

fn default_author() -> Sender {
    Sender::new(DEFAULT_AUTHOR_NAME)
}
