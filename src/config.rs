//! Musebot configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main musebot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MusebotConfig {
    /// Generation backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Deadline budgets for external calls
    #[serde(default)]
    pub deadlines: DeadlineConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

impl MusebotConfig {
    /// Load configuration from a TOML file. Sections omitted from the file
    /// fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Chat completion model
    pub chat_model: String,

    /// Image generation size (e.g. "1024x1024")
    pub image_size: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            image_size: "1024x1024".to_string(),
            api_key_env: "MUSEBOT_API_KEY".to_string(),
        }
    }
}

/// Deadline budgets, in seconds, for the three classes of external work.
///
/// These are configuration, not constants baked into call sites: the
/// orchestrator and pipeline read whichever budget applies to the call
/// they are about to make.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineConfig {
    /// Budget for local/administrative lookups
    pub short_secs: u64,

    /// Budget for single-shot generation calls
    pub medium_secs: u64,

    /// Budget for contextful, larger-payload generation calls
    pub long_secs: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            short_secs: 10,
            medium_secs: 60,
            long_secs: 90,
        }
    }
}

impl DeadlineConfig {
    /// Short budget as a `Duration`
    pub fn short(&self) -> Duration {
        Duration::from_secs(self.short_secs)
    }

    /// Medium budget as a `Duration`
    pub fn medium(&self) -> Duration {
        Duration::from_secs(self.medium_secs)
    }

    /// Long budget as a `Duration`
    pub fn long(&self) -> Duration {
        Duration::from_secs(self.long_secs)
    }
}

/// How generated images are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactMode {
    /// Download the image, store the blob and a metadata index record
    Full,
    /// Store only the prompt → URL mapping, no binary persisted
    UrlOnly,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory for the artifact index
    pub data_dir: PathBuf,

    /// Directory for image blobs
    pub blob_dir: PathBuf,

    /// Artifact persistence mode
    pub artifact_mode: ArtifactMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            blob_dir: PathBuf::from("data/images"),
            artifact_mode: ArtifactMode::Full,
        }
    }
}

/// Conversation behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System preamble written when a conversation begins
    pub system_preamble: String,

    /// Trailer appended to every contextful reply
    pub context_trailer: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_preamble: "You are a helpful chatbot".to_string(),
            context_trailer: "You are chatting with me in a conversation with memory. \
                              Remember to use the /end command to finish the conversation."
                .to_string(),
        }
    }
}
