use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use farm_helper_advice::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_SOURCE, WebhookConfig};
use farm_helper_chat::{DEFAULT_RESPONSE_TIMEOUT, SessionConfig};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/farm-helper";
pub const DEFAULT_CALLBACK_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8787";
pub const SETTINGS_DIRECTORY_NAME: &str = "farm-helper";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "FARM_HELPER_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,
    #[serde(default = "default_source")]
    pub source: String,
    /// Origin answer notifications must report to be accepted.
    ///
    /// The poster has to send this value in an `Origin` header on
    /// `POST /webhook-response`; posts without one are ignored.
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_callback_addr")]
    pub callback_addr: String,
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            webhook_url: default_webhook_url(),
            source: default_source(),
            origin: default_origin(),
            callback_addr: default_callback_addr(),
            response_timeout_secs: default_response_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ChatSettings {
    pub fn normalized(mut self) -> Self {
        self.webhook_url = non_blank_or(self.webhook_url, default_webhook_url);
        self.source = non_blank_or(self.source, default_source);
        self.origin = non_blank_or(self.origin, default_origin);
        self.callback_addr = non_blank_or(self.callback_addr, default_callback_addr);

        // A zero window would answer every question locally before the webhook can.
        if self.response_timeout_secs == 0 {
            self.response_timeout_secs = default_response_timeout_secs();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }

        self
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn webhook_config(&self) -> WebhookConfig {
        WebhookConfig::new(&self.webhook_url)
            .with_source(&self.source)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(&self.origin).with_response_timeout(self.response_timeout())
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<ChatSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".farm-helper"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<ChatSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: ChatSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &Path) -> ChatSettings {
        if !path.exists() {
            tracing::info!(path = ?path, "settings file not found, using defaults");
        }

        let figment = Figment::from(Serialized::defaults(ChatSettings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX));

        match figment.extract::<ChatSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    path = ?path,
                    error = %error,
                    "failed to parse settings, using defaults"
                );
                ChatSettings::default()
            }
        }
    }

    fn persist(&self, settings: &ChatSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!(path = ?self.config_path, "saved settings");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn non_blank_or(value: String, default: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_string()
    }
}

fn default_webhook_url() -> String {
    DEFAULT_WEBHOOK_URL.to_string()
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_callback_addr() -> String {
    DEFAULT_CALLBACK_ADDR.to_string()
}

fn default_response_timeout_secs() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT.as_secs()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}
