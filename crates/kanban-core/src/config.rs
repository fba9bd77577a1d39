use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{KanbanError, KanbanResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub boards: BoardSettings,
    #[serde(default)]
    pub users: UserSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Header carrying the externally authenticated caller id.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
    /// Per-connection queue length for real-time board events.
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default = "default_attachments_dir")]
    pub attachments_dir: PathBuf,
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSettings {
    #[serde(default = "default_columns")]
    pub default_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettings {
    /// Caller ids granted system administration on first profile sync.
    #[serde(default)]
    pub bootstrap_admins: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_identity_header() -> String {
    "x-user-id".to_string()
}

fn default_notification_buffer() -> usize {
    64
}

fn default_data_file() -> PathBuf {
    PathBuf::from("kanban.json")
}

fn default_attachments_dir() -> PathBuf {
    PathBuf::from("attachments")
}

fn default_max_attachment_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_columns() -> Vec<String> {
    vec![
        "To Do".to_string(),
        "In Progress".to_string(),
        "Done".to_string(),
    ]
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            identity_header: default_identity_header(),
            notification_buffer: default_notification_buffer(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            attachments_dir: default_attachments_dir(),
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            default_columns: default_columns(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/kanban-server/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("kanban-server/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("kanban-server\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load from the default location, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                if let Ok(config) = Self::load_from(&config_path) {
                    return config;
                }
            }
        }
        Self::default()
    }

    /// Load from an explicit path. Unlike [`AppConfig::load`], errors surface.
    pub fn load_from(path: &Path) -> KanbanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| KanbanError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> KanbanResult<Self> {
        toml::from_str(content).map_err(|e| KanbanError::Config(e.to_string()))
    }

    pub fn is_bootstrap_admin(&self, user_id: &str) -> bool {
        self.users.bootstrap_admins.iter().any(|id| id == user_id)
    }
}
