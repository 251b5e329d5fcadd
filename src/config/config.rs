use crate::input::limit::{parse_limit, DEFAULT_LIMIT};
use crate::state::mode::LookupMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub executor: ExecutorConfig,
    pub clipboard: ClipboardConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Interpreter used to run the lookup scripts
    pub node_path: String,

    /// Directory holding the executor scripts
    pub scripts_dir: PathBuf,

    /// Wall-clock limit for a single executor call
    pub timeout_secs: u64,

    /// Serialized responses above this size are replaced by a `too_large` summary
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Watch the clipboard for ObjectIds while in ObjectId mode
    pub enabled: bool,

    /// How often the clipboard is polled
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Mode selected at startup: "objectid", "find" or "aggregate"
    pub default_mode: String,

    /// Initial result limit for find/aggregate
    pub default_limit: u32,

    /// Override for the connections file location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections_file: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            node_path: "node".to_string(),
            scripts_dir: PathBuf::from("resources").join("scripts"),
            timeout_secs: 30,
            max_output_bytes: 500 * 1024,
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 1000,
        }
    }
}

impl ClipboardConfig {
    pub fn poll_interval(&self) -> Duration {
        // Anything faster just burns CPU on the clipboard API
        Duration::from_millis(self.poll_interval_ms.max(100))
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            default_mode: "objectid".to_string(),
            default_limit: DEFAULT_LIMIT,
            connections_file: None,
        }
    }
}

impl BehaviorConfig {
    /// Startup mode, falling back to ObjectId for unknown names
    pub fn initial_mode(&self) -> LookupMode {
        self.default_mode.parse().unwrap_or(LookupMode::ObjectId)
    }

    /// Startup limit, clamped to the accepted range
    pub fn initial_limit(&self) -> u32 {
        parse_limit(&self.default_limit.to_string()).unwrap_or(DEFAULT_LIMIT)
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            // Create default config if it doesn't exist
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Invalid configuration file")?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        Ok(crate::utils::app_paths::AppPaths::config_dir()?.join("config.toml"))
    }

    /// Where the connection list lives
    pub fn connections_path(&self) -> Result<PathBuf> {
        match &self.behavior.connections_file {
            Some(path) => Ok(path.clone()),
            None => crate::utils::app_paths::AppPaths::connections_file(),
        }
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# Candygram Configuration File
# Location: ~/.config/candygram/config.toml (Linux)
#           ~/Library/Application Support/candygram/config.toml (macOS)
#           %APPDATA%\candygram\config.toml (Windows)

[executor]
# Interpreter that runs the lookup scripts
node_path = "node"

# Directory containing findMongoDocument.js and friends
scripts_dir = "resources/scripts"

# Give up on a lookup after this many seconds
timeout_secs = 30

# Responses larger than this are summarized instead of displayed (bytes)
max_output_bytes = 512000

[clipboard]
# Search automatically when an ObjectId is copied (ObjectId mode only)
enabled = true

# Clipboard poll interval in milliseconds
poll_interval_ms = 1000

[behavior]
# Mode at startup: "objectid", "find" or "aggregate"
default_mode = "objectid"

# Initial result limit for find and aggregate (1-200)
default_limit = 20

# Connections file (leave commented to use the default location)
# connections_file = "/path/to/connections.json"
"#
        .to_string()
    }
}
