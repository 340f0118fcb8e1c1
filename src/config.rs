use crate::error::{AishError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OS: &str = "ubuntu";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub os: String,
    pub username: String,
    pub hostname: String,
    pub command: Option<String>,
    pub stream: bool,
    pub log_file: Option<PathBuf>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    api_key: Option<String>,
    api_base_url: Option<String>,
    model: Option<String>,
    os: Option<String>,
    username: Option<String>,
    hostname: Option<String>,
    stream: Option<bool>,
    log_file: Option<PathBuf>,
    system_prompt: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let file_config = match Self::config_path() {
            Some(path) => Self::load_file_config(&path)?,
            None => FileConfig::default(),
        };
        let dotenv = load_dotenv(Path::new(".env"))?;

        Self::resolve(file_config, layered_env(dotenv))
    }

    /// Merges the config file with variables looked up through `lookup`.
    /// Empty variables count as unset.
    pub fn resolve<F>(file_config: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let stream = match var("AISH_STREAM") {
            Some(value) => parse_bool("AISH_STREAM", &value)?,
            None => file_config.stream.unwrap_or(true),
        };

        Ok(Config {
            api_key: var("OPENAI_API_KEY").or(file_config.api_key),
            api_base_url: var("OPENAI_BASE_URL")
                .or(file_config.api_base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            model: var("OPENAI_MODEL")
                .or(file_config.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            os: var("PROMPT_OS")
                .or(file_config.os)
                .unwrap_or_else(|| DEFAULT_OS.to_string()),
            username: var("AISH_USERNAME")
                .or(file_config.username)
                .or_else(current_username)
                .unwrap_or_else(|| "root".to_string()),
            hostname: var("AISH_HOSTNAME")
                .or(file_config.hostname)
                .or_else(system_hostname)
                .unwrap_or_else(|| "server".to_string()),
            command: var("AISH_COMMAND"),
            stream,
            log_file: var("LOG_FILE").map(PathBuf::from).or(file_config.log_file),
            system_prompt: file_config.system_prompt,
        })
    }

    fn config_path() -> Option<PathBuf> {
        // Check XDG_CONFIG_HOME first, then fall back to ~/.config
        let config_dir = env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;

        Some(config_dir.join("aish").join("config.toml"))
    }

    /// A missing file is not an error; a malformed one is.
    pub fn load_file_config(path: &Path) -> Result<FileConfig> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| AishError::Config(format!("{}: {}", path.display(), e)))
    }

    /// The chat completions endpoint under the configured base URL.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.api_base_url.trim_end_matches('/')
        )
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AishError::Config(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}

/// Variables from a `.env` file. A missing file yields nothing.
pub fn load_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let entries = dotenvy::from_path_iter(path)
        .map_err(|e| AishError::Config(format!("{}: {}", path.display(), e)))?;
    entries
        .map(|entry| entry.map_err(|e| AishError::Config(format!("{}: {}", path.display(), e))))
        .collect()
}

/// Looks variables up in the process environment first, then in `dotenv`.
pub fn layered_env(dotenv: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
    move |key: &str| env::var(key).ok().or_else(|| dotenv.get(key).cloned())
}

fn current_username() -> Option<String> {
    whoami::fallible::username().ok().filter(|s| !s.is_empty())
}

fn system_hostname() -> Option<String> {
    whoami::fallible::hostname().ok().filter(|s| !s.is_empty())
}
