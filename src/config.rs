use anyhow::bail;
use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

pub const TOKEN_ENV_VAR: &str = "JIMAKU_API_TOKEN";

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ConfigFile {
    pub api_token: Option<String>,
    pub player: Option<String>,
    pub sync_command: Option<String>,
    pub menu_command: Option<String>,
    /// Extra tokens stripped from names that match no convention.
    pub release_tokens: Vec<String>,
    pub video_extensions: Vec<String>,
}

/// Settings for one run, after merging CLI arguments, environment and config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_token: String,
    pub player: String,
    pub sync_command: String,
    pub menu_command: String,
    pub release_tokens: Vec<String>,
    pub video_extensions: Vec<String>,
    pub cache_path: PathBuf,
}

impl Settings {
    pub fn load(explicit_token: Option<String>) -> Result<Self> {
        let file = load_config_file()?;
        let api_token = pick_api_token(
            explicit_token,
            env::var(TOKEN_ENV_VAR).ok(),
            file.api_token.clone(),
        )?;

        Ok(Self {
            api_token,
            player: file.player.unwrap_or_else(|| "mpv".to_string()),
            sync_command: file.sync_command.unwrap_or_else(|| "ffsubsync".to_string()),
            menu_command: file.menu_command.unwrap_or_else(|| "fzf".to_string()),
            release_tokens: file.release_tokens,
            video_extensions: file.video_extensions,
            cache_path: get_cache_path(),
        })
    }
}

/// The argument wins over the environment, which wins over the config file.
/// Blank values count as unset.
pub fn pick_api_token(
    explicit: Option<String>,
    from_env: Option<String>,
    from_file: Option<String>,
) -> Result<String> {
    let token = [explicit, from_env, from_file]
        .into_iter()
        .flatten()
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty());

    match token {
        Some(token) => Ok(token),
        None => bail!(
            "Jimaku API token not found. Pass --token, set {TOKEN_ENV_VAR}, or add api_token = \"your-token\" to {}",
            get_config_path().display()
        ),
    }
}

fn load_config_file() -> Result<ConfigFile> {
    let config_path = get_config_path();
    if !config_path.exists() {
        return Ok(ConfigFile::default());
    }
    let config_content = fs::read_to_string(&config_path)?;
    let config: ConfigFile = toml::from_str(&config_content)?;
    tracing::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}

pub fn get_cache_path() -> PathBuf {
    get_config_dir_path().join("anilist_cache.json")
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("jimaku-dl"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}
