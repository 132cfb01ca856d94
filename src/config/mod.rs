use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

pub const CREDENTIALS_ENV: &str = "GOOGLE_SERVICE_ACCOUNT_KEY";
pub const SPREADSHEET_ID_ENV: &str = "SPREADSHEET_ID";

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub bind: Option<String>,
    pub spreadsheet_id: Option<String>,
    #[serde(alias = "credentials")]
    pub credentials_file: Option<String>,
    pub rows_file: Option<String>,
    #[serde(alias = "revalidate_seconds")]
    pub revalidate: Option<u64>,
    pub refetch_rate: Option<u32>,
    pub timeout: Option<usize>,
    pub site_title: Option<String>,
    pub booking_url: Option<String>,
    pub no_color: Option<bool>,
}

pub const CONFIG_DIR: &str = ".costume-gallery";
pub const CONFIG_FILE: &str = "config.yml";

/// What to do when the gallery config file does not exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingConfig {
    /// The implicit default location; run on built-in defaults.
    UseDefaults,
    /// A path named with `--config`; its absence is an error.
    Fail,
}

fn user_home() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .into_iter()
        .find_map(|key| env::var_os(key).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(user_home()?.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Resolves a user-supplied path (config, credentials, rows file, export
/// directory), expanding a leading `~` to the home directory.
pub fn resolve_path(raw: &str) -> PathBuf {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\"))
    };
    match (rest, user_home()) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

pub fn load_config(path: &Path, missing: MissingConfig) -> Result<ConfigFile, String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return match missing {
                MissingConfig::UseDefaults => Ok(ConfigFile::default()),
                MissingConfig::Fail => Err(format!(
                    "gallery config '{}' does not exist (create one with --init-config)",
                    path.display()
                )),
            };
        }
        Err(e) => {
            return Err(format!(
                "cannot read gallery config '{}': {e}",
                path.display()
            ))
        }
    };
    serde_yaml::from_str(&contents)
        .map_err(|e| format!("gallery config '{}' is not valid: {e}", path.display()))
}

/// Non-empty value of an environment variable.
pub fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn read_credentials_file(path: &str) -> Result<String, String> {
    let path = resolve_path(path);
    std::fs::read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| format!("failed to read credentials '{}': {e}", path.display()))
}

fn default_config_yaml() -> String {
    r#"# Costume gallery config
#
# Location (default):
#   ~/.costume-gallery/config.yml

# Server
bind: 0.0.0.0:3000

# Data source (choose one)
# spreadsheet_id: 1AbC...
# credentials_file: ~/.costume-gallery/service-account.json
# rows_file: ./rows.json
#
# Without credentials_file the key JSON is read from GOOGLE_SERVICE_ACCOUNT_KEY,
# and SPREADSHEET_ID is used when spreadsheet_id is unset.

# Snapshot
revalidate: 60
refetch_rate: 1
timeout: 10

# Site
site_title: Costume Gallery
# booking_url: https://docs.google.com/forms/d/.../viewform

no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &Path) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("gallery config path '{}' has no parent", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    std::fs::write(path, default_config_yaml())
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}
