mod file_config;

pub use file_config::FileConfig;

use anyhow::{bail, Result};
use std::path::PathBuf;

/// Database file used when neither the CLI nor the config file names one.
pub const DEFAULT_DB_PATH: &str = "data/phrasebank.db";

/// Audio tree root used when neither the CLI nor the config file names one.
pub const DEFAULT_AUDIO_ROOT: &str = "audio_files";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub audio_root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path of the SQLite phrase database file.
    pub db_path: PathBuf,
    /// Root of the audio tree, laid out as audio_root/{group_id}/{language}/.
    pub audio_root: PathBuf,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present, built-in defaults fill
    /// whatever is left.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        if db_path.is_dir() {
            bail!("db_path points at a directory: {:?}", db_path);
        }

        let audio_root = file
            .audio_root
            .map(PathBuf::from)
            .or_else(|| cli.audio_root.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIO_ROOT));

        if audio_root.exists() && !audio_root.is_dir() {
            bail!("audio_root is not a directory: {:?}", audio_root);
        }

        Ok(Self {
            db_path,
            audio_root,
        })
    }
}
