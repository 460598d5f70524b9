mod file_config;

pub use file_config::{FileConfig, SessionConfig};

use crate::codec::Codec;
use crate::session::SessionSettings;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CATALOG_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_RIPPER_URL: &str = "ws://127.0.0.1:4001/rip";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub output_dir: PathBuf,
    pub format: Codec,
    pub catalog_url: String,
    pub catalog_api_key: Option<String>,
    pub catalog_timeout_sec: u64,
    pub ripper_url: String,
    pub page_size: u32,
    pub item_cap: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            format: Codec::default(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_api_key: None,
            catalog_timeout_sec: 30,
            ripper_url: DEFAULT_RIPPER_URL.to_string(),
            page_size: 50,
            item_cap: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub output_dir: PathBuf,
    pub format: Codec,
    pub catalog_url: String,
    pub catalog_api_key: Option<String>,
    pub catalog_timeout_sec: u64,
    pub ripper_url: String,
    pub page_size: u32,
    pub item_cap: usize,

    // Session timing (with defaults)
    pub session: SessionTiming,
}

#[derive(Debug, Clone)]
pub struct SessionTiming {
    pub debounce_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            cooldown_ms: 1500,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let output_dir = file
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.output_dir.clone());

        // The output directory is created on demand, but an existing
        // non-directory there is a hard error.
        if output_dir.exists() && !output_dir.is_dir() {
            bail!("output_dir is not a directory: {:?}", output_dir);
        }

        let format = match file.format {
            Some(raw) => match Codec::from_str(&raw) {
                Some(format) => format,
                None => bail!("Unknown format in config file: {}", raw),
            },
            None => cli.format,
        };

        let catalog_url = file
            .catalog_url
            .unwrap_or_else(|| cli.catalog_url.clone());
        let catalog_api_key = file
            .catalog_api_key
            .or_else(|| cli.catalog_api_key.clone());
        let catalog_timeout_sec = file.catalog_timeout_sec.unwrap_or(cli.catalog_timeout_sec);

        let ripper_url = file.ripper_url.unwrap_or_else(|| cli.ripper_url.clone());
        if !ripper_url.starts_with("ws://") && !ripper_url.starts_with("wss://") {
            bail!("ripper_url must use the ws or wss scheme: {}", ripper_url);
        }

        let page_size = file.page_size.unwrap_or(cli.page_size);
        if !(1..=100).contains(&page_size) {
            bail!("page_size must be between 1 and 100, got {}", page_size);
        }

        let item_cap = file.item_cap.unwrap_or(cli.item_cap);

        // Session timing - merge file config with defaults
        let session_file = file.session.unwrap_or_default();
        let session = SessionTiming {
            debounce_ms: session_file.debounce_ms.unwrap_or(500),
            cooldown_ms: session_file.cooldown_ms.unwrap_or(1500),
        };

        Ok(Self {
            output_dir,
            format,
            catalog_url,
            catalog_api_key,
            catalog_timeout_sec,
            ripper_url,
            page_size,
            item_cap,
            session,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            debounce: Duration::from_millis(self.session.debounce_ms),
            cooldown: Duration::from_millis(self.session.cooldown_ms),
            default_format: self.format,
        }
    }
}
