use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub output_dir: Option<String>,
    pub format: Option<String>,
    pub catalog_url: Option<String>,
    pub catalog_api_key: Option<String>,
    pub catalog_timeout_sec: Option<u64>,
    pub ripper_url: Option<String>,
    pub page_size: Option<u32>,
    pub item_cap: Option<usize>,

    // Feature configs
    pub session: Option<SessionConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub debounce_ms: Option<u64>,
    pub cooldown_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
