use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;

use crate::engine::DecodeOptions;
use crate::protocol::{ARCHIVE_EXTENSION, OUTPUT_SUFFIX, PATH_SEPARATOR, READ_CHUNK_SIZE};

pub const DEFAULT_CONFIG_FILE: &str = "hufunzip.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub extension: String,
    pub require_extension: bool,
    pub output_suffix: String,
    pub path_separator: u8,
    pub confine_paths: bool,
    pub create_destination: bool,
    pub read_buffer_size: usize,
    pub log_filter: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            extension: ARCHIVE_EXTENSION.to_string(),
            require_extension: true,
            output_suffix: OUTPUT_SUFFIX.to_string(),
            path_separator: PATH_SEPARATOR,
            confine_paths: true,
            create_destination: true,
            read_buffer_size: READ_CHUNK_SIZE,
            log_filter: "hufunzip=info".to_string(),
        }
    }
}

impl DecoderConfig {
    /// Read `config_path` (or `hufunzip.toml`) when present, defaults otherwise
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = config_path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            let config: DecoderConfig = toml::from_str(&content)?;
            tracing::debug!("Loaded config from {:?}", config_file);
            Ok(config)
        } else if config_path.is_some() {
            anyhow::bail!("config file {:?} not found", config_file)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            path_separator: self.path_separator,
            confine_paths: self.confine_paths,
            read_buffer_size: self.read_buffer_size.max(1),
            ..DecodeOptions::default()
        }
    }
}
