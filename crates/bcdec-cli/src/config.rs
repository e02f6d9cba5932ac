//! Configuration file parsing for bcdec.toml.

use bcdec_reader::DecodeOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Decoder settings
    #[serde(default)]
    pub decode: DecodeConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Decoder configuration.
#[derive(Debug, Deserialize)]
pub struct DecodeConfig {
    /// Accept containers with FFI constants
    #[serde(default = "default_true")]
    pub ffi: bool,

    /// Accept prototypes that carry debug info
    #[serde(default)]
    pub allow_debug_info: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            ffi: true,
            allow_debug_info: false,
        }
    }
}

impl DecodeConfig {
    /// Decoder options described by this section
    pub fn options(&self) -> DecodeOptions {
        DecodeOptions::new()
            .ffi(self.ffi)
            .allow_debug_info(self.allow_debug_info)
    }
}

/// Output configuration.
#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Indent JSON listings
    #[serde(default)]
    pub pretty: bool,
}

fn default_true() -> bool {
    true
}

/// Load configuration from a file or search for the default config file.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path
        && !path.exists()
    {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    let config_path = path.map(PathBuf::from).or_else(find_config_file);

    match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Search for bcdec.toml in the current directory and parent directories.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;

    let mut dir = Some(cwd.as_path());
    while let Some(current) = dir {
        let path = current.join("bcdec.toml");
        if path.exists() {
            return Some(path);
        }
        dir = current.parent();
    }

    None
}
