use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::GenerationError;
use crate::services::image::AspectRatio;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_text_model")]
    pub text_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_assets")]
    pub assets_folder: String,

    /// When set, static documents are fetched over HTTP from here instead of
    /// being read from `assets_folder`.
    #[serde(default)]
    pub assets_base_url: Option<String>,

    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default = "default_state_file")]
    pub state_file: String,

    #[serde(default)]
    pub unattended: bool,

    #[serde(default = "default_aspect_ratio")]
    pub cover_aspect_ratio: AspectRatio,

    #[serde(default = "default_initial_cover_count")]
    pub initial_cover_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            text_model: default_text_model(),
            image_model: default_image_model(),
            assets_folder: default_assets(),
            assets_base_url: None,
            output_folder: default_output(),
            state_file: default_state_file(),
            unattended: false,
            cover_aspect_ratio: default_aspect_ratio(),
            initial_cover_count: default_initial_cover_count(),
        }
    }
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_image_model() -> String {
    "imagen-4.0-ultra-generate-preview-06-06".to_string()
}
fn default_assets() -> String {
    "assets".to_string()
}
fn default_output() -> String {
    "output".to_string()
}
fn default_state_file() -> String {
    "song.yml".to_string()
}
fn default_aspect_ratio() -> AspectRatio {
    AspectRatio::Portrait9x16
}
fn default_initial_cover_count() -> usize {
    2
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_yaml_ng::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            log::warn!("{} not found, using defaults", path.display());
            Config::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api_key = Some(key);
            }
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.output_folder)?;
        Ok(())
    }

    /// The configured key, or the configuration error raised before any call.
    pub fn require_api_key(&self) -> Result<&str, GenerationError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)
    }
}
