use anyhow::{Context, Result};
use imageplan_resolver::ImagePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

use crate::ImageLayout;

pub const DEFAULT_BUILD_RELEASE: &str = "5.11";

/// Image attributes read from `state/image.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImageConfig {
    #[serde(default = "default_build_release")]
    pub build_release: String,
    #[serde(default)]
    pub policy: ImagePolicy,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            build_release: default_build_release(),
            policy: ImagePolicy::default(),
        }
    }
}

impl ImageConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse image config")?;
        if config.build_release.trim().is_empty() {
            anyhow::bail!("image config build-release must not be empty");
        }
        Ok(config)
    }

    /// Reads the image config, falling back to defaults when the file does
    /// not exist.
    pub fn load(layout: &ImageLayout) -> Result<Self> {
        let path = layout.config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read image config: {}", path.display()));
            }
        };

        Self::from_toml_str(&raw)
            .with_context(|| format!("failed to load image config: {}", path.display()))
    }

    pub fn save(&self, layout: &ImageLayout) -> Result<()> {
        let path = layout.config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let payload = toml::to_string(self).context("failed to serialize image config")?;
        fs::write(&path, payload)
            .with_context(|| format!("failed to write image config: {}", path.display()))
    }
}

fn default_build_release() -> String {
    DEFAULT_BUILD_RELEASE.to_string()
}
