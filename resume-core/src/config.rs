use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;
use url::Url;

use crate::error::ViewerError;
use crate::tracker::DEFAULT_SCROLL_OFFSET;

pub const DEFAULT_DOCUMENT: &str = "resume.pdf";
pub const DEFAULT_DOWNLOAD_NAME: &str = "resume.pdf";
pub const DEFAULT_WEBSITE: &str = "https://sohamdatta.com";
pub const CONFIG_FILE_NAME: &str = "config.toml";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("net", "resume-viewer", "resume-viewer"));

/// Platform directories for config, logs and data, if the platform has them.
pub fn project_dirs() -> Option<&'static ProjectDirs> {
    PROJECT_DIRS.as_ref()
}

/// Location of the pdfium library, handed to the rendering engine once at
/// start-up. `None` means "next to the binary, then the system library".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub library_path: Option<PathBuf>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub document: PathBuf,
    pub download_name: String,
    pub website: String,
    pub print_command: String,
    pub print_args: Vec<String>,
    /// Gap kept above a page when navigating to it.
    pub scroll_offset: f32,
    /// Pixels moved per line scroll (arrow keys, mouse wheel).
    pub scroll_step: f32,
    /// Fraction of the remaining distance a smooth scroll covers per frame.
    pub easing: f32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub frame_interval: Duration,
    pub renderer: RendererConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            document: PathBuf::from(DEFAULT_DOCUMENT),
            download_name: DEFAULT_DOWNLOAD_NAME.to_string(),
            website: DEFAULT_WEBSITE.to_string(),
            print_command: "lp".to_string(),
            print_args: Vec::new(),
            scroll_offset: DEFAULT_SCROLL_OFFSET,
            scroll_step: 48.0,
            easing: 0.35,
            frame_interval: Duration::from_millis(16),
            renderer: RendererConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let raw = fs::read_to_string(path).map_err(|source| ViewerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ViewerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!(?path, "loaded config");
        Ok(config)
    }

    /// Loads the config from the platform config directory, falling back to
    /// defaults when the file does not exist.
    pub fn load_or_default() -> Result<Self, ViewerError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Numeric settings must be finite and the website an http(s) URL.
    pub fn validate(&self) -> Result<(), ViewerError> {
        for (key, value) in [
            ("scroll_offset", self.scroll_offset),
            ("scroll_step", self.scroll_step),
            ("easing", self.easing),
        ] {
            if !value.is_finite() {
                return Err(ViewerError::NonFinite { key, value });
            }
        }
        self.website_url().map(drop)
    }

    pub fn website_url(&self) -> Result<Url, ViewerError> {
        let url = Url::parse(&self.website).map_err(|source| ViewerError::InvalidUrl {
            url: self.website.clone(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(ViewerError::UnsupportedScheme(self.website.clone())),
        }
    }
}
