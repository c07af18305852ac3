//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides passed to [`ConfigLoader::merge`]
//! 3. Profile-specific config file (`ferrogram.{profile}.toml`)
//! 4. Main config file (`ferrogram.toml` or `config.toml`)
//! 5. Environment variables (`FERROGRAM_*`)
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `FERROGRAM_` prefix with `__`
//! as separator:
//!
//! - `FERROGRAM_BOT__TOKEN=123:abc` → `bot.token = "123:abc"`
//! - `FERROGRAM_POLLING__MODE=sequential` → `polling.mode = "sequential"`
//! - `FERROGRAM_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! `FERROGRAM_PROFILE` selects the profile and is not mapped.
//!
//! # Example
//!
//! ```rust,ignore
//! use ferrogram_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./config/ferrogram.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::FerrogramConfig;

const ENV_PREFIX: &str = "FERROGRAM_";
const PROFILE_VAR: &str = "FERROGRAM_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `FERROGRAM_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    ///
    /// Without explicit paths, the current directory and the user config
    /// directory (`~/.config/ferrogram` on Linux) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration values programmatically, above the defaults.
    pub fn merge(mut self, config: FerrogramConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<FerrogramConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: FerrogramConfig = figment.extract()?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            polling_mode = ?config.polling.mode,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(FerrogramConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment)
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("ferrogram"));
        }
        paths
    }

    /// Takes the first directory holding a base file. A profile-specific
    /// file next to it is merged underneath.
    #[cfg(feature = "toml-config")]
    fn load_config_files(&self, figment: Figment) -> Figment {
        for search_path in self.resolve_search_paths() {
            for stem in ["ferrogram", "config"] {
                let base_path = search_path.join(format!("{stem}.toml"));
                if !base_path.exists() {
                    continue;
                }

                let mut figment = figment;
                let profile_path =
                    search_path.join(format!("{stem}.{}.toml", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = figment.merge(Toml::file(&profile_path));
                }

                info!(path = %base_path.display(), "Loading configuration file");
                return figment.merge(Toml::file(&base_path));
            }
        }

        warn!("No configuration file found, using defaults");
        figment
    }

    #[cfg(not(feature = "toml-config"))]
    fn load_config_files(&self, figment: Figment) -> Figment {
        trace!(
            paths = self.resolve_search_paths().len(),
            "File configuration disabled, skipping search"
        );
        figment
    }
}

/// Loads configuration from the default locations and the environment.
pub fn load_config() -> ConfigResult<FerrogramConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path` and the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<FerrogramConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
