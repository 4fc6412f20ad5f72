//! Project configuration stored in `.tasklist/config.toml`.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

const CONFIG_DIR: &str = ".tasklist";
const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "tasklist";
/// File name of the database when no path is configured.
pub const DEFAULT_DATABASE_FILE: &str = "todoapp_db.sqlite3";
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Top-level project configuration loaded from `.tasklist/config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    /// Where the task table lives.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Presentation settings.
    #[serde(default)]
    pub ui: UiConfig,
    /// Directory the configuration was discovered in.
    #[serde(skip)]
    root: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load configuration from `start` or the nearest ancestor holding a `.tasklist` directory.
    ///
    /// Returns the defaults when no configuration file exists.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let start = start.as_ref();
        for dir in start.ancestors() {
            if dir.join(CONFIG_DIR).join(CONFIG_FILE).is_file() {
                return Self::from_dir(dir);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from a known project directory.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config_path = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config.validate()?;
        config.root = Some(dir.to_path_buf());
        Ok(config)
    }

    /// Project directory the configuration came from, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Location of the task database.
    ///
    /// Relative paths are resolved against the project directory. Without a
    /// configured path the platform data directory is used.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        let base = self.root.as_deref().unwrap_or_else(|| Path::new("."));
        self.database.resolve(base)
    }

    fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.ui.validate()
    }
}

/// Database location block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Configuration pointing at an explicit database file.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self
            .path
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            bail!("database.path must not be empty");
        }
        Ok(())
    }

    /// Resolve the database file relative to `base`.
    #[must_use]
    pub fn resolve(&self, base: &Path) -> PathBuf {
        if let Some(path) = &self.path {
            return if path.is_absolute() {
                path.clone()
            } else {
                base.join(path)
            };
        }
        dirs::data_dir().map_or_else(
            || base.join(CONFIG_DIR).join(DEFAULT_DATABASE_FILE),
            |dir| dir.join(APP_DIR).join(DEFAULT_DATABASE_FILE),
        )
    }
}

/// Presentation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_retry_delay_ms")]
    retry_delay_ms: u64,
}

const fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl UiConfig {
    /// Delay before the last query is reissued after an error.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.retry_delay_ms == 0 || self.retry_delay_ms > MAX_RETRY_DELAY_MS {
            bail!(
                "ui.retry_delay_ms must be between 1 and {MAX_RETRY_DELAY_MS}, got {}",
                self.retry_delay_ms
            );
        }
        Ok(())
    }
}
