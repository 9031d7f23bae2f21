//! Layered configuration for resync.
//!
//! Sources are merged in order, later sources overriding earlier ones:
//! 1. Built-in defaults.
//! 2. The user's config file (`config.toml` in the platform config
//!    directory, e.g. `~/.config/resync/config.toml`), if it exists.
//! 3. An explicitly given file (`.toml`, `.yaml`/`.yml` or `.json`).
//! 4. Environment variables prefixed with `RESYNC_`, with `__` separating
//!    sections from keys (`RESYNC_SYNC__BATCH_SIZE=5`).
//!
//! ```toml
//! [cache]
//! layout = "sharded"    # sharded | file | memory
//! path = "/var/cache/resync"
//!
//! [sync]
//! batch_size = 5
//! batch_delay = 1.0     # seconds
//! show_progress = true
//! show_stats = true
//!
//! [log]
//! level = "info"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use resync_cache::CacheLayout;
use resync_sync::SyncConfig;
use resync_sync::config::duration_secs;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

const APPLICATION: &str = "resync";
const ENV_PREFIX: &str = "RESYNC_";
const ENV_SEPARATOR: &str = "__";
const USER_CONFIG_FILE: &str = "config.toml";
const FILE_CACHE_NAME: &str = "cache.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub sync: SyncDefaults,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub layout: CacheLayout,
    /// Directory (sharded) or file (file layout). Defaults to the platform
    /// cache directory; unused by the memory layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Defaults applied to every sync run; see [`SyncConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncDefaults {
    pub batch_size: NonZeroUsize,
    #[serde(with = "duration_secs")]
    pub batch_delay: Duration,
    pub show_progress: bool,
    pub show_stats: bool,
}
impl Default for SyncDefaults {
    fn default() -> Self {
        let defaults = SyncConfig::default();
        Self {
            batch_size: defaults.batch_size,
            batch_delay: defaults.batch_delay,
            show_progress: defaults.show_progress,
            show_stats: defaults.show_stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log filter; `RUST_LOG` takes precedence when set.
    pub level: String,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}
impl LogConfig {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.level).or_raise(|| ErrorKind::Invalid(format!("unknown log level {:?}", self.level)))
    }
}

impl Config {
    /// Load the configuration from every source (see the
    /// [crate documentation](crate)), plus `explicit` if given.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_sources(Self::user_config_path().as_deref(), explicit)
    }

    /// Like [`load()`](Self::load), with the user's config file given
    /// explicitly instead of looked up.
    pub fn from_sources(user: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = user.filter(|path| path.is_file()) {
            tracing::debug!(path = %path.display(), "merging user configuration");
            figment = figment.merge(Toml::file_exact(path));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::Invalid(format!("config file {} does not exist", path.display())));
            }
            tracing::debug!(path = %path.display(), "merging configuration file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => {
                    exn::bail!(ErrorKind::Invalid(format!("unsupported config format: {}", path.display())));
                },
            };
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR));

        let mut config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.resolve()?;
        Ok(config)
    }

    /// Where the user's config file is looked for.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APPLICATION).map(|dirs| dirs.config_dir().join(USER_CONFIG_FILE))
    }

    fn default_cache_path(layout: CacheLayout) -> Option<PathBuf> {
        let dir = ProjectDirs::from("", "", APPLICATION)?.cache_dir().to_path_buf();
        match layout {
            CacheLayout::Sharded => Some(dir),
            CacheLayout::File => Some(dir.join(FILE_CACHE_NAME)),
            CacheLayout::Memory => None,
        }
    }

    /// Fill in defaults that depend on other settings, then validate.
    fn resolve(&mut self) -> Result<()> {
        if self.cache.path.is_none() {
            self.cache.path = Self::default_cache_path(self.cache.layout);
        }
        match (&self.cache.path, self.cache.layout) {
            (_, CacheLayout::Memory) => {},
            (None, layout) => {
                exn::bail!(ErrorKind::Invalid(format!(
                    "{layout} cache needs a path, and no default cache directory is available"
                )));
            },
            (Some(path), _) if !path.is_absolute() => {
                exn::bail!(ErrorKind::Invalid(format!("cache path {} is not absolute", path.display())));
            },
            (Some(_), _) => {},
        }
        self.log.level_filter()?;
        Ok(())
    }

    /// Configuration for a sync run named `name`, using these defaults.
    pub fn sync_config(&self, name: impl Into<String>) -> SyncConfig {
        let config = SyncConfig::new(name)
            .with_batch_size(self.sync.batch_size)
            .with_batch_delay(self.sync.batch_delay)
            .with_progress(self.sync.show_progress)
            .with_stats(self.sync.show_stats);
        match (&self.cache.path, self.cache.layout) {
            (Some(path), CacheLayout::Sharded | CacheLayout::File) => config.with_cache_location(path),
            _ => config,
        }
    }
}
