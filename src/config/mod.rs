use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Tasknotes";
const APP_NAME: &str = "tasknotes";

pub const CONFIG_ENV: &str = "TASKNOTES_CONFIG";
pub const DATA_ENV: &str = "TASKNOTES_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load();
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub tasks_file: PathBuf,
    pub notes_file: PathBuf,
    pub database_path: PathBuf,
    pub log_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));

        let mut paths = Self::under_data_root(config_dir, config_file, data_root);
        paths.log_dir = state_dir.join("logs");
        paths.state_dir = state_dir;
        Ok(paths)
    }

    /// Lays out every data file below `data_root`.
    pub fn under_data_root(config_dir: PathBuf, config_file: PathBuf, data_root: PathBuf) -> Self {
        let state_dir = data_root.join("state");
        Self {
            config_dir,
            config_file,
            tasks_file: data_root.join("todos.json"),
            notes_file: data_root.join("stickynotes.json"),
            database_path: data_root.join("tasknotes.db"),
            log_dir: state_dir.join("logs"),
            state_dir,
            data_dir: data_root,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.log_dir,
            &self.state_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub auto_save: AutoSaveConfig,
    pub storage: StorageOptions,
    pub windows: WindowOptions,
}

impl AppConfig {
    fn post_load(&mut self) {
        if self.auto_save.note_debounce_ms == 0 {
            tracing::warn!("auto_save.note_debounce_ms = 0 saves on every keystroke");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Quiet period after the last note edit before the note set is written.
    pub note_debounce_ms: u64,
    /// How long the "saved" marker stays on a note after a write.
    pub status_clear_ms: u64,
    /// Write snapshots on a worker thread instead of the interactive loop.
    pub background_io: bool,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            note_debounce_ms: 1000,
            status_clear_ms: 2000,
            background_io: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    pub backend: StorageBackend,
    pub wal_autocheckpoint: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            wal_autocheckpoint: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    /// Reopen a view for every saved note at startup.
    pub restore_on_start: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            restore_on_start: true,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ConfigPaths;
    use tempfile::TempDir;

    pub fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        let config_dir = base.join("config");
        ConfigPaths::under_data_root(
            config_dir.clone(),
            config_dir.join("config.toml"),
            base.join("data"),
        )
    }
}
