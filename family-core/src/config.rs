use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub snapshots: SnapshotsConfig,
    #[serde(default)]
    pub ascendancy: AscendancyConfig,
    #[serde(default)]
    pub logbook: LogbookConfig,
}

impl CoreConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str::<CoreConfig>(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!(
                "No config file found at {}. Using CoreConfig::default().",
                path.display()
            );
            CoreConfig::default()
        };
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.store.path = absolutize(root, &self.store.path);
        self.snapshots.dir = absolutize(root, &self.snapshots.dir);
        self.logbook.path = absolutize(root, &self.logbook.path);
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            store: StoreConfig::default(),
            snapshots: SnapshotsConfig::default(),
            ascendancy: AscendancyConfig::default(),
            logbook: LogbookConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "SystemConfig::default_name")]
    pub name: String,
    #[serde(default = "SystemConfig::default_version")]
    pub version: String,
}

impl SystemConfig {
    fn default_name() -> String {
        "family-tree".to_string()
    }

    fn default_version() -> String {
        "0.1.0".to_string()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            version: Self::default_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_path")]
    pub path: PathBuf,
}

impl StoreConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("store/family.db")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotsConfig {
    #[serde(default = "SnapshotsConfig::default_dir")]
    pub dir: PathBuf,
}

impl SnapshotsConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from("snapshots")
    }
}

impl Default for SnapshotsConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
        }
    }
}

// -------------------------------------------------------------------------
// Ascendancy strategy (used by services::ascendancy)
// -------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AscendancyStrategy {
    #[default]
    Traverse, // in-memory walk, no store mutation
    PruneAndRestore, // snapshot, strip leaves, read, restore
}

impl AscendancyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AscendancyStrategy::Traverse => "traverse",
            AscendancyStrategy::PruneAndRestore => "prune_and_restore",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AscendancyConfig {
    #[serde(default)]
    pub strategy: AscendancyStrategy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    #[serde(default = "LogbookConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "LogbookConfig::default_path")]
    pub path: PathBuf,
}

impl LogbookConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_path() -> PathBuf {
        PathBuf::from("logbook/actions.jsonl")
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            path: Self::default_path(),
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults_and_resolves_paths() {
        let root = Path::new("/srv/family");
        let mut cfg: CoreConfig = toml::from_str(
            r#"
            [ascendancy]
            strategy = "prune_and_restore"

            [snapshots]
            dir = "/var/tmp/dumps"
            "#,
        )
        .unwrap();
        cfg.resolve_paths(root);

        assert_eq!(cfg.ascendancy.strategy, AscendancyStrategy::PruneAndRestore);
        assert_eq!(cfg.snapshots.dir, PathBuf::from("/var/tmp/dumps"));
        assert_eq!(cfg.store.path, root.join("store/family.db"));
        assert!(cfg.logbook.enabled);
    }
}
