// family-core/src/commands/init.rs

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::CoreConfig;

#[derive(Debug, Clone)]
pub struct InitReport {
    pub root: PathBuf,
    pub config: CoreConfig,
    pub created: Vec<String>,
    pub existed: Vec<String>,
}

// ---------- single global init gate ----------

static INIT: OnceCell<InitReport> = OnceCell::new();

/// Idempotent initializer for the process-wide default root. Safe to call often.
pub fn ensure_initialized_once() -> Result<&'static InitReport> {
    INIT.get_or_try_init(|| ensure_initialized(&default_root()))
}

/// Resolve the default root. Allow override via FAMILY_ROOT (tests/deployments).
pub fn default_root() -> PathBuf {
    std::env::var_os("FAMILY_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".family"))
}

/// Ensure `root` holds the directory layout and a config file (idempotent).
pub fn ensure_initialized(root: &Path) -> Result<InitReport> {
    let root = root.to_path_buf();
    let mut created = Vec::new();
    let mut existed = Vec::new();

    ensure_dir(&root, "", &mut created, &mut existed)?;
    ensure_dir(&root, "store", &mut created, &mut existed)?;
    ensure_dir(&root, "snapshots", &mut created, &mut existed)?;
    ensure_dir(&root, "logbook", &mut created, &mut existed)?;

    ensure_file(
        &root,
        "config.toml",
        DEFAULT_CONFIG_TOML,
        &mut created,
        &mut existed,
    )?;

    let config = CoreConfig::load(&root)?;
    // Configured locations may point outside the default layout.
    fs::create_dir_all(&config.snapshots.dir)
        .with_context(|| format!("create_dir_all({:?})", config.snapshots.dir))?;

    tracing::debug!(root = %root.display(), ?created, "workspace ready");
    Ok(InitReport {
        root,
        config,
        created,
        existed,
    })
}

fn ensure_dir(
    base: &Path,
    rel: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = if rel.is_empty() { base.to_path_buf() } else { base.join(rel) };
    let label = if rel.is_empty() { ".".to_string() } else { rel.to_string() };
    if p.exists() {
        existed.push(label);
        return Ok(());
    }
    fs::create_dir_all(&p).with_context(|| format!("create_dir_all({:?})", p))?;
    created.push(label);
    Ok(())
}

fn ensure_file(
    base: &Path,
    rel_file: &str,
    content_if_absent: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = base.join(rel_file);
    if p.exists() {
        existed.push(rel_file.to_string());
        return Ok(());
    }
    let tmp = p.with_extension("tmp");
    {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .with_context(|| format!("open temp file {:?}", tmp))?;
        f.write_all(content_if_absent.as_bytes())?;
        f.flush()?;
    }
    fs::rename(&tmp, &p).with_context(|| format!("rename {:?} -> {:?}", tmp, p))?;
    created.push(rel_file.to_string());
    Ok(())
}

// ---------- defaults ----------

const DEFAULT_CONFIG_TOML: &str = r#"[system]
name = "family-tree"
version = "0.1.0"

[store]
path = "store/family.db"

[snapshots]
dir = "snapshots"

[ascendancy]
# "traverse" walks parent links in memory and never writes to the store.
# "prune_and_restore" strips descendants from the live graph, then restores it.
strategy = "traverse"

[logbook]
enabled = true
path = "logbook/actions.jsonl"
"#;
