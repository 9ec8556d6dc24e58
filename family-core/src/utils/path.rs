use anyhow::{Context, Result, anyhow, bail};
use std::path::{Component, Path, PathBuf};

/// Join a relative, user-supplied `rel` onto `root` and prove the result stays
/// inside the canonicalized root, even through symlinks.
///
/// `root` must exist. The target itself may not exist yet; in that case its
/// parent is canonicalized and the leaf re-attached.
pub fn contained_path(root: &Path, rel: &Path) -> Result<PathBuf> {
    if rel.is_absolute() || rel.components().any(|c| matches!(c, Component::Prefix(_))) {
        bail!("absolute paths are not allowed: {:?}", rel);
    }
    let root = root
        .canonicalize()
        .with_context(|| format!("canonicalize root {:?}", root))?;
    let candidate = root.join(rel);

    let resolved = match candidate.canonicalize() {
        Ok(c) => c,
        Err(_) => {
            let parent = candidate
                .parent()
                .ok_or_else(|| anyhow!("invalid path: no parent"))?;
            let leaf = candidate
                .file_name()
                .ok_or_else(|| anyhow!("invalid path: no file name"))?;
            let canon_parent = parent
                .canonicalize()
                .with_context(|| format!("canonicalize parent {:?}", parent))?;
            canon_parent.join(leaf)
        }
    };

    if !resolved.starts_with(&root) || resolved == root {
        bail!("path escapes root: path={:?} root={:?}", rel, root);
    }
    Ok(resolved)
}
