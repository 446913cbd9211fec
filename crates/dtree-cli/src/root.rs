use std::path::{Path, PathBuf};

/// Resolve the project root directory.
///
/// Priority:
/// 1. `--root` flag / `DTREE_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of `cwd` containing `.jj/`, `.beads/` or `.git/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    dtree_core::paths::find_root(&cwd).unwrap_or(cwd)
}
