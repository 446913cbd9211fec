use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const DTREE_DIR: &str = ".dtree";
pub const CONFIG_FILE: &str = ".dtree/config.yaml";

/// Any of these marks a project root when walking up from the cwd.
pub const ROOT_MARKERS: &[&str] = &[".jj", ".beads", ".git"];

/// Per-user file whose `mcpServers.<name>.env` map may carry API tokens.
pub const CLAUDE_JSON: &str = ".claude.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn claude_json_path(home: &Path) -> PathBuf {
    home.join(CLAUDE_JSON)
}

/// Nearest ancestor of `start` (inclusive) containing one of
/// [`ROOT_MARKERS`].
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|m| dir.join(m).is_dir()))
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_under_dtree_dir() {
        let root = Path::new("/work/project");
        assert_eq!(
            config_path(root),
            PathBuf::from("/work/project/.dtree/config.yaml")
        );
    }

    #[test]
    fn find_root_walks_up_to_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".jj")).unwrap();
        let nested = dir.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_root(&nested).as_deref(), Some(dir.path()));
    }

    #[test]
    fn find_root_ignores_marker_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(".git"), "gitdir: elsewhere").unwrap();
        // A worktree `.git` file is not a marker directory; the walk moves on
        // past the temp dir and must not stop here.
        assert_ne!(find_root(dir.path()).as_deref(), Some(dir.path()));
    }
}
