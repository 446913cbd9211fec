//! In-memory stand-in for the `jj` CLI.
//!
//! [`FakeJj`] interprets the subset of `jj` that [`crate::JjWorkflow`]
//! issues against a simulated change graph, so lifecycle behaviour can be
//! asserted without a real repository. Cloned handles share state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::ProcessError;
use crate::process::{CommandRunner, Invocation, Output};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeChange {
    pub id: String,
    pub description: String,
    pub parent: Option<usize>,
    pub files: Vec<String>,
    pub abandoned: bool,
}

#[derive(Debug, Default)]
pub struct FakeRepo {
    pub path: PathBuf,
    pub changes: Vec<FakeChange>,
    pub current: usize,
    pub bookmarks: Vec<(String, usize)>,
    /// When set, `squash` moves the checkout onto the parent instead of
    /// creating a fresh working copy on top of it.
    pub squash_collapses_checkout: bool,
    /// Every invocation received, rendered with `Display`.
    pub calls: Vec<String>,
    next_id: usize,
}

impl FakeRepo {
    fn add_change(&mut self, parent: Option<usize>) -> usize {
        self.next_id += 1;
        // jj change ids use the reverse-hex alphabet k..z.
        let alphabet = b"zyxwvutsrqponmlk";
        let mut n = self.next_id;
        let mut id = String::new();
        for _ in 0..8 {
            id.push(alphabet[n % 16] as char);
            n /= 16;
        }
        self.changes.push(FakeChange {
            id,
            description: String::new(),
            parent,
            files: Vec::new(),
            abandoned: false,
        });
        self.changes.len() - 1
    }

    pub fn current(&self) -> &FakeChange {
        &self.changes[self.current]
    }

    pub fn parent_of_current(&self) -> Option<&FakeChange> {
        self.current().parent.map(|p| &self.changes[p])
    }

    /// Descriptions from `@` back to the root change.
    pub fn ancestry(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut idx = Some(self.current);
        while let Some(i) = idx {
            out.push(self.changes[i].description.clone());
            idx = self.changes[i].parent;
        }
        out
    }

    fn resolve(&self, rev: &str) -> Option<usize> {
        match rev {
            "@" => Some(self.current),
            "@-" => self.current().parent,
            id => self
                .changes
                .iter()
                .position(|c| !c.abandoned && (c.id == id || c.id.starts_with(id))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeJj {
    repo: Arc<Mutex<FakeRepo>>,
}

impl FakeJj {
    /// A freshly initialised repository at `path`: a root change with an
    /// empty, undescribed working copy on top.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut repo = FakeRepo {
            path: path.into(),
            ..FakeRepo::default()
        };
        let root = repo.add_change(None);
        repo.current = repo.add_change(Some(root));
        Self {
            repo: Arc::new(Mutex::new(repo)),
        }
    }

    pub fn repo(&self) -> MutexGuard<'_, FakeRepo> {
        self.repo.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulate the user editing `path` in the working copy.
    pub fn touch(&self, path: &str) {
        let mut repo = self.repo();
        let current = repo.current;
        repo.changes[current].files.push(path.to_string());
    }

    pub fn describe_current(&self, description: &str) {
        let mut repo = self.repo();
        let current = repo.current;
        repo.changes[current].description = description.to_string();
    }

    fn handle(&self, inv: &Invocation) -> Output {
        let mut repo = self.repo();
        repo.calls.push(inv.to_string());

        let Some(repo_path) = inv.flag_value("--repository") else {
            return Output::failure(1, "Error: There is no jj repo in \".\"");
        };
        if PathBuf::from(repo_path) != repo.path {
            return Output::failure(1, format!("Error: There is no jj repo in \"{repo_path}\""));
        }

        let mut args: Vec<&str> = inv.args.iter().map(String::as_str).collect();
        if let Some(i) = args.iter().position(|a| *a == "--repository") {
            args.drain(i..(i + 2).min(args.len()));
        }
        match args.first().copied() {
            Some("log") => log(&repo, inv),
            Some("status") => status(&repo),
            Some("new") => {
                let parent = repo.current;
                repo.current = repo.add_change(Some(parent));
                Output::ok("")
            }
            Some("describe") => {
                let rev = args.get(1).copied().unwrap_or("@");
                let Some(idx) = repo.resolve(rev) else {
                    return unknown_revision(rev);
                };
                let Some(message) = message_arg(inv) else {
                    return Output::failure(1, "Error: editor not available");
                };
                repo.changes[idx].description = message;
                Output::ok("")
            }
            Some("squash") => squash(&mut repo, inv),
            Some("edit") => {
                let rev = args.get(1).copied().unwrap_or("@");
                let Some(idx) = repo.resolve(rev) else {
                    return unknown_revision(rev);
                };
                let old = repo.current;
                if repo.changes[old].files.is_empty() && repo.changes[old].description.is_empty()
                {
                    repo.changes[old].abandoned = true;
                }
                repo.current = idx;
                Output::ok("")
            }
            Some("diff") => {
                let rev = inv.flag_value("-r").unwrap_or("@");
                let Some(idx) = repo.resolve(rev) else {
                    return unknown_revision(rev);
                };
                let diff: String = repo.changes[idx]
                    .files
                    .iter()
                    .map(|f| format!("Modified regular file {f}:\n"))
                    .collect();
                Output::ok(diff)
            }
            Some("bookmark") if args.get(1) == Some(&"create") => {
                let name = match args.iter().position(|a| *a == "--") {
                    Some(i) => args.get(i + 1).copied(),
                    None => args.get(2).copied(),
                }
                .unwrap_or_default();
                if name.is_empty() || (!args.contains(&"--") && name.starts_with('-')) {
                    return Output::failure(2, format!("error: unexpected argument '{name}' found"));
                }
                let name = name.to_string();
                if repo.bookmarks.iter().any(|(n, _)| *n == name) {
                    return Output::failure(1, format!("Error: Bookmark already exists: {name}"));
                }
                let target = repo.current;
                repo.bookmarks.push((name, target));
                Output::ok("")
            }
            other => Output::failure(2, format!("error: unrecognized subcommand {other:?}")),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeJj {
    async fn output(&self, invocation: &Invocation) -> Result<Output, ProcessError> {
        Ok(self.handle(invocation))
    }
}

fn unknown_revision(rev: &str) -> Output {
    Output::failure(1, format!("Error: Revision `{rev}` doesn't exist"))
}

fn message_arg(inv: &Invocation) -> Option<String> {
    inv.args
        .iter()
        .find_map(|a| a.strip_prefix("--message=").map(str::to_owned))
        .or_else(|| inv.flag_value("-m").map(str::to_owned))
}

// jj stores descriptions with a trailing newline.
fn stored(description: &str) -> String {
    if description.is_empty() {
        String::new()
    } else {
        format!("{description}\n")
    }
}

fn log(repo: &FakeRepo, inv: &Invocation) -> Output {
    let rev = inv.flag_value("-r").unwrap_or("@");
    let template = inv.flag_value("-T").unwrap_or("");

    if rev == "::@" {
        let limit: usize = inv
            .flag_value("-n")
            .and_then(|n| n.parse().ok())
            .unwrap_or(usize::MAX);
        let mut out = String::new();
        let mut idx = Some(repo.current);
        let mut count = 0;
        while let (Some(i), true) = (idx, count < limit) {
            let change = &repo.changes[i];
            out.push_str(&format!(
                "{}\n{}\n{}\n",
                change.id,
                stored(&change.description),
                crate::types::LOG_RECORD_END
            ));
            idx = change.parent;
            count += 1;
        }
        return Output::ok(out);
    }

    let Some(idx) = repo.resolve(rev) else {
        return unknown_revision(rev);
    };
    let change = &repo.changes[idx];
    match template {
        "change_id" => Output::ok(change.id.clone()),
        "description" => Output::ok(stored(&change.description)),
        other => Output::failure(1, format!("Error: Failed to parse template: {other}")),
    }
}

fn status(repo: &FakeRepo) -> Output {
    let current = repo.current();
    let mut out = String::new();
    if current.files.is_empty() {
        out.push_str("The working copy has no changes.\n");
    } else {
        out.push_str("Working copy changes:\n");
        for f in &current.files {
            out.push_str(&format!("M {f}\n"));
        }
    }
    out.push_str(&format!("Working copy : {} (fake)\n", current.id));
    Output::ok(out)
}

fn squash(repo: &mut FakeRepo, inv: &Invocation) -> Output {
    let Some(message) = message_arg(inv) else {
        return Output::failure(1, "Error: editor not available");
    };
    let current = repo.current;
    let Some(parent) = repo.changes[current].parent else {
        return Output::failure(1, "Error: Cannot squash the root change");
    };

    let files = std::mem::take(&mut repo.changes[current].files);
    repo.changes[parent].files.extend(files);
    repo.changes[parent].description = message;
    repo.changes[current].abandoned = true;

    repo.current = if repo.squash_collapses_checkout {
        parent
    } else {
        repo.add_change(Some(parent))
    };
    Output::ok("")
}
