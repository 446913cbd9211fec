use serde::{Deserialize, Serialize};

/// Returned by [`crate::JjWorkflow::set_repository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    pub current_change_id: String,
    pub changed_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub current_change_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTaskResult {
    /// Id of the empty working-copy change left checked out.
    pub change_id: String,
    /// Whether the change that was current *before* the call had no
    /// modified files.
    pub was_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub change_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowResult {
    pub change_id: String,
    pub description: String,
    pub diff: String,
}

// ─── Output parsing ───────────────────────────────────────────────────────

/// Paths from `jj status` lines of the form `A path`, `M path` or `D path`.
pub(crate) fn parse_changed_files(status: &str) -> Vec<String> {
    status
        .lines()
        .filter_map(|line| {
            ["A ", "M ", "D "]
                .iter()
                .find_map(|prefix| line.strip_prefix(prefix))
        })
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Marker appended after every change by [`LOG_TEMPLATE`].
pub(crate) const LOG_RECORD_END: &str = "<<jj-driver:end-of-change>>";

/// `jj log` template producing `change_id`, a newline, the description and
/// the record marker for each change.
pub(crate) const LOG_TEMPLATE: &str =
    r#"change_id ++ "\n" ++ description ++ "\n<<jj-driver:end-of-change>>\n""#;

pub(crate) fn parse_log(text: &str) -> Vec<LogEntry> {
    text.split(LOG_RECORD_END)
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.trim().is_empty())
        .map(|record| {
            let (id, description) = record.split_once('\n').unwrap_or((record, ""));
            LogEntry {
                change_id: id.trim().to_string(),
                description: description.trim().to_string(),
            }
        })
        .collect()
}
