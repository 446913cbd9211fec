//! `jj-driver`: async driver for the `jj` CLI.
//!
//! The crate has two layers:
//!
//! ```text
//! JjWorkflow      ← start / checkpoint / finish conventions over the change graph
//!     │
//!     ▼
//! CommandRunner   ← every subprocess goes through this seam
//!     │              (TokioRunner in production, fakes in tests)
//!     ▼
//! jj log / status / new / describe / squash / edit / diff / bookmark
//! ```
//!
//! `jj` itself has no notion of tasks. A task is a described change with an
//! empty working copy on top of it:
//!
//! ```text
//! start_task("Add parser")     checkpoint("lexer done")     finish_task()
//!
//!   @  (empty)                   @  (empty)                   @  (empty)
//!   ○  Add parser                ○  Add parser                ○  Add parser
//!                                   - lexer done                 - lexer done
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use jj_driver::JjWorkflow;
//!
//! let mut jj = JjWorkflow::new();
//! jj.set_repository("/path/to/repo").await?;
//! jj.start_task("Implement showTask API").await?;
//! // ...edit files...
//! jj.checkpoint("added JSON parsing").await?;
//! jj.finish_task().await?;
//! ```

pub mod error;
pub mod process;
pub mod types;
pub mod workflow;

#[cfg(any(test, feature = "testing"))]
pub mod testing;


pub use error::{JjError, ProcessError};
pub use process::{CommandRunner, Invocation, Output, TokioRunner};
pub use types::{LogEntry, RepositoryStatus, ShowResult, StartTaskResult, WorkflowContext};
pub use workflow::JjWorkflow;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, JjError>;
