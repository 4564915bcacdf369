//! The small set of typed, matched-upon error variants: everything else
//! flows through `anyhow::Result` per the teacher's convention.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that should abort startup before the terminal is ever touched,
/// as opposed to the transient watcher/VCS failures that are only logged
/// (§7).
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot watch `{path}`: {source}")]
    Start {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("`{path}` is not a directory")]
    InvalidRoot { path: PathBuf },
}
