use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::project::Category;

/// Why a single stage did not complete cleanly.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The tool ran but reported failure; its stderr is kept for the report.
    #[error("`{command}` exited with status {code:?}: {stderr}")]
    Tool {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Finalize was asked to publish a file set no earlier stage produced.
    #[error("nothing to finalize: no earlier stage produced new files")]
    NoProgress,

    #[error("expected metadata file {} was not produced", .0.display())]
    MissingMetadata(PathBuf),

    #[error("could not read the extent of {}: {}", .path.display(), .reason)]
    Extent { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{}: {}", .path.display(), .source)]
    Osm {
        path: PathBuf,
        #[source]
        source: osmdata::OsmError,
    },

    #[error("{} files failed: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<StageError>),
}

impl StageError {
    /// Collapse per-file errors into one stage result.
    pub fn collect(mut errors: Vec<StageError>) -> Result<(), StageError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(StageError::Multiple(errors)),
        }
    }
}

fn join_errors(errors: &[StageError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A stage error tagged with where it happened.
#[derive(Debug)]
pub struct StageFailure {
    pub pipeline: Category,
    pub stage: &'static str,
    pub error: StageError,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.pipeline, self.stage, self.error)
    }
}
