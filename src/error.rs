use camino::Utf8PathBuf;
use thiserror::Error;

use crate::rule::Failure;

/// Top-level error of a build session.
///
/// Anything surfacing as a `BobbinError` means the build could not run to
/// completion. Per-task failures are not errors at this level, they are
/// reported through [`TaskResult`](crate::TaskResult) codes instead.
#[derive(Debug, Error)]
pub enum BobbinError {
    #[error("Resource error:\n{0}")]
    Resource(#[from] ResourceError),

    #[error("Error while handling the signature state:\n{0}")]
    State(#[from] StateError),

    #[error("Error while loading options:\n{0}")]
    Options(#[from] OptionsError),

    #[error("Rule '{rule}' failed to create a task for '{path}':\n{error}")]
    Create {
        rule: String,
        path: Utf8PathBuf,
        error: anyhow::Error,
    },

    #[error("Task '{0}' aborted the build:\n{1}")]
    Task(String, anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Resource '{0}' not found")]
    NotFound(Utf8PathBuf),

    #[error("Couldn't access '{0}'.\n{1}")]
    Io(Utf8PathBuf, std::io::Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("Couldn't decode state.\n{0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),

    #[error("Couldn't encode state.\n{0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("Couldn't parse options.\n{0}")]
    Parse(#[from] serde_json::Error),
}

/// Error returned by a [`Rule`](crate::Rule).
///
/// The two variants mirror the two ways a rule can go wrong: a structured
/// failure is recorded against the task and the build carries on, a fatal
/// error aborts the whole build call.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Failure(#[from] Failure),

    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl RuleError {
    /// Shorthand for a structured failure.
    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        RuleError::Failure(Failure::new(code, message))
    }
}

impl From<ResourceError> for RuleError {
    fn from(err: ResourceError) -> Self {
        RuleError::Fatal(err.into())
    }
}

impl From<std::io::Error> for RuleError {
    fn from(err: std::io::Error) -> Self {
        RuleError::Fatal(err.into())
    }
}
