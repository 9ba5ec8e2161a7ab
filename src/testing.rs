//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::RuleError;
use crate::fs::{MemoryFileSystem, Resource};
use crate::project::{Context, Project};
use crate::rule::Rule;
use crate::task::{Task, TaskBuilder};

/// Project on an empty in-memory file system.
pub(crate) fn fixture() -> (Arc<MemoryFileSystem>, Project) {
    let fs = Arc::new(MemoryFileSystem::new());
    let project = Project::new(fs.clone());
    (fs, project)
}

/// Copies its input into the build directory under a new extension and
/// counts how often it ran.
pub(crate) struct CopyRule {
    ext: String,
    runs: Arc<AtomicUsize>,
}

impl CopyRule {
    pub(crate) fn new(ext: &str) -> Self {
        Self {
            ext: ext.to_string(),
            runs: Arc::default(),
        }
    }

    pub(crate) fn counter(&self) -> Arc<AtomicUsize> {
        self.runs.clone()
    }
}

impl Rule for CopyRule {
    fn name(&self) -> &str {
        "copy"
    }

    fn create(&self, _: &mut Context<'_>, input: Resource) -> Result<TaskBuilder, RuleError> {
        let output = input.output().change_ext(&self.ext);
        Ok(Task::builder().input(input).output(output))
    }

    fn build(&self, _: &mut Context<'_>, task: &Task) -> Result<(), RuleError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        for (input, output) in task.inputs().iter().zip(task.outputs()) {
            output.set_content(input.content()?)?;
        }
        Ok(())
    }
}
