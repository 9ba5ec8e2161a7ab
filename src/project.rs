//! The orchestrator.
//!
//! A [`Project`] owns everything a build session needs: the file system, the
//! rule registry, the input list and the options. Calling
//! [`Project::build`] turns every input into a [`Task`], schedules the tasks
//! against the persisted signature state and returns a [`TaskResult`] for
//! each task that actually had to run.

use std::sync::Arc;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::error::{BobbinError, RuleError};
use crate::fs::{FileSystem, Resource, extension_of, normalize};
use crate::options::Options;
use crate::rule::{Registry, Rule};
use crate::scheduler;
use crate::state::State;
use crate::task::{Task, TaskResult};
use crate::utils::as_overhead;

/// Name of the signature state file inside the build directory.
pub const STATE_FILE: &str = "state";

/// Default build directory, relative to the file system root.
pub const BUILD_DIRECTORY: &str = "build";

pub struct Project {
    fs: Arc<dyn FileSystem>,
    build_dir: Arc<Utf8PathBuf>,
    registry: Registry,
    inputs: Vec<Utf8PathBuf>,
    options: Options,
    /// Tasks of the most recent build session.
    tasks: Vec<Arc<Task>>,
}

impl Project {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_build_directory(fs, BUILD_DIRECTORY)
    }

    pub fn with_build_directory(fs: Arc<dyn FileSystem>, build_dir: impl AsRef<str>) -> Self {
        Self {
            fs,
            build_dir: Arc::new(normalize(build_dir)),
            registry: Registry::new(),
            inputs: Vec::new(),
            options: Options::new(),
            tasks: Vec::new(),
        }
    }

    pub fn build_directory(&self) -> &Utf8Path {
        &self.build_dir
    }

    /// Bind `rule` to every input with extension `ext`.
    ///
    /// ```rust,ignore
    /// project
    ///     .register(".png", TextureRule)
    ///     .register(".json", ManifestRule::default());
    /// ```
    pub fn register<R>(&mut self, ext: impl Into<String>, rule: R) -> &mut Self
    where
        R: Rule + 'static,
    {
        self.registry.register(ext, Arc::new(rule));
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Replace the list of files to build.
    pub fn set_inputs<I, P>(&mut self, inputs: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        self.inputs = inputs.into_iter().map(normalize).collect();
    }

    pub fn inputs(&self) -> &[Utf8PathBuf] {
        &self.inputs
    }

    /// Replace the input list with every file under `root` that some rule
    /// can handle. Directories whose path ends with one of `skip_dirs` are
    /// not descended into.
    pub fn scan(&mut self, root: impl AsRef<str>, skip_dirs: &[&str]) -> Result<(), BobbinError> {
        let start = Instant::now();
        let root = normalize(root);

        let skip_dirs: Vec<Utf8PathBuf> = skip_dirs.iter().map(normalize).collect();

        let inputs: Vec<_> = self
            .fs
            .walk(&root)?
            .into_iter()
            .filter(|path| !is_skipped(path, &skip_dirs))
            .filter(|path| extension_of(path).is_some_and(|ext| self.registry.contains(&ext)))
            .collect();

        info!(
            root = %root,
            inputs = inputs.len(),
            "scanned inputs {}",
            as_overhead(start)
        );

        self.inputs = inputs;
        Ok(())
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.set(key, value);
    }

    /// Value of option `key`, or `default` if it was never set.
    pub fn option<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options.get(key, default)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Merge options from a JSON file into the current options.
    pub fn load_options(&mut self, path: impl AsRef<str>) -> Result<(), BobbinError> {
        let options = Options::from_resource(&self.resource(path))?;
        self.options.extend(options);
        Ok(())
    }

    /// Resolve `path` to a resource on this project's file system.
    pub fn resource(&self, path: impl AsRef<str>) -> Resource {
        Resource::new(self.fs.clone(), self.build_dir.clone(), path)
    }

    /// Tasks created during the most recent build.
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    /// Run a full build session.
    ///
    /// The returned list holds one entry per attempted task, in the order the
    /// tasks were attempted; up-to-date tasks are not listed. An `Err` means
    /// the build could not run at all, in which case the signature state is
    /// left as it was.
    pub fn build(&mut self) -> Result<Vec<TaskResult>, BobbinError> {
        let start = Instant::now();
        let state_resource = self.resource(self.build_dir.join(STATE_FILE));
        let mut state = State::load(&state_resource)?;

        let mut tasks = Vec::new();
        let results = {
            let mut context = Context {
                project: self,
                tasks: &mut tasks,
            };

            context.create_tasks()?;
            scheduler::run_tasks(&mut context, &mut state)?
        };

        state.save(&state_resource)?;

        let failed = results.iter().filter(|result| !result.is_ok()).count();
        info!(
            tasks = tasks.len(),
            attempted = results.len(),
            failed,
            "build finished {}",
            as_overhead(start)
        );

        self.tasks = tasks;
        Ok(results)
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("build_dir", &self.build_dir)
            .field("registry", &self.registry)
            .field("inputs", &self.inputs)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn is_skipped(path: &Utf8Path, skip_dirs: &[Utf8PathBuf]) -> bool {
    path.ancestors()
        .skip(1)
        .filter(|dir| !dir.as_str().is_empty())
        .any(|dir| skip_dirs.iter().any(|skip| dir.ends_with(skip)))
}

/// View of the running build session handed to rules.
///
/// Through the context a rule can read options, resolve resources and
/// request tasks for resources it produces itself. Tasks requested this way
/// are appended to the live task list and picked up by the scheduler in the
/// same session.
pub struct Context<'a> {
    pub(crate) project: &'a Project,
    pub(crate) tasks: &'a mut Vec<Arc<Task>>,
}

impl<'a> Context<'a> {
    pub fn option<'b>(&'b self, key: &str, default: &'b str) -> &'b str {
        self.project.option(key, default)
    }

    pub fn options(&self) -> &Options {
        self.project.options()
    }

    pub fn resource(&self, path: impl AsRef<str>) -> Resource {
        self.project.resource(path)
    }

    pub fn build_directory(&self) -> &Utf8Path {
        self.project.build_directory()
    }

    /// Tasks known to the session so far.
    pub fn tasks(&self) -> &[Arc<Task>] {
        self.tasks.as_slice()
    }

    /// Create a task for `input` and add it to the session.
    ///
    /// This is how one task's output becomes another task's input: the
    /// resource goes through the same extension lookup as scanned inputs.
    /// Returns `None`, after logging a warning, when no rule handles the
    /// resource's extension.
    pub fn build_resource(&mut self, input: &Resource) -> Result<Option<Arc<Task>>, RuleError> {
        self.create_task(input.clone())
    }

    fn create_task(&mut self, input: Resource) -> Result<Option<Arc<Task>>, RuleError> {
        let Some(rule) = self.project.registry.rule_for(&input).cloned() else {
            warn!(path = %input, "no rule found for input, skipping");
            return Ok(None);
        };

        let builder = rule.create(self, input)?;
        let task = Arc::new(builder.finish(rule));

        self.tasks.push(task.clone());
        Ok(Some(task))
    }

    pub(crate) fn create_tasks(&mut self) -> Result<(), BobbinError> {
        let project = self.project;

        for path in &project.inputs {
            let input = project.resource(path);
            let rule = project
                .registry
                .rule_for(&input)
                .map(|rule| rule.name().to_string())
                .unwrap_or_default();

            self.create_task(input).map_err(|err| BobbinError::Create {
                rule,
                path: path.clone(),
                error: match err {
                    RuleError::Failure(failure) => failure.into(),
                    RuleError::Fatal(err) => err,
                },
            })?;
        }

        Ok(())
    }
}
