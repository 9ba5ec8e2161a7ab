//! Tasks and their results.
//!
//! A [`Task`] is one scheduled unit of work, created by a [`Rule`] for a
//! single input. It lives for exactly one build session and is never
//! mutated once the orchestrator has bound it to its rule.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{Dynamic, Signature, SignatureHasher};
use crate::error::ResourceError;
use crate::fs::Resource;
use crate::project::Context;
use crate::rule::Rule;

pub struct Task {
    name: String,
    inputs: Vec<Resource>,
    outputs: Vec<Resource>,
    rule: Arc<dyn Rule>,
    data: Option<Dynamic>,
}

impl Task {
    /// Start describing a task. Rules return the builder from
    /// [`Rule::create`] and the orchestrator finishes it.
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }

    /// Name of the task, by default the path of its first input.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input resources, in declaration order.
    pub fn inputs(&self) -> &[Resource] {
        &self.inputs
    }

    /// Output resources, in declaration order.
    pub fn outputs(&self) -> &[Resource] {
        &self.outputs
    }

    /// First input, which for tasks created from a scanned file is that file.
    pub fn input(&self) -> Option<&Resource> {
        self.inputs.first()
    }

    /// The rule which created this task and will execute it.
    pub fn rule(&self) -> &Arc<dyn Rule> {
        &self.rule
    }

    /// Rule-specific payload attached at creation time.
    pub fn data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.data.as_ref()?.downcast_ref::<T>()
    }

    /// Fingerprint of everything that determines this task's outputs: the
    /// rule, the content of each input in order, and the rule parameters.
    ///
    /// A missing input contributes an empty chunk, so it still yields a
    /// stable signature distinct from any existing content.
    pub(crate) fn calculate_signature(
        &self,
        context: &Context<'_>,
    ) -> Result<Signature, ResourceError> {
        let mut hasher = SignatureHasher::new();
        hasher.chunk(self.rule.name().as_bytes());

        for input in &self.inputs {
            match input.signature()? {
                Some(signature) => hasher.chunk(signature.as_bytes()),
                None => hasher.chunk(&[]),
            };
        }

        hasher.chunk(&self.rule.signature(context, self));
        Ok(hasher.finish())
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("rule", &self.rule.name())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Declares the inputs and outputs of a [`Task`].
#[derive(Default)]
pub struct TaskBuilder {
    name: Option<String>,
    inputs: Vec<Resource>,
    outputs: Vec<Resource>,
    data: Option<Dynamic>,
}

impl TaskBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn input(mut self, input: Resource) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn inputs(mut self, inputs: impl IntoIterator<Item = Resource>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn output(mut self, output: Resource) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn outputs(mut self, outputs: impl IntoIterator<Item = Resource>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    pub fn data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    pub(crate) fn finish(self, rule: Arc<dyn Rule>) -> Task {
        let name = self.name.unwrap_or_else(|| {
            self.inputs
                .first()
                .map(|input| input.path().to_string())
                .unwrap_or_else(|| rule.name().to_string())
        });

        Task {
            name,
            inputs: self.inputs,
            outputs: self.outputs,
            rule,
            data: self.data,
        }
    }
}

/// Outcome of a task which was actually attempted in a build session.
///
/// Tasks skipped as up to date never produce a result.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task: Arc<Task>,
    /// `0` on success, [`TaskResult::OUTPUT_MISSING`] when the rule claimed
    /// success but left a declared output behind, otherwise the code of the
    /// rule's [`Failure`](crate::Failure).
    pub code: i32,
    pub message: Option<String>,
    pub elapsed: Duration,
}

impl TaskResult {
    pub const OK: i32 = 0;
    pub const OUTPUT_MISSING: i32 = 50;

    pub(crate) fn new(task: Arc<Task>) -> Self {
        Self {
            task,
            code: Self::OK,
            message: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == Self::OK
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::error::RuleError;
    use crate::fs::MemoryFileSystem;

    struct Echo;

    impl Rule for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn create(&self, _: &mut Context<'_>, input: Resource) -> Result<TaskBuilder, RuleError> {
            Ok(Task::builder().input(input))
        }

        fn build(&self, _: &mut Context<'_>, _: &Task) -> Result<(), RuleError> {
            Ok(())
        }
    }

    fn resource(path: &str) -> Resource {
        Resource::new(
            Arc::new(MemoryFileSystem::new()),
            Arc::new(Utf8PathBuf::from("build")),
            path,
        )
    }

    #[test]
    fn test_default_name() {
        let task = Task::builder()
            .input(resource("a.txt"))
            .input(resource("b.txt"))
            .finish(Arc::new(Echo));
        assert_eq!(task.name(), "a.txt");

        let task = Task::builder().finish(Arc::new(Echo));
        assert_eq!(task.name(), "echo");

        let task = Task::builder()
            .name("custom")
            .input(resource("a.txt"))
            .finish(Arc::new(Echo));
        assert_eq!(task.name(), "custom");
    }

    #[test]
    fn test_order_is_kept() {
        let task = Task::builder()
            .inputs([resource("z.txt"), resource("a.txt")])
            .outputs([resource("build/2"), resource("build/1")])
            .finish(Arc::new(Echo));

        let inputs: Vec<_> = task.inputs().iter().map(|r| r.path().as_str()).collect();
        let outputs: Vec<_> = task.outputs().iter().map(|r| r.path().as_str()).collect();
        assert_eq!(inputs, ["z.txt", "a.txt"]);
        assert_eq!(outputs, ["build/2", "build/1"]);
    }

    #[test]
    fn test_data() {
        let task = Task::builder().data(42u32).finish(Arc::new(Echo));

        assert_eq!(task.data::<u32>(), Some(&42));
        assert_eq!(task.data::<String>(), None);
        assert_eq!(Task::builder().finish(Arc::new(Echo)).data::<u32>(), None);
    }
}
