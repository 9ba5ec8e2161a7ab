//! Transformation rules and the extension registry.
//!
//! A [`Rule`] is bound to one or more input file extensions. It is asked
//! twice about every input: once to describe the work as a [`Task`] and,
//! if the task turns out to be stale, once more to actually produce the
//! outputs it declared.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::error::RuleError;
use crate::fs::Resource;
use crate::project::Context;
use crate::task::{Task, TaskBuilder};

/// A recoverable, per-task failure.
///
/// Returning this from [`Rule::build`] records `code` and `message` in the
/// task's [`TaskResult`](crate::TaskResult) and lets the rest of the build
/// carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct Failure {
    pub code: i32,
    pub message: String,
}

impl Failure {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Pluggable transformation unit.
pub trait Rule: Send + Sync {
    /// Human readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Describe the work needed to transform `input` as a [`Task`]. The
    /// orchestrator binds the returned builder to this rule.
    ///
    /// Rules may allocate intermediate resources here and request further
    /// tasks through [`Context::build_resource`].
    fn create(
        &self,
        context: &mut Context<'_>,
        input: Resource,
    ) -> Result<TaskBuilder, RuleError>;

    /// Produce every output declared by `task`.
    fn build(&self, context: &mut Context<'_>, task: &Task) -> Result<(), RuleError>;

    /// Rule parameters which should invalidate previously built outputs when
    /// they change, typically the values of the options the rule reads.
    #[inline]
    fn signature(&self, _context: &Context<'_>, _task: &Task) -> Vec<u8> {
        Vec::new()
    }
}

/// Exact-match lookup table from input extension to rule.
#[derive(Default, Clone)]
pub struct Registry {
    rules: HashMap<String, Arc<dyn Rule>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `rule` to `ext`. The extension includes its leading `.` and is
    /// matched case-sensitively. A later registration for the same extension
    /// replaces the earlier one.
    pub fn register(&mut self, ext: impl Into<String>, rule: Arc<dyn Rule>) -> &mut Self {
        let ext = ext.into();
        let ext = if ext.starts_with('.') {
            ext
        } else {
            format!(".{ext}")
        };

        self.rules.insert(ext, rule);
        self
    }

    pub fn get(&self, ext: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.get(ext)
    }

    /// Rule responsible for `resource`, if any.
    pub fn rule_for(&self, resource: &Resource) -> Option<&Arc<dyn Rule>> {
        resource.extension().and_then(|ext| self.get(&ext))
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.rules.contains_key(ext)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut exts: Vec<_> = self.rules.keys().collect();
        exts.sort();
        f.debug_struct("Registry").field("extensions", &exts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Rule for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn create(
            &self,
            _: &mut Context<'_>,
            input: Resource,
        ) -> Result<TaskBuilder, RuleError> {
            Ok(Task::builder().input(input))
        }

        fn build(&self, _: &mut Context<'_>, _: &Task) -> Result<(), RuleError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_normalizes_dot() {
        let mut registry = Registry::new();
        registry.register("txt", Arc::new(Noop));
        registry.register(".md", Arc::new(Noop));

        assert!(registry.contains(".txt"));
        assert!(registry.contains(".md"));
        assert!(!registry.contains("txt"));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut registry = Registry::new();
        registry.register(".txt", Arc::new(Noop));

        assert!(registry.get(".txt").is_some());
        assert!(registry.get(".TXT").is_none());
    }

    #[test]
    fn test_extensions() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry
            .register(".md", Arc::new(Noop))
            .register("txt", Arc::new(Noop));

        let mut exts: Vec<_> = registry.extensions().collect();
        exts.sort();
        assert_eq!(exts, [".md", ".txt"]);
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure::new(50, "boom");
        assert_eq!(failure.to_string(), "boom (code 50)");
        assert!(matches!(RuleError::from(failure), RuleError::Failure(_)));
    }
}
