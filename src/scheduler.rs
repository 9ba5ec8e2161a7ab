//! Sweep-based task scheduling.
//!
//! There is no upfront dependency graph. Instead the scheduler sweeps over
//! the live task list again and again. A task is postponed while any of its
//! inputs is declared as the output of some task that has not completed
//! yet; every other task is either skipped as up to date or executed. Tasks
//! created by rules during execution are appended to the list and picked up
//! by the running sweep, because the loop re-reads the list length on every
//! step.
//!
//! The loop ends once every task in the list has been completed. Progress
//! depends on each sweep unblocking at least one postponed task, so a cycle
//! among internally produced inputs never terminates.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use camino::Utf8PathBuf;
use tracing::{Level, debug, trace, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::core::Signature;
use crate::error::{BobbinError, RuleError};
use crate::project::Context;
use crate::state::State;
use crate::task::{Task, TaskResult};
use crate::utils::PROGRESS_STYLE;

pub(crate) fn run_tasks(
    context: &mut Context<'_>,
    state: &mut State,
) -> Result<Vec<TaskResult>, BobbinError> {
    // every output declared by the initial task list
    let all_outputs: HashSet<Utf8PathBuf> = context
        .tasks
        .iter()
        .flat_map(|task| task.outputs())
        .map(|output| output.path().to_owned())
        .collect();

    // indices of tasks which were skipped, executed or failed
    let mut completed_tasks: HashSet<usize> = HashSet::new();

    // outputs settled in this session
    let mut completed_outputs: HashSet<Utf8PathBuf> = HashSet::new();

    let mut results = Vec::new();

    let span = tracing::span!(Level::INFO, "build");
    span.pb_set_style(&PROGRESS_STYLE);
    span.pb_set_length(context.tasks.len() as u64);
    span.pb_set_message("Building tasks...");
    let _enter = span.enter();

    let mut sweep = 0;
    while completed_tasks.len() < context.tasks.len() {
        sweep += 1;
        trace!(
            sweep,
            completed = completed_tasks.len(),
            total = context.tasks.len(),
            "starting sweep"
        );

        let mut index = 0;
        while index < context.tasks.len() {
            let current = index;
            index += 1;

            if completed_tasks.contains(&current) {
                continue;
            }

            let task = context.tasks[current].clone();

            let pending = task.inputs().iter().any(|input| {
                all_outputs.contains(input.path()) && !completed_outputs.contains(input.path())
            });

            if pending {
                trace!(task = task.name(), "postponed, waiting for inputs");
                continue;
            }

            completed_tasks.insert(current);
            span.pb_inc(1);

            let signature = task.calculate_signature(context)?;

            let all_outputs_exist = task.outputs().iter().all(|output| output.exists());
            let all_signatures_match = task
                .outputs()
                .iter()
                .all(|output| state.signature(output.path()) == Some(&signature));

            if !(all_outputs_exist && all_signatures_match) {
                let result = execute(context, state, &task, signature)?;
                results.push(result);

                // tasks requested by the rule extend the progress bar
                span.pb_set_length(context.tasks.len() as u64);
            } else {
                debug!(task = task.name(), "up to date");
            }

            completed_outputs.extend(task.outputs().iter().map(|output| output.path().to_owned()));
        }
    }

    debug!(sweeps = sweep, tasks = context.tasks.len(), "scheduling finished");
    Ok(results)
}

fn execute(
    context: &mut Context<'_>,
    state: &mut State,
    task: &Arc<Task>,
    signature: Signature,
) -> Result<TaskResult, BobbinError> {
    let span = tracing::span!(Level::INFO, "task", name = task.name());
    let _enter = span.enter();

    let start = Instant::now();
    let mut result = TaskResult::new(task.clone());
    let rule = task.rule().clone();

    match rule.build(context, task) {
        Ok(()) => {
            for output in task.outputs() {
                state.put_signature(output.path(), signature);
            }

            let missing: Vec<_> = task
                .outputs()
                .iter()
                .filter(|output| !output.exists())
                .map(|output| output.path().as_str())
                .collect();

            if !missing.is_empty() {
                let message = format!("Output '{}' not found", missing.join("', '"));
                warn!(task = task.name(), "{message}");

                result.code = TaskResult::OUTPUT_MISSING;
                result.message = Some(message);
            }
        }
        Err(RuleError::Failure(failure)) => {
            warn!(task = task.name(), code = failure.code, "{}", failure.message);

            // stale outputs must not look fresh on the next run
            for output in task.outputs() {
                state.remove_signature(output.path());
            }

            result.code = failure.code;
            result.message = Some(failure.message);
        }
        Err(RuleError::Fatal(err)) => {
            return Err(BobbinError::Task(task.name().to_string(), err));
        }
    }

    result.elapsed = start.elapsed();
    debug!(task = task.name(), code = result.code, elapsed = ?result.elapsed, "task attempted");

    Ok(result)
}
