use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use petgraph::Graph;
use petgraph::graph::NodeIndex;

use crate::task::{Task, TaskResult};

/// Dependency graph of a task list: an edge `a -> b` labelled with a path
/// means task `b` reads a resource that task `a` declares as its output.
///
/// The scheduler never builds this graph, it exists purely for inspection.
pub fn task_graph(tasks: &[Arc<Task>]) -> Graph<Arc<Task>, Utf8PathBuf> {
    let mut graph = Graph::new();
    let nodes: Vec<NodeIndex> = tasks
        .iter()
        .map(|task| graph.add_node(task.clone()))
        .collect();

    let mut producers: HashMap<&Utf8Path, NodeIndex> = HashMap::new();
    for (task, &index) in tasks.iter().zip(&nodes) {
        for output in task.outputs() {
            producers.insert(output.path(), index);
        }
    }

    for (task, &index) in tasks.iter().zip(&nodes) {
        for input in task.inputs() {
            if let Some(&producer) = producers.get(input.path())
                && producer != index
            {
                graph.add_edge(producer, index, input.path().to_owned());
            }
        }
    }

    graph
}

/// How an attempted task went.
#[derive(Debug, Clone, Copy)]
pub struct Attempt {
    pub code: i32,
    pub elapsed: Duration,
}

/// Build diagnostics for one session.
///
/// Pairs the task graph with the results of the tasks which ran, and renders
/// both as a Mermaid diagram.
pub struct Diagnostics {
    graph: Graph<Arc<Task>, Utf8PathBuf>,
    attempts: HashMap<NodeIndex, Attempt>,
}

impl Diagnostics {
    pub fn new(tasks: &[Arc<Task>], results: &[TaskResult]) -> Self {
        let graph = task_graph(tasks);

        let attempts = graph
            .node_indices()
            .filter_map(|index| {
                let task = &graph[index];
                results
                    .iter()
                    .find(|result| Arc::ptr_eq(&result.task, task))
                    .map(|result| {
                        let attempt = Attempt {
                            code: result.code,
                            elapsed: result.elapsed,
                        };
                        (index, attempt)
                    })
            })
            .collect();

        Self { graph, attempts }
    }

    pub fn graph(&self) -> &Graph<Arc<Task>, Utf8PathBuf> {
        &self.graph
    }

    pub fn attempt(&self, index: NodeIndex) -> Option<&Attempt> {
        self.attempts.get(&index)
    }

    /// Renders the task graph as a Mermaid diagram, color-coded by execution
    /// duration.
    ///
    /// * **Green**: Fast
    /// * **Yellow**: Moderate
    /// * **Red**: Slow
    /// * **Blue**: Cached (skipped)
    pub fn render_mermaid(&self) -> String {
        self.to_string()
    }
}

/// Green for the fastest task, through yellow, to red for the slowest.
fn color(t: f64) -> String {
    let (r, g, b) = if t < 0.5 {
        let t_scaled = t * 2.0;
        ((255.0 * t_scaled) as u8, 255, 0)
    } else {
        let t_scaled = (t - 0.5) * 2.0;
        (255, (255.0 * (1.0 - t_scaled)) as u8, 0)
    };

    format!("#{r:02X}{g:02X}{b:02X}")
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph LR")?;

        let mut min_time = f64::MAX;
        let mut max_time = f64::MIN;

        for attempt in self.attempts.values() {
            let secs = attempt.elapsed.as_secs_f64();
            min_time = min_time.min(secs);
            max_time = max_time.max(secs);
        }

        if min_time > max_time {
            // nothing ran
            min_time = 0.0;
            max_time = 0.0;
        }

        if (max_time - min_time).abs() < f64::EPSILON {
            max_time = min_time + 1.0;
        }

        for index in self.graph.node_indices() {
            let task = &self.graph[index];
            let name = task.name().replace('"', "\\\"");

            let (label, fill) = match self.attempts.get(&index) {
                Some(attempt) => {
                    let t = (attempt.elapsed.as_secs_f64() - min_time) / (max_time - min_time);
                    let mut label = format!("{:.2?}", attempt.elapsed);
                    if attempt.code != TaskResult::OK {
                        label.push_str(&format!(", code {}", attempt.code));
                    }
                    (label, color(t))
                }
                None => ("Cached".to_string(), "#ADD8E6".to_string()),
            };

            writeln!(f, "    {}[\"{}\\n{}\"]", index.index(), name, label)?;
            writeln!(f, "    style {} fill:{}", index.index(), fill)?;
        }

        for edge in self.graph.edge_indices() {
            let Some((source, target)) = self.graph.edge_endpoints(edge) else {
                continue;
            };

            writeln!(
                f,
                "    {} -- \"{}\" --> {}",
                source.index(),
                self.graph[edge],
                target.index()
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CopyRule, fixture};

    #[test]
    fn test_task_graph_edges() {
        let (fs, mut project) = fixture();
        project.register(".src", CopyRule::new(".mid"));
        project.register(".mid", CopyRule::new(".out"));

        fs.insert("a.src", "a");
        project.set_inputs(["a.src", "build/a.mid"]);
        project.build().unwrap();

        let graph = task_graph(project.tasks());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        let edge = graph.edge_indices().next().unwrap();
        assert_eq!(graph[edge].as_str(), "build/a.mid");
    }

    #[test]
    fn test_render_marks_cached() {
        let (fs, mut project) = fixture();
        project.register(".txt", CopyRule::new(".out"));
        fs.insert("a.txt", "a");
        project.set_inputs(["a.txt"]);

        let results = project.build().unwrap();
        let first = Diagnostics::new(project.tasks(), &results).render_mermaid();
        assert!(first.starts_with("graph LR"));
        assert!(!first.contains("Cached"));

        let results = project.build().unwrap();
        let second = Diagnostics::new(project.tasks(), &results).render_mermaid();
        assert!(second.contains("Cached"));
        assert!(second.contains("#ADD8E6"));
    }

    #[test]
    fn test_color_gradient() {
        assert_eq!(color(0.0), "#00FF00");
        assert_eq!(color(0.5), "#FFFF00");
        assert_eq!(color(1.0), "#FF0000");
    }
}
