use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    error::Error,
    fmt,
    time::Instant,
};

use log::{error, info};

use crate::error::Result;

/// Errors in the shape of a task graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DagErr {
    DuplicateTask(String),
    UnknownDependency { task: String, dependency: String },
    /// The named tasks depend on each other in a cycle.
    Cycle(Vec<String>),
    /// A task asked for an input it didn't declare as a dependency.
    MissingInput { task: String, input: String },
}

impl fmt::Display for DagErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTask(name) => write!(f, "task {name:?} was added twice"),
            Self::UnknownDependency { task, dependency } => {
                write!(f, "task {task:?} depends on unknown task {dependency:?}")
            }
            Self::Cycle(tasks) => write!(f, "tasks {tasks:?} form a cycle"),
            Self::MissingInput { task, input } => {
                write!(f, "task {task:?} has no input named {input:?}")
            }
        }
    }
}

impl Error for DagErr {}

/// The outputs of a task's dependencies, by task name.
pub struct Inputs<'a, T> {
    task: &'a str,
    outputs: HashMap<&'a str, &'a T>,
}

impl<'a, T> Inputs<'a, T> {
    pub fn get(&self, name: &str) -> Option<&'a T> {
        self.outputs.get(name).copied()
    }

    /// Like `get`, but a missing input is an error.
    pub fn require(&self, name: &str) -> Result<&'a T> {
        self.get(name).ok_or_else(|| {
            DagErr::MissingInput {
                task: self.task.to_string(),
                input: name.to_string(),
            }
            .into()
        })
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

type TaskFn<T> = Box<dyn for<'a> FnOnce(Inputs<'a, T>) -> Result<T>>;

struct Task<T> {
    name: String,
    deps: Vec<String>,
    run: TaskFn<T>,
}

/// A named graph of tasks, each producing a value of type `T` from the values of the tasks
/// it depends on.
///
/// Tasks run one at a time in a topological order. Ties are broken by the order the tasks
/// were added in, so the execution order is deterministic.
pub struct Dag<T> {
    name: String,
    tasks: Vec<Task<T>>,
}

impl<T> Dag<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a task that runs after every task in `deps`.
    ///
    /// The graph is only validated when it's ordered or run.
    pub fn add_task<F>(&mut self, name: &str, deps: &[&str], f: F) -> &mut Self
    where
        F: for<'a> FnOnce(Inputs<'a, T>) -> Result<T> + 'static,
    {
        self.tasks.push(Task {
            name: name.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            run: Box::new(f),
        });

        self
    }

    /// Returns the names of the tasks in the order they'd run in.
    pub fn order(&self) -> Result<Vec<&str>> {
        let order = self.order_indices()?;
        Ok(order.into_iter().map(|i| self.tasks[i].name.as_str()).collect())
    }

    /// Kahn's algorithm over task indices, always picking the earliest added ready task.
    fn order_indices(&self) -> Result<Vec<usize>> {
        let mut index = HashMap::with_capacity(self.tasks.len());
        for (i, task) in self.tasks.iter().enumerate() {
            if index.insert(task.name.as_str(), i).is_some() {
                return Err(DagErr::DuplicateTask(task.name.clone()).into());
            }
        }

        let mut in_degree = vec![0; self.tasks.len()];
        let mut dependents = vec![Vec::new(); self.tasks.len()];
        for (i, task) in self.tasks.iter().enumerate() {
            let unique: HashSet<_> = task.deps.iter().collect();

            for dep in unique {
                let &d = index.get(dep.as_str()).ok_or_else(|| DagErr::UnknownDependency {
                    task: task.name.clone(),
                    dependency: dep.clone(),
                })?;

                in_degree[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut ready: BTreeSet<_> = (0..self.tasks.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.tasks.len());
        while let Some(i) = ready.pop_first() {
            order.push(i);

            for &next in &dependents[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if order.len() < self.tasks.len() {
            let stuck = (0..self.tasks.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.tasks[i].name.clone())
                .collect();

            return Err(DagErr::Cycle(stuck).into());
        }

        Ok(order)
    }

    /// Runs every task in order, stopping at the first one that fails.
    ///
    /// # Returns
    /// The output of every task by name, or the error of the task that failed.
    pub fn run(self) -> Result<BTreeMap<String, T>> {
        let order = self.order_indices()?;
        info!("running flow {:?} with {} task(s)", self.name, order.len());

        let mut tasks: Vec<_> = self.tasks.into_iter().map(Some).collect();
        let mut outputs = BTreeMap::new();

        for i in order {
            let Some(task) = tasks[i].take() else {
                continue;
            };

            let inputs = Inputs {
                task: &task.name,
                outputs: task
                    .deps
                    .iter()
                    .filter_map(|dep| outputs.get_key_value(dep))
                    .map(|(name, output): (&String, &T)| (name.as_str(), output))
                    .collect(),
            };

            info!("task {:?} started", task.name);
            let start = Instant::now();

            match (task.run)(inputs) {
                Ok(output) => {
                    info!("task {:?} finished in {:?}", task.name, start.elapsed());
                    outputs.insert(task.name, output);
                }
                Err(e) => {
                    error!("task {:?} failed: {e}", task.name);
                    return Err(e);
                }
            }
        }

        info!("flow {:?} finished", self.name);
        Ok(outputs)
    }
}
