use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;

use crate::error::Error;
use crate::task::TaskDescriptor;

/// An ordered, id-unique collection of [`TaskDescriptor`]s.
///
/// `TaskSet` plays two roles depending on how it was built: a plain
/// collection (via [`TaskSet::new`]/[`TaskSet::add`]/[`TaskSet::subset`]),
/// where member order is insertion order; or a *resolved* set (the output of
/// [`TaskSet::resolve`]), where member order is a valid topological order of
/// the induced dependency graph. [`TaskSet::topological_order`] is only
/// meaningful on the latter.
#[derive(Clone, Debug, Default)]
pub struct TaskSet {
    members: Vec<TaskDescriptor>,
    index: HashMap<String, usize>,
    resolved: bool,
}

impl TaskSet {
    pub fn new(members: impl IntoIterator<Item = TaskDescriptor>) -> Result<TaskSet, Error> {
        let mut set = TaskSet::default();
        for member in members {
            set.add(member)?;
        }
        Ok(set)
    }

    pub fn add(&mut self, task: TaskDescriptor) -> Result<(), Error> {
        if self.index.contains_key(task.id()) {
            return Err(Error::DuplicateId(task.id().to_string()));
        }
        self.index.insert(task.id().to_string(), self.members.len());
        self.members.push(task);
        Ok(())
    }

    pub fn get_all(&self) -> &[TaskDescriptor] {
        &self.members
    }

    pub fn get(&self, id: &str) -> Option<&TaskDescriptor> {
        self.index.get(id).map(|&i| &self.members[i])
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A new `TaskSet` of the members for which `predicate` returns `true`.
    /// Insertion order of the matching members is preserved.
    pub fn subset(&self, predicate: impl Fn(&TaskDescriptor) -> bool) -> TaskSet {
        let mut set = TaskSet::default();
        for member in &self.members {
            if predicate(member) {
                // Membership was already unique in `self`; this cannot fail.
                let _ = set.add(member.clone());
            }
        }
        set
    }

    /// Transitively resolves the current members (as seeds) against
    /// `universe`, collecting every declared dependency by id. The seeds
    /// themselves are looked up first in `self`, then in `universe` --
    /// letting a caller resolve a subset of the universe against itself.
    pub fn resolve(&self, universe: &TaskSet) -> Result<TaskSet, Error> {
        let mut resolved: HashMap<String, TaskDescriptor> = HashMap::new();
        let mut worklist: VecDeque<String> = self.members.iter().map(|t| t.id().to_string()).collect();

        while let Some(id) = worklist.pop_front() {
            if resolved.contains_key(&id) {
                continue;
            }
            let task = self
                .get(&id)
                .or_else(|| universe.get(&id))
                .ok_or_else(|| Error::MissingDependency(id.clone()))?;
            for dep in task.dependencies() {
                if !resolved.contains_key(dep) {
                    worklist.push_back(dep.clone());
                }
            }
            resolved.insert(id, task.clone());
        }

        if let Some(path) = detect_cycle(&resolved) {
            return Err(Error::Cycle(path));
        }

        let ordered = topological_order_of(&resolved)?;
        let mut set = TaskSet::default();
        set.resolved = true;
        for task in ordered {
            set.index.insert(task.id().to_string(), set.members.len());
            set.members.push(task);
        }
        Ok(set)
    }

    /// A valid topological order of the members, ties broken by ascending
    /// id. Meaningful only when `self` is the output of [`TaskSet::resolve`];
    /// on an unresolved set the member order is returned as-is.
    pub fn topological_order(&self) -> Vec<TaskDescriptor> {
        if !self.resolved {
            log::warn!(
                "topological_order() called on a TaskSet that was not produced by resolve(); \
                 returning insertion order, which is not guaranteed to respect dependencies"
            );
        }
        self.members.clone()
    }
}

/// Cycle detection over the induced dependency subgraph of `resolved`.
/// `petgraph`'s `DiGraphMap` gives a cheap yes/no answer first; only when it
/// reports a cycle do we pay for the three-color DFS that recovers an actual
/// path to report to the caller (§9 prescribes ascending-id-ordered,
/// deterministic traversal for that walk).
fn detect_cycle(resolved: &HashMap<String, TaskDescriptor>) -> Option<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for id in resolved.keys() {
        graph.add_node(id.as_str());
    }
    for (id, task) in resolved {
        for dep in task.dependencies() {
            if resolved.contains_key(dep) {
                graph.add_edge(id.as_str(), dep.as_str(), ());
            }
        }
    }
    if !is_cyclic_directed(&graph) {
        return None;
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Grey,
        Black,
    }

    let mut colors: HashMap<&str, Color> =
        resolved.keys().map(|id| (id.as_str(), Color::White)).collect();
    let mut ids: Vec<&str> = resolved.keys().map(|s| s.as_str()).collect();
    ids.sort_unstable();

    fn visit<'a>(
        id: &'a str,
        resolved: &'a HashMap<String, TaskDescriptor>,
        colors: &mut HashMap<&'a str, Color>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        colors.insert(id, Color::Grey);
        stack.push(id);

        let mut deps: Vec<&str> = resolved[id].dependencies().iter().map(|s| s.as_str()).collect();
        deps.sort_unstable();
        for dep in deps {
            match colors.get(dep).copied().unwrap_or(Color::Black) {
                Color::White => {
                    if let Some(path) = visit(dep, resolved, colors, stack) {
                        return Some(path);
                    }
                }
                Color::Grey => {
                    let start = stack.iter().position(|&n| n == dep).unwrap();
                    let mut path: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                    path.push(dep.to_string());
                    return Some(path);
                }
                Color::Black => {}
            }
        }

        stack.pop();
        colors.insert(id, Color::Black);
        None
    }

    let mut stack = Vec::new();
    for id in ids {
        if colors[id] == Color::White {
            if let Some(path) = visit(id, resolved, &mut colors, &mut stack) {
                return Some(path);
            }
        }
    }
    None
}

/// Kahn's algorithm: repeatedly remove an in-degree-zero node, preferring
/// (for determinism) the smallest id among current candidates.
fn topological_order_of(
    resolved: &HashMap<String, TaskDescriptor>,
) -> Result<Vec<TaskDescriptor>, Error> {
    let mut in_degree: HashMap<&str, usize> = resolved.keys().map(|id| (id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for (id, task) in resolved {
        for dep in task.dependencies() {
            *in_degree.get_mut(id.as_str()).unwrap() += 1;
            dependents.entry(dep.as_str()).or_default().push(id.as_str());
        }
    }

    let mut frontier: BinaryHeap<Reverse<&str>> = in_degree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&id, _)| Reverse(id))
        .collect();

    let mut order = Vec::with_capacity(resolved.len());
    while let Some(Reverse(id)) = frontier.pop() {
        order.push(resolved[id].clone());
        if let Some(deps) = dependents.get(id) {
            for &dependent in deps {
                let degree = in_degree.get_mut(dependent).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    frontier.push(Reverse(dependent));
                }
            }
        }
    }

    if order.len() != resolved.len() {
        // detect_cycle already ran before this is called; reaching here would
        // mean a cycle slipped through that check.
        let remaining: Vec<String> = resolved
            .keys()
            .filter(|id| !order.iter().any(|t| t.id() == id.as_str()))
            .cloned()
            .collect();
        return Err(Error::Cycle(remaining));
    }
    Ok(order)
}
