//! Dependency resolution and ordering of registered steps.
//!
//! A dependency string matches every step whose name or one of whose tags
//! equals it. Regular steps are ordered topologically, ties broken by
//! registration order; steps that run at the end follow all regular steps.

use std::collections::{BTreeSet, HashMap};

use crate::{error::GraphError, step::StepRegistry};

/// The resolved dependency graph of a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedGraph {
    /// Indices of the steps in execution order.
    order: Vec<usize>,
    /// Resolved dependency indices per step, in declaration order.
    edges: Vec<Vec<usize>>,
    /// Names of the resolved dependency steps, in declaration order.
    producers: Vec<Vec<String>>,
    /// Artifact names each step may read: declared strings and resolved step names.
    allowed: Vec<BTreeSet<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl ResolvedGraph {
    /// Resolve every declared dependency and compute the execution order.
    pub fn resolve(registry: &StepRegistry) -> Result<Self, GraphError> {
        let count = registry.len();
        let mut edges = Vec::with_capacity(count);
        let mut producers = Vec::with_capacity(count);
        let mut allowed = Vec::with_capacity(count);

        for (index, step) in registry.iter().enumerate() {
            let mut resolved: Vec<usize> = Vec::new();
            let mut names = BTreeSet::new();

            for &dependency in step.dependencies() {
                if step.name() == dependency {
                    return Err(GraphError::Cycle {
                        path: vec![dependency.to_string(), dependency.to_string()],
                    });
                }

                let matches: Vec<usize> = registry
                    .iter()
                    .enumerate()
                    .filter(|&(other, candidate)| {
                        other != index
                            && (candidate.name() == dependency
                                || candidate.tags().contains(&dependency))
                    })
                    .map(|(other, _)| other)
                    .collect();

                if matches.is_empty() {
                    return Err(GraphError::UnknownDependency {
                        step: step.name().to_string(),
                        dependency: dependency.to_string(),
                    });
                }

                names.insert(dependency.to_string());
                for other in matches {
                    if !step.run_at_the_end() && registry[other].run_at_the_end() {
                        return Err(GraphError::DependsOnEndStep {
                            step: step.name().to_string(),
                            dependency: registry[other].name().to_string(),
                        });
                    }
                    if !resolved.contains(&other) {
                        resolved.push(other);
                        names.insert(registry[other].name().to_string());
                    }
                }
            }

            producers.push(
                resolved
                    .iter()
                    .map(|&other| registry[other].name().to_string())
                    .collect(),
            );
            edges.push(resolved);
            allowed.push(names);
        }

        if let Some(path) = find_cycle(registry, &edges) {
            return Err(GraphError::Cycle { path });
        }

        let regular: Vec<usize> = (0..count).filter(|&i| !registry[i].run_at_the_end()).collect();
        let at_end: Vec<usize> = (0..count).filter(|&i| registry[i].run_at_the_end()).collect();

        let mut order = topological_order(&regular, &edges);
        order.extend(topological_order(&at_end, &edges));

        Ok(Self {
            order,
            edges,
            producers,
            allowed,
        })
    }

    /// All step indices in execution order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Resolved dependency indices of step `index`.
    pub fn dependencies(&self, index: usize) -> &[usize] {
        &self.edges[index]
    }

    pub(crate) fn producers(&self, index: usize) -> &[String] {
        &self.producers[index]
    }

    pub(crate) fn allowed(&self, index: usize) -> &BTreeSet<String> {
        &self.allowed[index]
    }

    /// Execution order restricted to steps matching `tags` by name or tag,
    /// plus everything they transitively depend on. No tags selects every step.
    pub fn select(&self, registry: &StepRegistry, tags: &[String]) -> Vec<usize> {
        if tags.is_empty() {
            return self.order.clone();
        }

        let mut selected = vec![false; registry.len()];
        let mut stack: Vec<usize> = registry
            .iter()
            .enumerate()
            .filter(|(_, step)| {
                tags.iter().any(|tag| {
                    step.name() == tag.as_str() || step.tags().contains(&tag.as_str())
                })
            })
            .map(|(index, _)| index)
            .collect();

        while let Some(index) = stack.pop() {
            if selected[index] {
                continue;
            }
            selected[index] = true;
            stack.extend(self.edges[index].iter().copied());
        }

        self.order
            .iter()
            .copied()
            .filter(|&index| selected[index])
            .collect()
    }
}

/// Depth-first search for a dependency cycle. Returns the step names along the
/// cycle, with the first name repeated at the end.
fn find_cycle(registry: &StepRegistry, edges: &[Vec<usize>]) -> Option<Vec<String>> {
    fn visit(
        index: usize,
        edges: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        marks[index] = Mark::InProgress;
        stack.push(index);

        for &next in &edges[index] {
            match marks[next] {
                Mark::InProgress => {
                    let start = stack.iter().position(|&i| i == next).unwrap_or(0);
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = visit(next, edges, marks, stack) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }

        stack.pop();
        marks[index] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut stack = Vec::new();

    (0..edges.len()).find_map(|index| {
        if marks[index] != Mark::Unvisited {
            return None;
        }
        visit(index, edges, &mut marks, &mut stack).map(|cycle| {
            // Edges point from dependent to dependency; report in execution direction.
            cycle
                .into_iter()
                .rev()
                .map(|i| registry[i].name().to_string())
                .collect()
        })
    })
}

/// Kahn's algorithm over `members`, always picking the earliest registered ready step.
/// Edges to steps outside `members` are treated as satisfied.
fn topological_order(members: &[usize], edges: &[Vec<usize>]) -> Vec<usize> {
    let member_set: BTreeSet<usize> = members.iter().copied().collect();
    let mut pending: HashMap<usize, usize> = HashMap::new();
    let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();

    for &index in members {
        let inside: Vec<usize> = edges[index]
            .iter()
            .copied()
            .filter(|dep| member_set.contains(dep))
            .collect();
        pending.insert(index, inside.len());
        for dep in inside {
            dependents.entry(dep).or_default().push(index);
        }
    }

    let mut ready: BTreeSet<usize> = members
        .iter()
        .copied()
        .filter(|index| pending.get(index) == Some(&0))
        .collect();
    let mut order = Vec::with_capacity(members.len());

    while let Some(index) = ready.pop_first() {
        order.push(index);
        for &dependent in dependents.get(&index).map(Vec::as_slice).unwrap_or_default() {
            if let Some(count) = pending.get_mut(&dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    order
}
