// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job dependency graph validation and ordering.
//!
//! All `depends_on` edges point at sibling jobs in the same scope. Unknown
//! references quarantine the workspace; a cycle fails the entire load.

use crate::error::ConfigError;
use crate::job::JobDef;
use std::collections::{BTreeMap, BTreeSet};

/// Validate the dependency edges of one scope's jobs.
pub fn validate(scope: &str, jobs: &[JobDef]) -> Result<(), ConfigError> {
    let names: BTreeSet<&str> = jobs.iter().map(|j| j.name.as_str()).collect();
    if names.len() != jobs.len() {
        let mut seen = BTreeSet::new();
        for job in jobs {
            if !seen.insert(job.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate job name '{}' in '{}'",
                    job.name, scope
                )));
            }
        }
    }
    for job in jobs {
        for dep in &job.depends_on {
            if !names.contains(dep.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "job '{}' depends on unknown job '{}'",
                    job.name, dep
                )));
            }
        }
    }
    if let Some(cycle) = find_cycle(jobs) {
        return Err(ConfigError::CircularDependency { scope: scope.to_string(), cycle });
    }
    Ok(())
}

/// Topologically order a set of jobs by `depends_on`.
///
/// Predecessors come first. Jobs whose dependencies are outside `jobs`
/// (because the trigger selected a subset) sort as if those edges were
/// absent. The input is assumed cycle-free (validated at load).
pub fn topo_order<'a>(jobs: &[&'a JobDef]) -> Vec<&'a JobDef> {
    let selected: BTreeSet<&str> = jobs.iter().map(|j| j.name.as_str()).collect();
    let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for job in jobs {
        let deps = job
            .depends_on
            .iter()
            .filter(|d| selected.contains(d.as_str()))
            .count();
        indegree.insert(job.name.as_str(), deps);
        for dep in &job.depends_on {
            if selected.contains(dep.as_str()) {
                dependents.entry(dep.as_str()).or_default().push(job.name.as_str());
            }
        }
    }

    let by_name: BTreeMap<&str, &JobDef> = jobs.iter().map(|j| (j.name.as_str(), *j)).collect();
    let mut ready: Vec<&str> =
        indegree.iter().filter(|(_, d)| **d == 0).map(|(n, _)| *n).collect();
    let mut order = Vec::with_capacity(jobs.len());
    while let Some(name) = ready.pop() {
        if let Some(job) = by_name.get(name) {
            order.push(*job);
        }
        for dependent in dependents.remove(name).unwrap_or_default() {
            if let Some(d) = indegree.get_mut(dependent) {
                *d -= 1;
                if *d == 0 {
                    ready.push(dependent);
                }
            }
        }
    }
    order
}

/// Find one dependency cycle, rendered as `a -> b -> a`.
fn find_cycle(jobs: &[JobDef]) -> Option<String> {
    let deps: BTreeMap<&str, &[String]> =
        jobs.iter().map(|j| (j.name.as_str(), j.depends_on.as_slice())).collect();

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        name: &'a str,
        deps: &BTreeMap<&'a str, &'a [String]>,
        marks: &mut BTreeMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<String> {
        match marks.get(name) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<&str> = stack[start..].to_vec();
                cycle.push(name);
                return Some(cycle.join(" -> "));
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        stack.push(name);
        if let Some(edges) = deps.get(name) {
            for dep in edges.iter() {
                if deps.contains_key(dep.as_str()) {
                    if let Some(cycle) = visit(dep.as_str(), deps, marks, stack) {
                        return Some(cycle);
                    }
                }
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        None
    }

    let mut marks = BTreeMap::new();
    let mut stack = Vec::new();
    for job in jobs {
        if let Some(cycle) = visit(job.name.as_str(), &deps, &mut marks, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
