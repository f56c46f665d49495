//! Cycle detection over the declared dependency graph.
//!
//! Nodes are module names, edges point from a module to each dependency
//! it declares. A definition that would close a cycle can never execute,
//! so it is refused before it is applied.

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

/// Check whether declaring `name -> dependencies` closes a cycle.
///
/// `declared` yields the current declarations of the other modules; any
/// earlier declaration of `name` itself is ignored (it is being replaced).
/// Returns the modules on the cycle, starting and ending at `name`.
pub fn find_cycle<'a, I>(
    declared: I,
    name: &'a str,
    dependencies: &'a [String],
) -> Option<Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let mut graph: DiGraphMap<&'a str, ()> = DiGraphMap::new();
    for (module, deps) in declared {
        if module == name {
            continue;
        }
        graph.add_node(module);
        for dep in deps {
            graph.add_edge(module, dep.as_str(), ());
        }
    }
    graph.add_node(name);
    for dep in dependencies {
        graph.add_edge(name, dep.as_str(), ());
    }

    if graph.contains_edge(name, name) {
        return Some(vec![name.to_string(), name.to_string()]);
    }

    let component = tarjan_scc(&graph)
        .into_iter()
        .find(|scc| scc.contains(&name))?;
    if component.len() < 2 {
        return None;
    }

    Some(cycle_path(&graph, name, &component))
}

/// Walk from `start` back to itself inside one strongly connected component.
fn cycle_path<'a>(
    graph: &DiGraphMap<&'a str, ()>,
    start: &'a str,
    component: &[&'a str],
) -> Vec<String> {
    use std::collections::{HashMap, VecDeque};

    // Breadth-first search restricted to the component, from start's
    // successors back to start.
    let mut parent: HashMap<&'a str, &'a str> = HashMap::new();
    let mut queue = VecDeque::new();
    for next in graph.neighbors(start) {
        if component.contains(&next) && !parent.contains_key(next) {
            parent.insert(next, start);
            queue.push_back(next);
        }
    }

    while let Some(node) = queue.pop_front() {
        if node == start {
            break;
        }
        for next in graph.neighbors(node) {
            if component.contains(&next) && !parent.contains_key(next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    let mut path = vec![start.to_string()];
    let mut node = start;
    while let Some(&prev) = parent.get(node) {
        path.push(prev.to_string());
        if prev == start {
            break;
        }
        node = prev;
    }
    path.reverse();
    path
}
