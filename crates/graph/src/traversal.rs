//! Traversals over the graph's adjacency lists.
//!
//! Every function walks neighbours in edge insertion order, so results are
//! deterministic for a given sequence of mutations.

use skillpath_core::SkillId;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Adjacency by direction.
pub(crate) type Adjacency = HashMap<SkillId, Vec<SkillId>>;

fn neighbours<'a>(adjacency: &'a Adjacency, id: &SkillId) -> &'a [SkillId] {
    adjacency.get(id).map(|v| v.as_slice()).unwrap_or(&[])
}

/// Whether `target` can be reached from `from` along `adjacency`.
pub(crate) fn reaches(adjacency: &Adjacency, from: &SkillId, target: &SkillId) -> bool {
    if from == target {
        return true;
    }
    let mut visited = HashSet::new();
    let mut stack = vec![from];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        for next in neighbours(adjacency, id) {
            if next == target {
                return true;
            }
            stack.push(next);
        }
    }
    false
}

/// Breadth-first shortest path, inclusive of both ends. The first discovery
/// of a node fixes its parent, so equal-length paths resolve by edge order.
pub(crate) fn bfs_path(adjacency: &Adjacency, start: &SkillId, target: &SkillId) -> Option<Vec<SkillId>> {
    if start == target {
        return Some(vec![start.clone()]);
    }

    let mut parent: HashMap<&SkillId, &SkillId> = HashMap::new();
    let mut visited: HashSet<&SkillId> = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(id) = queue.pop_front() {
        for next in neighbours(adjacency, id) {
            if !visited.insert(next) {
                continue;
            }
            parent.insert(next, id);
            if next == target {
                let mut path = vec![next.clone()];
                let mut cursor = next;
                while let Some(prev) = parent.get(cursor) {
                    path.push((*prev).clone());
                    cursor = *prev;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

/// Everything reachable from `start` (excluding `start`).
pub(crate) fn closure(adjacency: &Adjacency, start: &SkillId) -> HashSet<SkillId> {
    let mut seen = HashSet::new();
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        for next in neighbours(adjacency, id) {
            if seen.insert(next.clone()) {
                stack.push(next);
            }
        }
    }
    seen
}

/// Kahn's algorithm restricted to `subset`; prerequisites come first and
/// ties go to the lower insertion rank.
pub(crate) fn topological_order(
    prerequisites: &Adjacency,
    dependents: &Adjacency,
    rank: &HashMap<SkillId, usize>,
    subset: &[SkillId],
) -> Vec<SkillId> {
    let members: HashSet<&SkillId> = subset.iter().collect();
    let rank_of = |id: &SkillId| rank.get(id).copied().unwrap_or(usize::MAX);

    let mut in_degree: HashMap<&SkillId, usize> = members
        .iter()
        .map(|id| {
            let count = neighbours(prerequisites, id)
                .iter()
                .filter(|p| members.contains(p))
                .count();
            (*id, count)
        })
        .collect();

    let mut ready: BTreeSet<(usize, &SkillId)> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| (rank_of(*id), *id))
        .collect();

    let mut sorted = Vec::with_capacity(members.len());
    while let Some(entry) = ready.pop_first() {
        let (_, id) = entry;
        sorted.push(id.clone());
        for dependent in neighbours(dependents, id) {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert((rank_of(dependent), dependent));
                }
            }
        }
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency(edges: &[(&str, &str)]) -> Adjacency {
        let mut adj = Adjacency::new();
        for (from, to) in edges {
            adj.entry(SkillId::from(*from)).or_default().push(SkillId::from(*to));
        }
        adj
    }

    fn ids(raw: &[&str]) -> Vec<SkillId> {
        raw.iter().map(|s| SkillId::from(*s)).collect()
    }

    #[test]
    fn test_bfs_prefers_first_inserted_edge_on_ties() {
        // a -> b -> d and a -> c -> d are both length 2
        let adj = adjacency(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let path = bfs_path(&adj, &SkillId::from("a"), &SkillId::from("d")).unwrap();
        assert_eq!(path, ids(&["a", "b", "d"]));
    }

    #[test]
    fn test_bfs_finds_shortest_not_first() {
        let adj = adjacency(&[("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")]);
        let path = bfs_path(&adj, &SkillId::from("a"), &SkillId::from("d")).unwrap();
        assert_eq!(path, ids(&["a", "d"]));
    }

    #[test]
    fn test_bfs_unreachable() {
        let adj = adjacency(&[("a", "b")]);
        assert!(bfs_path(&adj, &SkillId::from("b"), &SkillId::from("a")).is_none());
    }

    #[test]
    fn test_reaches_and_closure() {
        let adj = adjacency(&[("a", "b"), ("b", "c")]);
        assert!(reaches(&adj, &SkillId::from("a"), &SkillId::from("c")));
        assert!(!reaches(&adj, &SkillId::from("c"), &SkillId::from("a")));
        assert_eq!(closure(&adj, &SkillId::from("a")).len(), 2);
    }
}
