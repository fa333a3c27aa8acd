use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CyclePolicy {
    /// A node revisited on the current path contributes level 0; the cycle is logged.
    #[default]
    Degrade,
    /// Fail with `LayoutError::Cycle`.
    Reject,
}

pub type LevelMap = HashMap<String, usize>;

/// Longest-path depth of every id in `step_ids`.
///
/// A node without incoming edges sits on level 0; otherwise its level is one more than the
/// deepest predecessor. Edges with an endpoint outside `step_ids` are ignored.
pub fn assign_levels(
    step_ids: &[&str],
    edges: &[(&str, &str)],
    policy: CyclePolicy,
) -> Result<LevelMap, LayoutError> {
    let known: HashSet<&str> = step_ids.iter().copied().collect();
    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    for &(from, to) in edges {
        if known.contains(from) && known.contains(to) {
            incoming.entry(to).or_default().push(from);
        }
    }

    let mut levels: HashMap<&str, usize> = HashMap::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();
    for &id in step_ids {
        settle(id, &incoming, &mut levels, policy, &mut cycles)?;
    }

    if let Some(first) = cycles.first() {
        tracing::warn!(
            cycle = %first.join(" -> "),
            count = cycles.len(),
            "step dependencies contain a cycle; levels along it are under-estimated"
        );
    }

    Ok(levels
        .into_iter()
        .map(|(id, level)| (id.to_string(), level))
        .collect())
}

struct Frame<'a> {
    id: &'a str,
    next_parent: usize,
    level: usize,
}

impl<'a> Frame<'a> {
    fn new(id: &'a str) -> Self {
        Self {
            id,
            next_parent: 0,
            level: 0,
        }
    }
}

/// Depth-first walk up the predecessors of `root` on an explicit stack, so chain length
/// is bounded by memory rather than the call stack. A predecessor already on the stack
/// closes a cycle.
fn settle<'a>(
    root: &'a str,
    incoming: &HashMap<&'a str, Vec<&'a str>>,
    levels: &mut HashMap<&'a str, usize>,
    policy: CyclePolicy,
    cycles: &mut Vec<Vec<String>>,
) -> Result<(), LayoutError> {
    if levels.contains_key(root) {
        return Ok(());
    }
    let mut stack = vec![Frame::new(root)];
    let mut on_path: HashMap<&'a str, usize> = HashMap::from([(root, 0)]);

    while let Some(top) = stack.last_mut() {
        let next = incoming
            .get(top.id)
            .and_then(|parents| parents.get(top.next_parent))
            .copied();
        let Some(parent) = next else {
            let (id, level) = (top.id, top.level);
            stack.pop();
            on_path.remove(id);
            levels.insert(id, level);
            if let Some(child) = stack.last_mut() {
                child.level = child.level.max(level + 1);
            }
            continue;
        };
        top.next_parent += 1;

        let parent_level = if let Some(&start) = on_path.get(parent) {
            let mut path: Vec<String> = stack[start..].iter().map(|f| f.id.to_string()).collect();
            path.push(parent.to_string());
            match policy {
                CyclePolicy::Reject => return Err(LayoutError::Cycle { path }),
                CyclePolicy::Degrade => {
                    cycles.push(path);
                    Some(0)
                }
            }
        } else if let Some(&level) = levels.get(parent) {
            Some(level)
        } else {
            on_path.insert(parent, stack.len());
            stack.push(Frame::new(parent));
            None
        };

        if let (Some(parent_level), Some(top)) = (parent_level, stack.last_mut()) {
            top.level = top.level.max(parent_level + 1);
        }
    }
    Ok(())
}

/// Buckets ids by level. Within a level ids keep their order in `step_ids`.
pub fn group_by_level(step_ids: &[&str], levels: &LevelMap) -> BTreeMap<usize, Vec<String>> {
    let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for &id in step_ids {
        if !seen.insert(id) {
            continue;
        }
        let level = levels.get(id).copied().unwrap_or(0);
        groups.entry(level).or_default().push(id.to_string());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(ids: &[&str], edges: &[(&str, &str)]) -> LevelMap {
        assign_levels(ids, edges, CyclePolicy::Degrade).unwrap()
    }

    #[test]
    fn chain_gets_increasing_levels() {
        let map = levels(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        assert_eq!(map["a"], 0);
        assert_eq!(map["b"], 1);
        assert_eq!(map["c"], 2);
    }

    #[test]
    fn isolated_nodes_sit_on_level_zero() {
        let map = levels(&["a", "b", "lonely"], &[("a", "b")]);
        assert_eq!(map["lonely"], 0);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn multiple_parents_take_longest_path() {
        // a -> b -> c -> d and a shortcut a -> d
        let map = levels(
            &["d", "c", "b", "a"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")],
        );
        assert_eq!(map["d"], 3);
    }

    #[test]
    fn edges_leaving_the_subset_are_ignored() {
        let map = levels(&["S2.1", "S2.2"], &[("S1.4", "S2.1"), ("S2.1", "S2.2")]);
        assert_eq!(map["S2.1"], 0);
        assert_eq!(map["S2.2"], 1);
    }

    #[test]
    fn two_cycle_terminates_with_levels_for_every_node() {
        let map = levels(&["a", "b"], &[("a", "b"), ("b", "a")]);
        assert_eq!(map.len(), 2);
        // a: b is visited via a, revisiting a yields 0, so b = 1 and a = 2.
        assert_eq!(map["b"], 1);
        assert_eq!(map["a"], 2);
    }

    #[test]
    fn self_loop_degrades() {
        let map = levels(&["a"], &[("a", "a")]);
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn reject_policy_reports_cycle_path() {
        let err = assign_levels(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "c"), ("c", "b")],
            CyclePolicy::Reject,
        )
        .unwrap_err();
        let LayoutError::Cycle { path } = err;
        assert_eq!(path.first(), path.last());
        assert!(path.contains(&"b".to_string()));
        assert!(path.contains(&"c".to_string()));
    }

    #[test]
    fn very_long_chain_does_not_exhaust_the_stack() {
        let names: Vec<String> = (0..100_000).map(|i| format!("S1.{i}")).collect();
        let ids: Vec<&str> = names.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = ids.windows(2).map(|pair| (pair[0], pair[1])).collect();
        // deepest step first, so the walk has to climb the whole chain at once
        let reversed: Vec<&str> = ids.iter().rev().copied().collect();
        let map = levels(&reversed, &edges);
        assert_eq!(map[ids[99_999]], 99_999);
        assert_eq!(map[ids[0]], 0);
    }

    #[test]
    fn reject_policy_accepts_dags() {
        let map = assign_levels(&["a", "b"], &[("a", "b")], CyclePolicy::Reject).unwrap();
        assert_eq!(map["b"], 1);
    }

    #[test]
    fn groups_keep_declaration_order_within_a_level() {
        let ids = ["x", "a", "m", "b"];
        let map = levels(&ids, &[("x", "m"), ("a", "b")]);
        let groups = group_by_level(&ids, &map);
        assert_eq!(groups[&0], vec!["x", "a"]);
        assert_eq!(groups[&1], vec!["m", "b"]);
    }
}
