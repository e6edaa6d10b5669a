use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::id::{ClusterId, GroupId, PolityId};

// --- Constants ---

/// Clusters above this size are split.
pub const MAX_CLUSTER_SIZE: usize = 50;

/// A split stops moving prominences once the parent is down to this size.
pub const MIN_SPLIT_CLUSTER_SIZE: usize = 25;

/// A contiguous set of one polity's prominences.
///
/// Members are keyed by group id; a group has at most one prominence per
/// polity, so `(group, polity)` identifies the prominence. Every prominence of
/// a polity belongs to exactly one of its clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolityProminenceCluster {
    pub id: ClusterId,
    pub polity: PolityId,
    pub prominences: BTreeSet<GroupId>,
}

impl PolityProminenceCluster {
    pub fn new(id: ClusterId, polity: PolityId) -> Self {
        Self {
            id,
            polity,
            prominences: BTreeSet::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.prominences.len()
    }

    pub fn contains(&self, group: GroupId) -> bool {
        self.prominences.contains(&group)
    }

    pub fn add_prominence(&mut self, group: GroupId) -> bool {
        self.prominences.insert(group)
    }

    pub fn remove_prominence(&mut self, group: GroupId) -> bool {
        self.prominences.remove(&group)
    }

    pub fn needs_split(&self) -> bool {
        self.size() > MAX_CLUSTER_SIZE
    }

    /// Move a contiguous chunk of this cluster, grown breadth-first from
    /// `start`, into a new cluster.
    ///
    /// Stops as soon as this cluster is down to `MIN_SPLIT_CLUSTER_SIZE`, so
    /// the result can be unbalanced. Each move removes from this cluster before
    /// adding to the new one. Returns an empty cluster if `start` is not a
    /// member.
    pub fn split<F>(&mut self, start: GroupId, new_id: ClusterId, neighbors: F) -> Self
    where
        F: Fn(GroupId) -> Vec<GroupId>,
    {
        let mut child = PolityProminenceCluster::new(new_id, self.polity);
        if !self.remove_prominence(start) {
            return child;
        }
        child.add_prominence(start);

        let mut queue = VecDeque::from([start]);
        'explore: while self.size() > MIN_SPLIT_CLUSTER_SIZE {
            let Some(group) = queue.pop_front() else {
                break;
            };
            for neighbor in neighbors(group) {
                if !self.remove_prominence(neighbor) {
                    continue;
                }
                child.add_prominence(neighbor);
                if self.size() <= MIN_SPLIT_CLUSTER_SIZE {
                    break 'explore;
                }
                queue.push_back(neighbor);
            }
        }

        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Groups on a line: group i neighbours i-1 and i+1.
    fn line_neighbors(g: GroupId) -> Vec<GroupId> {
        let mut v = Vec::new();
        if g.0 > 1 {
            v.push(GroupId(g.0 - 1));
        }
        v.push(GroupId(g.0 + 1));
        v
    }

    fn line_cluster(n: u64) -> PolityProminenceCluster {
        let mut c = PolityProminenceCluster::new(ClusterId(1), PolityId(7));
        for i in 1..=n {
            c.add_prominence(GroupId(i));
        }
        c
    }

    #[test]
    fn split_stops_at_min_size() {
        let mut parent = line_cluster(60);
        assert!(parent.needs_split());
        let child = parent.split(GroupId(60), ClusterId(2), line_neighbors);
        assert_eq!(parent.size(), MIN_SPLIT_CLUSTER_SIZE);
        assert_eq!(parent.size() + child.size(), 60);
        assert_eq!(child.polity, PolityId(7));
        assert!(parent.prominences.is_disjoint(&child.prominences));
        // Contiguous from the start.
        assert!(child.contains(GroupId(26)));
        assert!(!child.contains(GroupId(25)));
    }

    #[test]
    fn split_of_disconnected_start_moves_only_start() {
        let mut parent = line_cluster(30);
        parent.add_prominence(GroupId(100));
        let child = parent.split(GroupId(100), ClusterId(2), |_| Vec::new());
        assert_eq!(child.size(), 1);
        assert_eq!(parent.size(), 30);
    }

    #[test]
    fn split_with_missing_start_is_noop() {
        let mut parent = line_cluster(30);
        let child = parent.split(GroupId(999), ClusterId(2), line_neighbors);
        assert_eq!(child.size(), 0);
        assert_eq!(parent.size(), 30);
    }

    #[test]
    fn no_prominence_in_both_clusters() {
        let mut parent = line_cluster(51);
        let original = parent.prominences.clone();
        let child = parent.split(GroupId(20), ClusterId(3), line_neighbors);
        let union: BTreeSet<GroupId> = parent.prominences.union(&child.prominences).copied().collect();
        assert_eq!(union, original);
        assert!(parent.prominences.is_disjoint(&child.prominences));
    }
}
