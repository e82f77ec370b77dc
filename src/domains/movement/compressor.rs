use std::collections::{HashMap, HashSet};

use crate::domains::clustering::ClusterAggregator;

/// Visible duration of a step whose duration was not supplied.
pub const DEFAULT_STEP_MS: u64 = 1000;

/// Duration of leaf step `i`, falling back to the default when absent.
pub fn step_duration(durations: &[u64], i: usize) -> u64 {
    durations.get(i).copied().unwrap_or(DEFAULT_STEP_MS)
}

pub trait ClusterLookup {
    fn cluster_of(&self, location: &str) -> Option<&str>;
}

impl ClusterLookup for ClusterAggregator {
    fn cluster_of(&self, location: &str) -> Option<&str> {
        self.cluster_for_department(location)
    }
}

impl ClusterLookup for HashMap<String, String> {
    fn cluster_of(&self, location: &str) -> Option<&str> {
        self.get(location).map(String::as_str)
    }
}

/// A path ready for the scheduler: at least two locations and one duration per step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub path: Vec<String>,
    pub durations: Vec<u64>,
}

impl PlannedMove {
    /// Leaf path taken as-is; `None` when it has fewer than two locations.
    pub fn direct(path: &[String], durations: &[u64]) -> Option<Self> {
        if path.len() < 2 {
            return None;
        }
        Some(Self {
            path: path.to_vec(),
            durations: (0..path.len() - 1).map(|i| step_duration(durations, i)).collect(),
        })
    }

    pub fn total_ms(&self) -> u64 {
        self.durations.iter().fold(0, |total, &ms| total.saturating_add(ms))
    }
}

/// Result of run-length encoding a leaf path through the department→cluster map.
/// Accumulated times saturate at `u64::MAX` milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompressedPath {
    pub path: Vec<String>,
    /// Time accumulated while each coarse entry was current, one per entry.
    pub accumulated: Vec<u64>,
}

impl CompressedPath {
    pub fn is_animatable(&self) -> bool {
        self.path.len() >= 2
    }

    /// Per-step durations for the coarse path. The first step also carries the
    /// time accumulated inside the starting cluster, so the animation spends the
    /// whole accumulated time.
    pub fn step_durations(&self) -> Vec<u64> {
        if self.path.len() < 2 {
            return Vec::new();
        }
        (1..self.accumulated.len())
            .map(|k| {
                if k == 1 {
                    self.accumulated[0].saturating_add(self.accumulated[1])
                } else {
                    self.accumulated[k]
                }
            })
            .collect()
    }

    /// `None` when the compression is invalid (fewer than two coarse entries).
    pub fn into_move(self) -> Option<PlannedMove> {
        if !self.is_animatable() {
            return None;
        }
        let durations = self.step_durations();
        Some(PlannedMove {
            path: self.path,
            durations,
        })
    }
}

/// Compress a leaf path to cluster granularity.
///
/// Each leaf step is attributed to the cluster of its destination. Steps into
/// unmapped locations extend whichever cluster is accumulating; steps taken before
/// any cluster has been entered are discarded. A flush only happens on a cluster
/// change, so the output never repeats an entry back to back.
pub fn compress_to_clusters<L: ClusterLookup + ?Sized>(
    lookup: &L,
    path: &[String],
    durations: &[u64],
) -> CompressedPath {
    let mut out = CompressedPath::default();
    let Some(first) = path.first() else {
        return out;
    };

    let mut current: Option<&str> = lookup.cluster_of(first);
    let mut accumulated: u64 = 0;

    for i in 0..path.len() - 1 {
        let d = step_duration(durations, i);
        match lookup.cluster_of(&path[i + 1]) {
            None => {
                if current.is_some() {
                    accumulated = accumulated.saturating_add(d);
                }
            }
            Some(cluster) if Some(cluster) == current => accumulated = accumulated.saturating_add(d),
            Some(cluster) => {
                if let Some(previous) = current {
                    out.path.push(previous.to_string());
                    out.accumulated.push(accumulated);
                }
                current = Some(cluster);
                accumulated = d;
            }
        }
    }

    if let Some(last) = current {
        out.path.push(last.to_string());
        out.accumulated.push(accumulated);
    }
    out
}

/// Restrict a leaf path to the members of the entered cluster. Durations of steps
/// leaving a dropped location are dropped with it rather than merged.
pub fn filter_to_cluster(members: &[String], path: &[String], durations: &[u64]) -> Option<PlannedMove> {
    let members: HashSet<&str> = members.iter().map(String::as_str).collect();
    let kept: Vec<usize> = path
        .iter()
        .enumerate()
        .filter(|(_, location)| members.contains(location.as_str()))
        .map(|(i, _)| i)
        .collect();

    if kept.len() < 2 {
        return None;
    }

    Some(PlannedMove {
        path: kept.iter().map(|&i| path[i].clone()).collect(),
        durations: kept[..kept.len() - 1]
            .iter()
            .map(|&i| step_duration(durations, i))
            .collect(),
    })
}
