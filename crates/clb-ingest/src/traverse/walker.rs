//! Diff-based depth-first walker
//!
//! Each new path is compared with the previous one. Nodes of the previous
//! path below the common prefix are closed deepest first, then the new nodes
//! of the current path are opened top down. After the last path everything
//! still open is closed.

use std::collections::HashSet;

use clb_common::{ClbError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::paths::{Path, PathSource};
use crate::models::NodeId;
use crate::resolver::commit_batch;
use crate::store::TaxonStore;

/// Receives enter and exit events of the walk.
///
/// `path` is the root-to-node path of the event's node, the node itself last.
pub trait StartEndHandler<S: ?Sized> {
    fn start(&mut self, store: &mut S, node: NodeId, path: &[NodeId]) -> Result<()>;

    fn end(&mut self, store: &mut S, node: NodeId, path: &[NodeId]) -> Result<()>;
}

/// Counts of a finished walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    pub paths: u64,
    pub starts: u64,
    pub ends: u64,
    pub commits: u64,
}

/// Walk state: previous path, opened nodes and batch bookkeeping.
///
/// A walker is consumed by [`TaxonWalker::walk`]; a rerun needs a new one.
#[derive(Debug)]
pub struct TaxonWalker {
    batch_size: u64,
    progress_interval: u64,
    previous: Path,
    opened: HashSet<NodeId>,
    stats: WalkStats,
    events_since_commit: u64,
}

impl Default for TaxonWalker {
    fn default() -> Self {
        Self::new(10_000, 5_000)
    }
}

impl TaxonWalker {
    /// `progress_interval` of zero disables progress logging
    pub fn new(batch_size: usize, progress_interval: usize) -> Self {
        Self {
            batch_size: batch_size.max(1) as u64,
            progress_interval: progress_interval as u64,
            previous: Vec::new(),
            opened: HashSet::new(),
            stats: WalkStats::default(),
            events_since_commit: 0,
        }
    }

    /// Drive `handlers` with the events derived from `source`.
    ///
    /// The store is committed every `batch_size` events at the next path
    /// boundary and once at the end. Any error rolls back the open batch.
    pub fn walk<S, P>(
        mut self,
        store: &mut S,
        source: &mut P,
        handlers: &mut [&mut dyn StartEndHandler<S>],
    ) -> Result<WalkStats>
    where
        S: TaxonStore + ?Sized,
        P: PathSource<S> + ?Sized,
    {
        info!(batch_size = self.batch_size, "Walking taxonomic tree");
        store.begin();
        match self.run(store, source, handlers) {
            Ok(()) => {
                commit_batch(store)?;
                self.stats.commits += 1;
                info!(
                    paths = self.stats.paths,
                    starts = self.stats.starts,
                    ends = self.stats.ends,
                    commits = self.stats.commits,
                    "Walk complete"
                );
                Ok(self.stats)
            },
            Err(e) => {
                store.rollback();
                Err(e)
            },
        }
    }

    fn run<S, P>(
        &mut self,
        store: &mut S,
        source: &mut P,
        handlers: &mut [&mut dyn StartEndHandler<S>],
    ) -> Result<()>
    where
        S: TaxonStore + ?Sized,
        P: PathSource<S> + ?Sized,
    {
        while let Some(path) = source.next_path(&*store)? {
            self.step(store, path, handlers)?;

            if self.events_since_commit >= self.batch_size {
                commit_batch(store)?;
                self.stats.commits += 1;
                self.events_since_commit = 0;
                debug!(events = self.stats.starts + self.stats.ends, "Committed walk batch");
                store.begin();
            }
        }

        let previous = std::mem::take(&mut self.previous);
        self.close(store, &previous, 0, handlers)?;

        if self.stats.starts != self.stats.ends {
            return Err(ClbError::malformed(format!(
                "{} start events but {} end events",
                self.stats.starts, self.stats.ends
            )));
        }
        Ok(())
    }

    fn step<S>(
        &mut self,
        store: &mut S,
        path: Path,
        handlers: &mut [&mut dyn StartEndHandler<S>],
    ) -> Result<()>
    where
        S: TaxonStore + ?Sized,
    {
        if path.is_empty() {
            return Err(ClbError::malformed(format!(
                "empty path after {} paths",
                self.stats.paths
            )));
        }

        let previous = std::mem::take(&mut self.previous);
        let k = common_prefix(&previous, &path);
        if path.len() <= k {
            return Err(ClbError::malformed(format!(
                "path to {} opens no new node",
                path[path.len() - 1]
            )));
        }

        self.close(store, &previous, k, handlers)?;

        for depth in k..path.len() {
            let node = path[depth];
            if !self.opened.insert(node) {
                return Err(ClbError::malformed(format!("node {} visited twice", node)));
            }
            for handler in handlers.iter_mut() {
                handler.start(store, node, &path[..=depth])?;
            }
            self.stats.starts += 1;
            self.event();
        }

        self.stats.paths += 1;
        self.previous = path;
        Ok(())
    }

    /// End events for `path[from..]`, deepest first
    fn close<S>(
        &mut self,
        store: &mut S,
        path: &[NodeId],
        from: usize,
        handlers: &mut [&mut dyn StartEndHandler<S>],
    ) -> Result<()>
    where
        S: TaxonStore + ?Sized,
    {
        for depth in (from..path.len()).rev() {
            let node = path[depth];
            for handler in handlers.iter_mut() {
                handler.end(store, node, &path[..=depth])?;
            }
            self.stats.ends += 1;
            self.event();
        }
        Ok(())
    }

    fn event(&mut self) {
        self.events_since_commit += 1;
        let events = self.stats.starts + self.stats.ends;
        if self.progress_interval > 0 && events % self.progress_interval == 0 {
            debug!(events, paths = self.stats.paths, "Walk progress");
        }
    }
}

/// Length of the longest common prefix, compared by node identity
pub fn common_prefix(a: &[NodeId], b: &[NodeId]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::TaxonRecord;
    use crate::store::MemoryStore;
    use crate::traverse::FixedPaths;

    /// Records events as `+id` / `-id`
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl<S: TaxonStore + ?Sized> StartEndHandler<S> for Recorder {
        fn start(&mut self, _store: &mut S, node: NodeId, path: &[NodeId]) -> Result<()> {
            assert_eq!(path.last(), Some(&node));
            self.events.push(format!("+{}", node.as_u64()));
            Ok(())
        }

        fn end(&mut self, _store: &mut S, node: NodeId, path: &[NodeId]) -> Result<()> {
            assert_eq!(path.last(), Some(&node));
            self.events.push(format!("-{}", node.as_u64()));
            Ok(())
        }
    }

    fn store(n: usize) -> (MemoryStore, Vec<NodeId>) {
        let mut store = MemoryStore::new();
        let nodes = (0..n)
            .map(|i| store.insert(TaxonRecord::new(i.to_string())).unwrap())
            .collect();
        (store, nodes)
    }

    fn walk(store: &mut MemoryStore, paths: Vec<Path>, batch_size: usize) -> (Result<WalkStats>, Vec<String>) {
        let mut recorder = Recorder::default();
        let mut source = FixedPaths::new(paths);
        let mut handlers: [&mut dyn StartEndHandler<MemoryStore>; 1] = [&mut recorder];
        let result = TaxonWalker::new(batch_size, 0).walk(store, &mut source, &mut handlers);
        (result, recorder.events)
    }

    #[test]
    fn test_diff_events() {
        let (mut store, n) = store(5);
        let paths = vec![
            vec![n[0]],
            vec![n[0], n[1]],
            vec![n[0], n[1], n[2]],
            vec![n[0], n[3]],
            vec![n[4]],
        ];
        let (result, events) = walk(&mut store, paths, 100);
        let stats = result.unwrap();

        assert_eq!(
            events,
            vec!["+0", "+1", "+2", "-2", "-1", "+3", "-3", "-0", "+4", "-4"]
        );
        assert_eq!(stats.paths, 5);
        assert_eq!(stats.starts, 5);
        assert_eq!(stats.ends, 5);
        assert_eq!(stats.commits, 1);
    }

    #[test]
    fn test_multi_node_start() {
        let (mut store, n) = store(3);
        let (result, events) = walk(&mut store, vec![vec![n[0], n[1], n[2]]], 100);
        result.unwrap();
        assert_eq!(events, vec!["+0", "+1", "+2", "-2", "-1", "-0"]);
    }

    #[test]
    fn test_empty_walk() {
        let (mut store, _) = store(0);
        let (result, events) = walk(&mut store, vec![], 100);
        assert_eq!(result.unwrap().starts, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_commits_at_path_boundaries() {
        let (mut store, n) = store(4);
        let paths = vec![
            vec![n[0]],
            vec![n[0], n[1]],
            vec![n[0], n[1], n[2]],
            vec![n[3]],
        ];
        let (result, _) = walk(&mut store, paths, 2);
        let stats = result.unwrap();
        // after the second path, after the fourth path, and at the end
        assert_eq!(stats.commits, 3);
        assert_eq!(store.commits(), 3);
    }

    #[test]
    fn test_malformed_paths() {
        let (mut store, n) = store(3);

        let (result, _) = walk(&mut store, vec![vec![n[0]], vec![]], 100);
        assert!(matches!(result, Err(ClbError::MalformedTraversal(_))));

        let (result, _) = walk(&mut store, vec![vec![n[0], n[1]], vec![n[0]]], 100);
        assert!(matches!(result, Err(ClbError::MalformedTraversal(_))));

        let (result, _) = walk(&mut store, vec![vec![n[0]], vec![n[0]]], 100);
        assert!(matches!(result, Err(ClbError::MalformedTraversal(_))));

        let (result, _) = walk(&mut store, vec![vec![n[0], n[1]], vec![n[2], n[1]]], 100);
        assert!(matches!(result, Err(ClbError::MalformedTraversal(_))));

        assert!(!store.in_transaction());
    }

    #[test]
    fn test_common_prefix() {
        let a = [NodeId::new(1), NodeId::new(2), NodeId::new(3)];
        let b = [NodeId::new(1), NodeId::new(2), NodeId::new(4)];
        assert_eq!(common_prefix(&a, &b), 2);
        assert_eq!(common_prefix(&a, &[]), 0);
        assert_eq!(common_prefix(&a[..1], &a), 1);
    }
}
