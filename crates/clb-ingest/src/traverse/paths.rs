//! Root-to-node path sources

use std::collections::HashSet;

use clb_common::{ClbError, Label, Result};
use tracing::warn;

use super::order::TaxonomicOrder;
use crate::models::NodeId;
use crate::store::TaxonStore;

/// A root-to-node path, root first
pub type Path = Vec<NodeId>;

/// Lazy, forward-only producer of root-to-node paths in depth-first pre-order.
///
/// The store is passed on every call so the walker can keep writing to it
/// between paths.
pub trait PathSource<S: ?Sized> {
    fn next_path(&mut self, store: &S) -> Result<Option<Path>>;
}

/// Replays a precomputed sequence of paths
#[derive(Debug, Clone)]
pub struct FixedPaths<I> {
    paths: I,
}

impl<I> FixedPaths<I>
where
    I: Iterator<Item = Path>,
{
    pub fn new(paths: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            paths: paths.into_iter(),
        }
    }
}

impl<I, S: ?Sized> PathSource<S> for FixedPaths<I>
where
    I: Iterator<Item = Path>,
{
    fn next_path(&mut self, _store: &S) -> Result<Option<Path>> {
        Ok(self.paths.next())
    }
}

#[derive(Debug)]
struct Frame {
    node: NodeId,
    /// Ordered children, expanded on first visit
    children: Option<std::vec::IntoIter<NodeId>>,
}

/// Pre-order paths over the `PARENT_OF` forest of a store.
///
/// Root trees are visited one after another in sibling order. Children are
/// fetched lazily when their parent is first revisited and synonyms are
/// skipped, so only accepted taxa reach the walker. A skipped synonym takes
/// its own `PARENT_OF` subtree with it; each such synonym is logged and
/// counted in [`TaxonomicPaths::skipped_synonyms`].
#[derive(Debug)]
pub struct TaxonomicPaths {
    roots: std::vec::IntoIter<NodeId>,
    stack: Vec<Frame>,
    emitted: HashSet<NodeId>,
    skipped_synonyms: usize,
}

impl TaxonomicPaths {
    /// Walk every ROOT-labelled taxon of the store
    pub fn new<S: TaxonStore + ?Sized>(store: &S) -> Self {
        Self::with_roots(store, store.roots())
    }

    /// Walk the trees below the given roots only
    pub fn with_roots<S: TaxonStore + ?Sized>(store: &S, mut roots: Vec<NodeId>) -> Self {
        roots.retain(|node| !store.has_label(*node, Label::Synonym));
        TaxonomicOrder::sort(store, &mut roots);
        Self {
            roots: roots.into_iter(),
            stack: Vec::new(),
            emitted: HashSet::new(),
            skipped_synonyms: 0,
        }
    }

    /// Synonyms left out of the walk although they have children of their own
    pub fn skipped_synonyms(&self) -> usize {
        self.skipped_synonyms
    }

    fn open(&mut self, node: NodeId) -> Result<Path> {
        if !self.emitted.insert(node) {
            let path: Vec<String> = self.stack.iter().map(|f| f.node.to_string()).collect();
            return Err(ClbError::malformed(format!(
                "node {} reached twice below [{}]",
                node,
                path.join(", ")
            )));
        }
        self.stack.push(Frame {
            node,
            children: None,
        });
        Ok(self.stack.iter().map(|f| f.node).collect())
    }
}

impl<S: TaxonStore + ?Sized> PathSource<S> for TaxonomicPaths {
    fn next_path(&mut self, store: &S) -> Result<Option<Path>> {
        loop {
            let Some(top) = self.stack.last_mut() else {
                return match self.roots.next() {
                    Some(root) => self.open(root).map(Some),
                    None => Ok(None),
                };
            };

            let parent = top.node;
            let mut skipped = 0;
            let children = top.children.get_or_insert_with(|| {
                let (synonyms, mut children): (Vec<NodeId>, Vec<NodeId>) = store
                    .children_of(parent)
                    .into_iter()
                    .partition(|child| store.has_label(*child, Label::Synonym));
                for synonym in synonyms {
                    let stranded = store.children_of(synonym).len();
                    if stranded > 0 {
                        let taxon_id = store.taxon(synonym).map(|t| t.taxon_id.as_str()).unwrap_or_default();
                        warn!(taxon_id, stranded, "Synonym has children; its subtree is left out of the index");
                        skipped += 1;
                    }
                }
                TaxonomicOrder::sort(store, &mut children);
                children.into_iter()
            });
            self.skipped_synonyms += skipped;

            match children.next() {
                Some(child) => return self.open(child).map(Some),
                None => {
                    self.stack.pop();
                },
            }
        }
    }
}
