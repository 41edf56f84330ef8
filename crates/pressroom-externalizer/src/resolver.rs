//! Temporal composition-graph resolver
//!
//! Turns one root version into every fully resolved combination of
//! composed versions, each pinned to the interval over which that
//! combination is valid.
//!
//! # Algorithm
//!
//! Pending trees are processed one at a time from a FIFO queue, and each
//! tree's nodes are expanded breadth first:
//!
//! 1. The node's composition references are grouped by target item, in
//!    first-appearance order.
//! 2. For each group the candidate versions (ascending sequence) are
//!    intersected with the tree's pinned interval. Candidates that do not
//!    overlap are dropped.
//! 3. The first overlapping candidate becomes a child and narrows the pinned
//!    interval. Every other overlapping candidate queues a copy of the tree
//!    as it was before this group, with that candidate as the child, resuming
//!    at the next group of the same node.
//! 4. A group without any overlapping candidate makes the tree incomplete and
//!    it is discarded.
//!
//! Finished trees are de-duplicated by [`TreeStructure`] and then merged.

use crate::merger::MergerFactory;
use crate::tree::{NodeArena, NodeId, NodeRef, PendingTree, TemporalReferenceTree, TreeStructure};
use crate::{ContentScope, ExternalizationError, ExternalizeError};
use pressroom_domain::traits::{ContentSource, VersionStore};
use pressroom_domain::{Interval, ItemUri, ValidationError, Version};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Resolves composition trees against a version graph
pub struct TemporalResolver<'a, G> {
    graph: &'a G,
    max_depth: usize,
}

impl<'a, G> TemporalResolver<'a, G>
where
    G: VersionStore + ContentSource,
{
    /// Create a resolver over `graph`; nesting deeper than `max_depth` fails
    pub fn new(graph: &'a G, max_depth: usize) -> Self {
        Self { graph, max_depth }
    }

    /// Resolve every valid combination for `root`, merging each with a fresh
    /// merger from `mergers`
    pub fn resolve(
        &self,
        root: &Version,
        mergers: &dyn MergerFactory,
    ) -> Result<Vec<TemporalReferenceTree>, ExternalizationError> {
        let mut arena = NodeArena::default();
        let root_id = arena.push(root.clone(), None);
        let mut queue = VecDeque::from([PendingTree::new(root.interval, root_id)]);

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        while let Some(tree) = queue.pop_front() {
            match self.expand(tree, &mut arena, &mut queue)? {
                Some(tree) => {
                    let structure = tree.structure(&arena);
                    if seen.insert(structure.clone()) {
                        resolved.push((tree, structure));
                    } else {
                        tracing::debug!(interval = %structure.interval, "Dropped duplicate tree");
                    }
                }
                None => tracing::debug!(version_id = %root.id, "Discarded incomplete tree"),
            }
        }

        tracing::debug!(
            version_id = %root.id,
            trees = resolved.len(),
            nodes = arena.len(),
            "Resolved composition trees"
        );

        let arena = Arc::new(arena);
        resolved
            .into_iter()
            .map(|(tree, structure)| self.finalize(&arena, tree, structure, mergers))
            .collect()
    }

    /// Drain `tree`'s pending nodes; `None` if a group had no candidate
    fn expand(
        &self,
        mut tree: PendingTree,
        arena: &mut NodeArena,
        queue: &mut VecDeque<PendingTree>,
    ) -> Result<Option<PendingTree>, ExternalizationError> {
        while tree.cursor < tree.nodes.len() {
            let node_id = tree.nodes[tree.cursor];
            let groups = composition_groups(&arena.get(node_id).version);

            while tree.next_group < groups.len() {
                let target = &groups[tree.next_group];
                self.guard(arena, node_id, target)?;

                let candidates = self.candidates(target, &tree.interval)?;
                let mut overlapping = candidates.into_iter();
                let Some((first, first_interval)) = overlapping.next() else {
                    tracing::debug!(item = %target, interval = %tree.interval, "No overlapping candidate");
                    return Ok(None);
                };

                for (alternative, interval) in overlapping {
                    let mut branch = tree.clone();
                    let child = arena.push(alternative, Some(node_id));
                    branch.nodes.push(child);
                    branch.interval = interval;
                    branch.next_group += 1;
                    queue.push_back(branch);
                }

                let child = arena.push(first, Some(node_id));
                tree.nodes.push(child);
                tree.interval = first_interval;
                tree.next_group += 1;
            }

            tree.cursor += 1;
            tree.next_group = 0;
        }
        Ok(Some(tree))
    }

    /// Candidate versions of `target` split into disjoint pieces of `pinned`
    ///
    /// Where two versions overlap, the higher sequence owns the shared time.
    /// Pieces come back in time order.
    fn candidates(
        &self,
        target: &ItemUri,
        pinned: &Interval,
    ) -> Result<Vec<(Version, Interval)>, ExternalizationError> {
        let mut versions = self
            .graph
            .find_versions(target, pinned)
            .map_err(|e| ExternalizationError::Store(e.to_string()))?;
        versions.retain(|v| !v.is_deleted());
        versions.sort_by_key(|v| std::cmp::Reverse((v.sequence, v.id)));

        let mut claimed: Vec<Interval> = Vec::new();
        let mut pieces = Vec::new();
        for version in versions {
            let Some(clipped) = version.interval.intersection(pinned) else {
                continue;
            };
            let mut free = vec![clipped];
            for taken in &claimed {
                free = free.iter().flat_map(|piece| piece.subtract(taken)).collect();
            }
            if free.len() != 1 || free[0] != clipped {
                tracing::debug!(
                    item = %target,
                    version_id = %version.id,
                    interval = %clipped,
                    "Newer version shadows part of this candidate"
                );
            }
            claimed.push(clipped);
            pieces.extend(free.into_iter().map(|piece| (version.clone(), piece)));
        }
        pieces.sort_by_key(|(_, piece)| piece.from());
        Ok(pieces)
    }

    fn guard(
        &self,
        arena: &NodeArena,
        parent: NodeId,
        target: &ItemUri,
    ) -> Result<(), ExternalizationError> {
        if arena.on_path(parent, target) {
            return Err(ExternalizationError::CompositionCycle {
                item: target.clone(),
            });
        }
        if arena.get(parent).depth() + 1 > self.max_depth {
            return Err(ExternalizationError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    /// Visit every node with a fresh merger and freeze the tree
    fn finalize(
        &self,
        arena: &Arc<NodeArena>,
        tree: PendingTree,
        structure: TreeStructure,
        mergers: &dyn MergerFactory,
    ) -> Result<TemporalReferenceTree, ExternalizationError> {
        let root = &arena.get(tree.nodes[0]).version;
        let mut merger = mergers.create(root);
        let scope = ContentScope::new();

        for &id in &tree.nodes {
            let node = arena.get(id);
            let content = self
                .graph
                .read_content(&node.version.content)
                .map_err(|e| ExternalizationError::ContentRead {
                    item: node.version.item.clone(),
                    reason: e.to_string(),
                })?;
            let _guard = scope.enter(content);
            merger.visit(NodeRef { id, node }, &scope)?;
        }

        let result = merger.finish()?;
        Ok(TemporalReferenceTree::new(
            Arc::clone(arena),
            tree,
            structure,
            result,
        ))
    }
}

/// Composition targets in first-appearance order, duplicates collapsed
fn composition_groups(version: &Version) -> Vec<ItemUri> {
    let mut groups: Vec<ItemUri> = Vec::new();
    for target in version.composition_targets() {
        if !groups.contains(target) {
            groups.push(target.clone());
        }
    }
    groups
}

/// Check that every composition reference of `version` has at least one
/// non-deleted target version overlapping the version's interval
pub fn check_complete<G>(graph: &G, version: &Version) -> Result<(), ExternalizeError>
where
    G: VersionStore,
{
    for target in composition_groups(version) {
        let found = graph
            .find_versions(&target, &version.interval)
            .map_err(ExternalizeError::store)?;
        if !found.iter().any(|v| !v.is_deleted() && v.interval.overlaps(&version.interval)) {
            return Err(ValidationError::IncompleteVersion {
                version: version.id.to_string(),
                missing: target.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pressroom_domain::{ContentRef, Reference};

    #[test]
    fn test_groups_collapse_duplicates_in_order() {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let version = Version::new("page", 1, Interval::starting_at(t), "text/plain", ContentRef::new("p"))
            .with_reference(Reference::composition("b"))
            .with_reference(Reference::link("z"))
            .with_reference(Reference::composition("a"))
            .with_reference(Reference::composition("b"));

        assert_eq!(
            composition_groups(&version),
            vec![ItemUri::new("b"), ItemUri::new("a")]
        );
    }
}
