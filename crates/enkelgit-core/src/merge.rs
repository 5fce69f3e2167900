//! The merge engine's decision layer.
//!
//! Pure questions about two histories: their common ancestor, whether the
//! receiver can fast-forward to the giver, whether a fetch would rewrite
//! history, and the three-way diff between the two tips. Materialization
//! to index and working copy lives on the repository façade.

use crate::diff::{toc_diff, Diff, DiffStatus};
use crate::objects::ObjectStore;

/// Deterministic common ancestor of two commits.
///
/// The two hashes are sorted lexicographically and each prepended to its
/// own ancestor list; the pick is the first element of the first list
/// present in the second. This fixes the choice among equally eligible
/// ancestors.
pub fn common_ancestor(objects: &ObjectStore, a: &str, b: &str) -> Option<String> {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };

    let mut first_line = vec![first.to_string()];
    first_line.extend(objects.ancestors(first));
    let mut second_line = vec![second.to_string()];
    second_line.extend(objects.ancestors(second));

    first_line.into_iter().find(|h| second_line.contains(h))
}

/// True if the receiver can fast-forward to the giver: the receiver is
/// undefined, or is an ancestor of the giver.
pub fn can_fast_forward(objects: &ObjectStore, receiver: Option<&str>, giver: &str) -> bool {
    match receiver {
        None => true,
        Some(r) => objects.is_ancestor(giver, r),
    }
}

/// True if updating the receiver to the giver would discard history:
/// the receiver is defined and is not an ancestor of the giver.
pub fn is_force_fetch(objects: &ObjectStore, receiver: Option<&str>, giver: &str) -> bool {
    match receiver {
        None => false,
        Some(r) => !objects.is_ancestor(giver, r),
    }
}

/// Three-way TOC diff of two commits, based on their common ancestor.
pub fn merge_diff(objects: &ObjectStore, receiver_hash: &str, giver_hash: &str) -> Diff {
    let base_toc = common_ancestor(objects, receiver_hash, giver_hash)
        .map(|ancestor| objects.commit_toc(&ancestor))
        .unwrap_or_default();
    toc_diff(
        &objects.commit_toc(receiver_hash),
        &objects.commit_toc(giver_hash),
        Some(&base_toc),
    )
}

/// True if merging the giver into the receiver would conflict.
pub fn has_conflicts(objects: &ObjectStore, receiver_hash: &str, giver_hash: &str) -> bool {
    merge_diff(objects, receiver_hash, giver_hash)
        .values()
        .any(|entry| entry.status == DiffStatus::Conflict)
}
