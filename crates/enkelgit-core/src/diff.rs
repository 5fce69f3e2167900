//! TOC diffing and three-way status classification.
//!
//! A diff maps each path to the receiver/base/giver hashes involved and a
//! status tag. When no base is supplied the receiver stands in for it,
//! which removes the three-way evidence needed for conflicts: two-way
//! diffs never report CONFLICT.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::objects::Toc;

/// Per-path change classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    Add,
    Modify,
    Delete,
    Same,
    Conflict,
}

impl DiffStatus {
    /// Short status code used in command output.
    pub fn code(self) -> &'static str {
        match self {
            DiffStatus::Add => "A",
            DiffStatus::Modify => "M",
            DiffStatus::Delete => "D",
            DiffStatus::Same => "SAME",
            DiffStatus::Conflict => "CONFLICT",
        }
    }
}

/// One path's entry in a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub status: DiffStatus,
    pub receiver: Option<String>,
    pub base: Option<String>,
    pub giver: Option<String>,
}

/// A full diff: path -> entry.
pub type Diff = BTreeMap<String, DiffEntry>;

/// Classify one path given its receiver, base, and giver hashes.
pub fn file_status(
    receiver: Option<&str>,
    base: Option<&str>,
    giver: Option<&str>,
) -> DiffStatus {
    if receiver == giver {
        return DiffStatus::Same;
    }
    match (receiver, base, giver) {
        (Some(r), b, Some(g)) => {
            if Some(r) != b && Some(g) != b {
                DiffStatus::Conflict
            } else {
                DiffStatus::Modify
            }
        }
        (None, None, Some(_)) | (Some(_), None, None) => DiffStatus::Add,
        (Some(_), Some(_), None) | (None, Some(_), Some(_)) => DiffStatus::Delete,
        _ => DiffStatus::Same,
    }
}

/// Three-way diff of two TOCs against an optional base TOC.
pub fn toc_diff(receiver: &Toc, giver: &Toc, base: Option<&Toc>) -> Diff {
    let base = base.unwrap_or(receiver);
    let paths: BTreeSet<&String> = receiver
        .keys()
        .chain(base.keys())
        .chain(giver.keys())
        .collect();

    paths
        .into_iter()
        .map(|path| {
            let r = receiver.get(path);
            let b = base.get(path);
            let g = giver.get(path);
            let entry = DiffEntry {
                status: file_status(
                    r.map(String::as_str),
                    b.map(String::as_str),
                    g.map(String::as_str),
                ),
                receiver: r.cloned(),
                base: b.cloned(),
                giver: g.cloned(),
            };
            (path.clone(), entry)
        })
        .collect()
}

/// The changed paths of a diff with their statuses; SAME rows drop out.
pub fn name_status(diff: &Diff) -> BTreeMap<String, DiffStatus> {
    diff.iter()
        .filter(|(_, entry)| entry.status != DiffStatus::Same)
        .map(|(path, entry)| (path.clone(), entry.status))
        .collect()
}
