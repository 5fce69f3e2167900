//! The staged snapshot.
//!
//! The index maps `(path, stage)` to a blob hash. Stage 0 holds normal
//! entries; stages 1/2/3 hold the base / receiver / giver versions of a
//! path while a merge conflict is unresolved. For any path the index has
//! one stage-0 entry XOR a subset of stages {1,2,3}, never both.
//!
//! On disk the index is `<path> <stage> <hash>\n` records; an empty index
//! is a single newline. Every mutation reads the whole map, edits it in
//! memory, and rewrites the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EnkelResult;
use crate::fsutil::replace_file;
use crate::hash::hash_bytes;
use crate::objects::{ObjectStore, Toc};

/// Conflict-resolution slot of an index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Normal, non-conflicted entry.
    Normal,
    /// Common ancestor version during a conflicted merge.
    Base,
    /// The side being merged into.
    Receiver,
    /// The side being merged in.
    Giver,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Stage::Normal => 0,
            Stage::Base => 1,
            Stage::Receiver => 2,
            Stage::Giver => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Stage> {
        match n {
            0 => Some(Stage::Normal),
            1 => Some(Stage::Base),
            2 => Some(Stage::Receiver),
            3 => Some(Stage::Giver),
            _ => None,
        }
    }
}

const ALL_STAGES: [Stage; 4] = [Stage::Normal, Stage::Base, Stage::Receiver, Stage::Giver];

/// The in-memory form of the index.
pub type IndexMap = BTreeMap<(String, Stage), String>;

/// Convert a TOC into an index of stage-0 entries.
pub fn toc_to_index(toc: &Toc) -> IndexMap {
    toc.iter()
        .map(|(path, hash)| ((path.clone(), Stage::Normal), hash.clone()))
        .collect()
}

/// The index file of one repository.
#[derive(Debug)]
pub struct Index {
    file: PathBuf,
}

impl Index {
    pub fn new(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
        }
    }

    /// Read the whole index. A missing or empty file is an empty map.
    pub fn read(&self) -> EnkelResult<IndexMap> {
        let mut map = IndexMap::new();
        let Ok(content) = fs::read_to_string(&self.file) else {
            return Ok(map);
        };
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            // Records are space-delimited from the right so a path may
            // itself contain spaces.
            let mut tokens = line.rsplitn(3, ' ');
            let (Some(hash), Some(stage), Some(path)) =
                (tokens.next(), tokens.next(), tokens.next())
            else {
                continue;
            };
            let Some(stage) = stage.parse::<u8>().ok().and_then(Stage::from_number) else {
                continue;
            };
            map.insert((path.to_string(), stage), hash.to_string());
        }
        Ok(map)
    }

    /// Rewrite the whole index.
    pub fn write(&self, map: &IndexMap) -> EnkelResult<()> {
        let lines: Vec<String> = map
            .iter()
            .map(|((path, stage), hash)| format!("{path} {} {hash}", stage.number()))
            .collect();
        replace_file(&self.file, format!("{}\n", lines.join("\n")).as_bytes())
    }

    /// The TOC of the stage-0 entries.
    pub fn toc(&self) -> EnkelResult<Toc> {
        Ok(self
            .read()?
            .into_iter()
            .filter(|((_, stage), _)| *stage == Stage::Normal)
            .map(|((path, _), hash)| (path, hash))
            .collect())
    }

    /// True if the index holds an entry for `(path, stage)`.
    pub fn has_file(&self, path: &str, stage: Stage) -> EnkelResult<bool> {
        Ok(self.read()?.contains_key(&(path.to_string(), stage)))
    }

    /// True if `path` has unresolved conflict stages.
    pub fn is_file_in_conflict(&self, path: &str) -> EnkelResult<bool> {
        self.has_file(path, Stage::Receiver)
    }

    /// All paths with unresolved conflict stages.
    pub fn conflicted_paths(&self) -> EnkelResult<Vec<String>> {
        Ok(self
            .read()?
            .into_keys()
            .filter(|(_, stage)| *stage == Stage::Receiver)
            .map(|(path, _)| path)
            .collect())
    }

    /// Stage `content` for `path`, replacing any prior entries.
    ///
    /// The blob is written to the object store and a stage-0 entry takes
    /// the place of whatever stages the path held before.
    pub fn write_non_conflict(
        &self,
        path: &str,
        content: &[u8],
        objects: &ObjectStore,
    ) -> EnkelResult<()> {
        let mut map = self.read()?;
        for stage in ALL_STAGES {
            map.remove(&(path.to_string(), stage));
        }
        let hash = objects.write(content)?;
        map.insert((path.to_string(), Stage::Normal), hash);
        self.write(&map)
    }

    /// Record a conflict for `path`: receiver and giver stages, plus the
    /// base stage when a base version exists. Any stage-0 entry goes.
    pub fn write_conflict(
        &self,
        path: &str,
        receiver_hash: &str,
        giver_hash: &str,
        base_hash: Option<&str>,
    ) -> EnkelResult<()> {
        let mut map = self.read()?;
        map.remove(&(path.to_string(), Stage::Normal));
        if let Some(base) = base_hash {
            map.insert((path.to_string(), Stage::Base), base.to_string());
        }
        map.insert((path.to_string(), Stage::Receiver), receiver_hash.to_string());
        map.insert((path.to_string(), Stage::Giver), giver_hash.to_string());
        self.write(&map)
    }

    /// Drop every stage of `path` from the index.
    pub fn write_rm(&self, path: &str) -> EnkelResult<()> {
        let mut map = self.read()?;
        for stage in ALL_STAGES {
            map.remove(&(path.to_string(), stage));
        }
        self.write(&map)
    }

    /// The TOC of tracked paths as they currently exist on disk.
    ///
    /// Paths no longer present are skipped; untracked files are never
    /// listed. Hashes reflect current on-disk content, unstored.
    pub fn working_copy_toc(&self, worktree: &Path) -> EnkelResult<Toc> {
        let mut toc = Toc::new();
        for (path, _) in self.read()?.into_keys() {
            let on_disk = worktree.join(&path);
            if on_disk.is_file() {
                toc.insert(path, hash_bytes(&fs::read(&on_disk)?));
            }
        }
        Ok(toc)
    }

    /// Indexed paths whose flat string begins with `prefix`.
    ///
    /// Matching is prefix-based, not glob-based. An empty prefix matches
    /// every tracked path.
    pub fn matching_files(&self, prefix: &str) -> EnkelResult<Vec<String>> {
        let mut paths: Vec<String> = self
            .read()?
            .into_keys()
            .map(|(path, _)| path)
            .filter(|p| p.starts_with(prefix))
            .collect();
        paths.dedup();
        Ok(paths)
    }
}
