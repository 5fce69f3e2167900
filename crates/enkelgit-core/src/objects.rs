//! Content-addressable object store.
//!
//! Objects live in `objects/` as one file per object, named by the content
//! hash of their serialized bytes. Three kinds exist: blobs (raw file
//! content), trees (newline-terminated `kind hash name` records), and
//! commits (fixed header layout). Objects are created by `write`, never
//! mutated, never deleted.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::EnkelResult;
use crate::hash::hash_bytes;

/// A flat table of contents: path -> blob hash.
pub type Toc = BTreeMap<String, String>;

/// The three object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
}

/// A node in a nested tree: a blob hash or a subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Blob(String),
    Dir(BTreeMap<String, TreeNode>),
}

/// Classify serialized object bytes by their first whitespace-delimited
/// token: `commit` and `tree` name themselves; everything else is a blob.
pub fn kind(bytes: &[u8]) -> ObjectKind {
    let text = String::from_utf8_lossy(bytes);
    match text.split_whitespace().next() {
        Some("commit") => ObjectKind::Commit,
        Some("tree") => ObjectKind::Tree,
        _ => ObjectKind::Blob,
    }
}

/// Parent hashes of serialized commit bytes. Empty for non-commits.
pub fn parents(bytes: &[u8]) -> Vec<String> {
    if kind(bytes) != ObjectKind::Commit {
        return Vec::new();
    }
    String::from_utf8_lossy(bytes)
        .lines()
        .filter_map(|line| line.strip_prefix("parent "))
        .map(|h| h.trim().to_string())
        .collect()
}

/// Tree hash of serialized commit bytes. None for non-commits.
pub fn tree_of(bytes: &[u8]) -> Option<String> {
    if kind(bytes) != ObjectKind::Commit {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let first = text.lines().next()?;
    first.split_whitespace().nth(1).map(String::from)
}

/// Convert a flat TOC into a nested tree of blobs and subdirectories.
pub fn nest_flat_toc(toc: &Toc) -> BTreeMap<String, TreeNode> {
    let mut root = BTreeMap::new();
    for (path, hash) in toc {
        let parts: Vec<&str> = path.split('/').collect();
        insert_nested(&mut root, &parts, hash);
    }
    root
}

fn insert_nested(dir: &mut BTreeMap<String, TreeNode>, parts: &[&str], hash: &str) {
    if parts.len() == 1 {
        dir.insert(parts[0].to_string(), TreeNode::Blob(hash.to_string()));
        return;
    }
    let entry = dir
        .entry(parts[0].to_string())
        .or_insert_with(|| TreeNode::Dir(BTreeMap::new()));
    if let TreeNode::Dir(sub) = entry {
        insert_nested(sub, &parts[1..], hash);
    }
}

/// Flatten a nested tree back into a TOC with `/`-joined paths.
pub fn flatten_tree(tree: &BTreeMap<String, TreeNode>) -> Toc {
    let mut toc = Toc::new();
    flatten_into(tree, "", &mut toc);
    toc
}

fn flatten_into(dir: &BTreeMap<String, TreeNode>, prefix: &str, toc: &mut Toc) {
    for (name, node) in dir {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        match node {
            TreeNode::Blob(hash) => {
                toc.insert(path, hash.clone());
            }
            TreeNode::Dir(sub) => flatten_into(sub, &path, toc),
        }
    }
}

/// The object store manages content-addressable storage on disk.
#[derive(Debug)]
pub struct ObjectStore {
    /// The `objects/` directory.
    root: PathBuf,
}

impl ObjectStore {
    /// Create an ObjectStore rooted at the given `objects/` directory.
    pub fn new(objects_dir: &Path) -> Self {
        Self {
            root: objects_dir.to_path_buf(),
        }
    }

    /// Store bytes and return their content hash.
    ///
    /// Writing the same content twice is a no-op that returns the
    /// existing hash.
    pub fn write(&self, data: &[u8]) -> EnkelResult<String> {
        let hash = hash_bytes(data);
        let path = self.root.join(&hash);
        if !path.exists() {
            fs::create_dir_all(&self.root)?;
            fs::write(&path, data)?;
        }
        Ok(hash)
    }

    /// Retrieve an object by hash. Unknown hashes yield None, not an error.
    pub fn read(&self, hash: &str) -> Option<Vec<u8>> {
        fs::read(self.root.join(hash)).ok()
    }

    /// Check whether an object exists.
    pub fn exists(&self, hash: &str) -> bool {
        self.root.join(hash).is_file()
    }

    /// The serialized bytes of every object in the store.
    pub fn all(&self) -> EnkelResult<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                out.push(fs::read(entry.path())?);
            }
        }
        Ok(out)
    }

    /// All ancestor hashes of a commit, by recursive closure over parents.
    ///
    /// Duplicates are preserved; callers that care about set membership
    /// deduplicate or use [`is_ancestor`](Self::is_ancestor).
    pub fn ancestors(&self, hash: &str) -> Vec<String> {
        let Some(bytes) = self.read(hash) else {
            return Vec::new();
        };
        let direct = parents(&bytes);
        let mut out = direct.clone();
        for p in &direct {
            out.extend(self.ancestors(p));
        }
        out
    }

    /// True if `candidate` is an ancestor of `descendant`.
    pub fn is_ancestor(&self, descendant: &str, candidate: &str) -> bool {
        self.ancestors(descendant).iter().any(|h| h == candidate)
    }

    /// True if the giver adds nothing: the receiver is defined and either
    /// equals the giver or already contains it as an ancestor.
    pub fn is_up_to_date(&self, receiver: Option<&str>, giver: &str) -> bool {
        match receiver {
            Some(r) => r == giver || self.is_ancestor(r, giver),
            None => false,
        }
    }

    /// Write a nested tree, depth-first, returning the root tree hash.
    pub fn write_tree(&self, tree: &BTreeMap<String, TreeNode>) -> EnkelResult<String> {
        let mut lines = Vec::new();
        for (name, node) in tree {
            match node {
                TreeNode::Blob(hash) => lines.push(format!("blob {hash} {name}")),
                TreeNode::Dir(sub) => {
                    let hash = self.write_tree(sub)?;
                    lines.push(format!("tree {hash} {name}"));
                }
            }
        }
        self.write(format!("{}\n", lines.join("\n")).as_bytes())
    }

    /// Read a tree object back into its nested form.
    ///
    /// An unknown hash yields an empty tree.
    pub fn read_tree(&self, hash: &str) -> BTreeMap<String, TreeNode> {
        let mut dir = BTreeMap::new();
        let Some(bytes) = self.read(hash) else {
            return dir;
        };
        for line in String::from_utf8_lossy(&bytes).lines() {
            let mut tokens = line.splitn(3, ' ');
            let (Some(entry_kind), Some(entry_hash), Some(name)) =
                (tokens.next(), tokens.next(), tokens.next())
            else {
                continue;
            };
            let node = if entry_kind == "tree" {
                TreeNode::Dir(self.read_tree(entry_hash))
            } else {
                TreeNode::Blob(entry_hash.to_string())
            };
            dir.insert(name.to_string(), node);
        }
        dir
    }

    /// Write a commit object pointing at `tree_hash` with the given
    /// message and parents, stamped with the current local time.
    pub fn write_commit(
        &self,
        tree_hash: &str,
        message: &str,
        parent_hashes: &[String],
    ) -> EnkelResult<String> {
        let date = Local::now().format("%a %b %e %H:%M:%S %Y %z");
        let mut out = format!("commit {tree_hash}\n");
        for p in parent_hashes {
            out.push_str(&format!("parent {p}\n"));
        }
        out.push_str(&format!("Date:  {date}\n\n    {message}\n"));
        self.write(out.as_bytes())
    }

    /// The flat TOC of the tree a commit points at.
    pub fn commit_toc(&self, commit_hash: &str) -> Toc {
        let Some(bytes) = self.read(commit_hash) else {
            return Toc::new();
        };
        match tree_of(&bytes) {
            Some(tree_hash) => flatten_tree(&self.read_tree(&tree_hash)),
            None => Toc::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(&dir.path().join("objects"));
        (dir, store)
    }

    #[test]
    fn test_write_then_read_round_trips() {
        let (_dir, store) = store();
        let hash = store.write(b"hello").unwrap();
        assert_eq!(store.read(&hash).unwrap(), b"hello");
    }

    #[test]
    fn test_write_is_deterministic() {
        let (_dir, store) = store();
        assert_eq!(store.write(b"same").unwrap(), store.write(b"same").unwrap());
    }

    #[test]
    fn test_read_unknown_is_none() {
        let (_dir, store) = store();
        assert!(store.read("deadbeefdeadbeef").is_none());
        assert!(!store.exists("deadbeefdeadbeef"));
    }

    #[test]
    fn test_kind_detection() {
        assert_eq!(kind(b"commit abc123\n"), ObjectKind::Commit);
        assert_eq!(kind(b"tree abc123 src\n"), ObjectKind::Tree);
        assert_eq!(kind(b"plain file content"), ObjectKind::Blob);
        assert_eq!(kind(b""), ObjectKind::Blob);
    }

    #[test]
    fn test_commit_serialization() {
        let (_dir, store) = store();
        let tree = store.write_tree(&BTreeMap::new()).unwrap();
        let c1 = store.write_commit(&tree, "first", &[]).unwrap();
        let bytes = store.read(&c1).unwrap();

        assert_eq!(kind(&bytes), ObjectKind::Commit);
        assert_eq!(tree_of(&bytes).unwrap(), tree);
        assert!(parents(&bytes).is_empty());

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(&format!("commit {tree}\n")));
        assert!(text.contains("Date:  "));
        assert!(text.ends_with("    first\n"));
    }

    #[test]
    fn test_commit_parents_in_order() {
        let (_dir, store) = store();
        let tree = store.write_tree(&BTreeMap::new()).unwrap();
        let a = store.write_commit(&tree, "a", &[]).unwrap();
        let b = store.write_commit(&tree, "b", &[a.clone()]).unwrap();
        let m = store
            .write_commit(&tree, "m", &[a.clone(), b.clone()])
            .unwrap();
        assert_eq!(parents(&store.read(&m).unwrap()), vec![a, b]);
    }

    #[test]
    fn test_parents_and_tree_of_on_non_commit() {
        assert!(parents(b"just a blob").is_empty());
        assert!(tree_of(b"just a blob").is_none());
    }

    #[test]
    fn test_tree_round_trip() {
        let (_dir, store) = store();
        let mut toc = Toc::new();
        toc.insert("a.txt".to_string(), "h-one-aaaaaaaaaa".to_string());
        toc.insert("src/lib.rs".to_string(), "h-two-bbbbbbbbbb".to_string());
        toc.insert("src/deep/mod.rs".to_string(), "h-three-cccccccc".to_string());

        let nested = nest_flat_toc(&toc);
        let hash = store.write_tree(&nested).unwrap();
        assert_eq!(store.read_tree(&hash), nested);
        assert_eq!(flatten_tree(&store.read_tree(&hash)), toc);
    }

    #[test]
    fn test_ancestors_walks_the_chain() {
        let (_dir, store) = store();
        let tree = store.write_tree(&BTreeMap::new()).unwrap();
        let c1 = store.write_commit(&tree, "one", &[]).unwrap();
        let c2 = store.write_commit(&tree, "two", &[c1.clone()]).unwrap();
        let c3 = store.write_commit(&tree, "three", &[c2.clone()]).unwrap();

        assert_eq!(store.ancestors(&c3), vec![c2.clone(), c1.clone()]);
        assert!(store.is_ancestor(&c3, &c1));
        assert!(!store.is_ancestor(&c1, &c3));
    }

    #[test]
    fn test_commit_is_not_its_own_ancestor() {
        let (_dir, store) = store();
        let tree = store.write_tree(&BTreeMap::new()).unwrap();
        let c1 = store.write_commit(&tree, "one", &[]).unwrap();
        let c2 = store.write_commit(&tree, "two", &[c1.clone()]).unwrap();
        assert!(!store.ancestors(&c1).contains(&c1));
        assert!(!store.ancestors(&c2).contains(&c2));
    }

    #[test]
    fn test_is_up_to_date() {
        let (_dir, store) = store();
        let tree = store.write_tree(&BTreeMap::new()).unwrap();
        let c1 = store.write_commit(&tree, "one", &[]).unwrap();
        let c2 = store.write_commit(&tree, "two", &[c1.clone()]).unwrap();

        assert!(store.is_up_to_date(Some(&c1), &c1));
        assert!(store.is_up_to_date(Some(&c2), &c1));
        assert!(!store.is_up_to_date(Some(&c1), &c2));
        assert!(!store.is_up_to_date(None, &c1));
    }

    #[test]
    fn test_commit_toc() {
        let (_dir, store) = store();
        let blob = store.write(b"content").unwrap();
        let mut toc = Toc::new();
        toc.insert("dir/file.txt".to_string(), blob);
        let tree = store.write_tree(&nest_flat_toc(&toc)).unwrap();
        let commit = store.write_commit(&tree, "snap", &[]).unwrap();
        assert_eq!(store.commit_toc(&commit), toc);
    }
}
