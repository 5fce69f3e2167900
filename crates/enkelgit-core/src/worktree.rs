//! Working-copy operations.
//!
//! Lists files under the working copy and applies diffs to it: adds and
//! modifications write blob content, deletions unlink, conflicts write a
//! whole-file marker artifact. After application, empty directories are
//! pruned, leaving the repository metadata directory alone.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::diff::{Diff, DiffStatus};
use crate::error::{EnkelError, EnkelResult};
use crate::objects::ObjectStore;
use crate::repo::ENKELGIT_DIR;

/// All regular files beneath `start`, as worktree-relative paths.
///
/// `start` may be the worktree root, a subdirectory, or a single file.
/// The metadata directory is skipped; a missing `start` yields nothing.
pub fn ls_recursive(worktree: &Path, start: &Path) -> EnkelResult<Vec<String>> {
    let mut files = Vec::new();
    if !start.exists() {
        return Ok(files);
    }
    for entry in WalkDir::new(start)
        .into_iter()
        .filter_entry(|e| e.file_name() != ENKELGIT_DIR)
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(worktree) {
            files.push(rel.to_string_lossy().to_string());
        }
    }
    files.sort();
    Ok(files)
}

/// Compose the conflict artifact for a path both sides changed.
pub fn compose_conflict(receiver: &[u8], giver: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"<<<<<<\n");
    out.extend_from_slice(receiver);
    out.extend_from_slice(b"\n======\n");
    out.extend_from_slice(giver);
    out.extend_from_slice(b"\n>>>>>>\n");
    out
}

/// Apply a diff to the working copy, then prune empty directories.
pub fn apply_diff(worktree: &Path, objects: &ObjectStore, diff: &Diff) -> EnkelResult<()> {
    for (path, entry) in diff {
        let target = worktree.join(path);
        match entry.status {
            DiffStatus::Add => {
                let hash = entry.receiver.as_deref().or(entry.giver.as_deref());
                write_file(&target, &read_blob(objects, hash)?)?;
            }
            DiffStatus::Modify => {
                write_file(&target, &read_blob(objects, entry.giver.as_deref())?)?;
            }
            DiffStatus::Conflict => {
                let receiver = read_blob(objects, entry.receiver.as_deref())?;
                let giver = read_blob(objects, entry.giver.as_deref())?;
                write_file(&target, &compose_conflict(&receiver, &giver))?;
            }
            DiffStatus::Delete => {
                if target.exists() {
                    fs::remove_file(&target)?;
                }
            }
            DiffStatus::Same => {}
        }
    }
    remove_empty_dirs(worktree)
}

fn read_blob(objects: &ObjectStore, hash: Option<&str>) -> EnkelResult<Vec<u8>> {
    let hash = hash.ok_or_else(|| EnkelError::Other("diff entry carries no hash".into()))?;
    objects
        .read(hash)
        .ok_or_else(|| EnkelError::Other(format!("object not found: {hash}")))
}

fn write_file(target: &Path, content: &[u8]) -> EnkelResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, content)?;
    Ok(())
}

/// Remove empty directories inside the working copy.
///
/// Children are visited before parents, so a chain of empty directories
/// collapses in one pass. The metadata directory is never touched, and
/// `remove_dir` refusing a non-empty directory is the emptiness test.
fn remove_empty_dirs(worktree: &Path) -> EnkelResult<()> {
    let enkelgit_dir = worktree.join(ENKELGIT_DIR);
    for entry in WalkDir::new(worktree)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        if entry.path().starts_with(&enkelgit_dir) {
            continue;
        }
        if entry.file_type().is_dir() && entry.path() != worktree {
            let _ = fs::remove_dir(entry.path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffEntry;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(ENKELGIT_DIR)).unwrap();
        let objects = ObjectStore::new(&dir.path().join(ENKELGIT_DIR).join("objects"));
        (dir, objects)
    }

    fn entry(
        status: DiffStatus,
        receiver: Option<&str>,
        giver: Option<&str>,
    ) -> DiffEntry {
        DiffEntry {
            status,
            receiver: receiver.map(String::from),
            base: None,
            giver: giver.map(String::from),
        }
    }

    #[test]
    fn test_ls_recursive_skips_metadata() {
        let (dir, _objects) = setup();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.rs"), "a").unwrap();
        fs::write(dir.path().join("top.txt"), "t").unwrap();
        fs::write(dir.path().join(ENKELGIT_DIR).join("HEAD"), "x").unwrap();

        let files = ls_recursive(dir.path(), dir.path()).unwrap();
        assert_eq!(files, vec!["src/a.rs".to_string(), "top.txt".to_string()]);
    }

    #[test]
    fn test_ls_recursive_on_single_file() {
        let (dir, _objects) = setup();
        fs::write(dir.path().join("one.txt"), "1").unwrap();
        let files = ls_recursive(dir.path(), &dir.path().join("one.txt")).unwrap();
        assert_eq!(files, vec!["one.txt".to_string()]);
        assert!(ls_recursive(dir.path(), &dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_apply_add_prefers_receiver() {
        let (dir, objects) = setup();
        let r = objects.write(b"from receiver").unwrap();
        let g = objects.write(b"from giver").unwrap();

        let mut diff = Diff::new();
        diff.insert("both.txt".into(), entry(DiffStatus::Add, Some(&r), Some(&g)));
        diff.insert("only-giver.txt".into(), entry(DiffStatus::Add, None, Some(&g)));
        apply_diff(dir.path(), &objects, &diff).unwrap();

        assert_eq!(fs::read(dir.path().join("both.txt")).unwrap(), b"from receiver");
        assert_eq!(fs::read(dir.path().join("only-giver.txt")).unwrap(), b"from giver");
    }

    #[test]
    fn test_apply_modify_takes_giver() {
        let (dir, objects) = setup();
        fs::write(dir.path().join("f.txt"), "old").unwrap();
        let r = objects.write(b"old").unwrap();
        let g = objects.write(b"new").unwrap();

        let mut diff = Diff::new();
        diff.insert("f.txt".into(), entry(DiffStatus::Modify, Some(&r), Some(&g)));
        apply_diff(dir.path(), &objects, &diff).unwrap();

        assert_eq!(fs::read(dir.path().join("f.txt")).unwrap(), b"new");
    }

    #[test]
    fn test_apply_delete_and_prune() {
        let (dir, objects) = setup();
        fs::create_dir_all(dir.path().join("deep/nested")).unwrap();
        fs::write(dir.path().join("deep/nested/f.txt"), "x").unwrap();
        let h = objects.write(b"x").unwrap();

        let mut diff = Diff::new();
        diff.insert(
            "deep/nested/f.txt".into(),
            entry(DiffStatus::Delete, Some(&h), None),
        );
        apply_diff(dir.path(), &objects, &diff).unwrap();

        assert!(!dir.path().join("deep/nested/f.txt").exists());
        assert!(!dir.path().join("deep").exists());
        assert!(dir.path().join(ENKELGIT_DIR).exists());
    }

    #[test]
    fn test_conflict_marker_format() {
        let (dir, objects) = setup();
        let r = objects.write(b"ours").unwrap();
        let g = objects.write(b"theirs").unwrap();

        let mut diff = Diff::new();
        diff.insert("a.txt".into(), entry(DiffStatus::Conflict, Some(&r), Some(&g)));
        apply_diff(dir.path(), &objects, &diff).unwrap();

        let artifact = fs::read_to_string(dir.path().join("a.txt")).unwrap();
        assert_eq!(artifact, "<<<<<<\nours\n======\ntheirs\n>>>>>>\n");
    }
}
