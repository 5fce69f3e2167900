//! Named references.
//!
//! A ref is a file beneath the repository metadata directory whose content
//! is a commit hash, or for HEAD optionally the symbolic form
//! `ref: refs/heads/<branch>`. HEAD is the only symbolic ref; resolution
//! never chases more than one hop.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EnkelError, EnkelResult};
use crate::fsutil::replace_file;
use crate::objects::ObjectStore;

/// Branch and remote name components: letters and dashes only.
///
/// Deliberately narrow; digits, underscores and slashes are rejected.
fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
}

/// True if `name` is a syntactically valid qualified ref.
pub fn is_ref(name: &str) -> bool {
    if matches!(name, "HEAD" | "FETCH_HEAD" | "MERGE_HEAD") {
        return true;
    }
    if let Some(branch) = name.strip_prefix("refs/heads/") {
        return is_name(branch);
    }
    if let Some(rest) = name.strip_prefix("refs/remotes/") {
        let mut parts = rest.split('/');
        return match (parts.next(), parts.next(), parts.next()) {
            (Some(remote), Some(branch), None) => is_name(remote) && is_name(branch),
            _ => false,
        };
    }
    false
}

/// Qualify a branch name as a local ref.
pub fn to_local_ref(name: &str) -> String {
    format!("refs/heads/{name}")
}

/// Qualify a branch name as a remote-tracking ref.
pub fn to_remote_ref(remote: &str, name: &str) -> String {
    format!("refs/remotes/{remote}/{name}")
}

/// The ref store manages the ref files of one repository.
#[derive(Debug)]
pub struct RefStore {
    /// The metadata directory (`.enkelgit/`, or the root when bare).
    repo_dir: PathBuf,
}

impl RefStore {
    pub fn new(repo_dir: &Path) -> Self {
        Self {
            repo_dir: repo_dir.to_path_buf(),
        }
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.repo_dir.join(name)
    }

    /// Raw trimmed content of a ref file, if present.
    fn read_ref_file(&self, name: &str) -> Option<String> {
        let content = fs::read_to_string(self.ref_path(name)).ok()?;
        Some(content.trim().to_string())
    }

    /// True if `name` is a valid ref whose file exists.
    pub fn exists(&self, name: &str) -> bool {
        is_ref(name) && self.ref_path(name).is_file()
    }

    /// Resolve a ref to its terminal qualified form.
    ///
    /// Attached HEAD resolves one hop through its symbolic pointer; any
    /// qualified ref is returned as-is; a bare name is assumed to be a
    /// local branch.
    pub fn terminal_ref(&self, name: &str) -> String {
        if name == "HEAD" && !self.is_head_detached() {
            if let Some(branch) = self.head_branch_name() {
                return to_local_ref(&branch);
            }
        }
        if is_ref(name) {
            name.to_string()
        } else {
            to_local_ref(name)
        }
    }

    /// Resolve a ref or hash to a commit hash.
    ///
    /// A string naming an existing object is already a hash. FETCH_HEAD
    /// resolves to the fetched hash recorded for the current branch.
    pub fn hash(&self, name: &str, objects: &ObjectStore) -> Option<String> {
        if objects.exists(name) {
            return Some(name.to_string());
        }
        let terminal = self.terminal_ref(name);
        if terminal == "FETCH_HEAD" {
            let branch = self.head_branch_name()?;
            self.fetch_head_branch_to_merge(&branch)
        } else if self.exists(&terminal) {
            self.read_ref_file(&terminal)
        } else {
            None
        }
    }

    /// Write a ref file. The name must pass the syntactic check.
    pub fn write(&self, name: &str, content: &str) -> EnkelResult<()> {
        if !is_ref(name) {
            return Err(EnkelError::InvalidRef(name.to_string()));
        }
        let path = self.ref_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        replace_file(&path, content.as_bytes())
    }

    /// Remove a ref file. Removing an absent ref is a no-op.
    pub fn remove(&self, name: &str) -> EnkelResult<()> {
        if self.exists(name) {
            fs::remove_file(self.ref_path(name))?;
        }
        Ok(())
    }

    /// True if HEAD holds a plain hash rather than a symbolic pointer.
    pub fn is_head_detached(&self) -> bool {
        match self.read_ref_file("HEAD") {
            Some(content) => !content.starts_with("ref:"),
            None => false,
        }
    }

    /// The branch HEAD is attached to, if any.
    pub fn head_branch_name(&self) -> Option<String> {
        if self.is_head_detached() {
            return None;
        }
        let content = self.read_ref_file("HEAD")?;
        content
            .strip_prefix("ref:")
            .map(str::trim)
            .and_then(|r| r.strip_prefix("refs/heads/"))
            .map(String::from)
    }

    /// All local branches: name -> hash.
    pub fn local_heads(&self) -> EnkelResult<BTreeMap<String, String>> {
        let mut heads = BTreeMap::new();
        let heads_dir = self.repo_dir.join("refs/heads");
        if !heads_dir.exists() {
            return Ok(heads);
        }
        for entry in fs::read_dir(&heads_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(hash) = self.read_ref_file(&to_local_ref(&name)) {
                heads.insert(name, hash);
            }
        }
        Ok(heads)
    }

    /// True if `branch` is the checked-out branch of a non-bare repository.
    pub fn is_checked_out(&self, branch: &str, bare: bool) -> bool {
        !bare && self.head_branch_name().as_deref() == Some(branch)
    }

    /// Parent hashes for the next commit: none for the initial commit,
    /// HEAD plus MERGE_HEAD while a merge is in progress, HEAD otherwise.
    pub fn commit_parent_hashes(&self, objects: &ObjectStore) -> Vec<String> {
        match self.hash("HEAD", objects) {
            None => Vec::new(),
            Some(head) => match self.hash("MERGE_HEAD", objects) {
                Some(merge_head) => vec![head, merge_head],
                None => vec![head],
            },
        }
    }

    /// The hash recorded in FETCH_HEAD for the given branch.
    ///
    /// FETCH_HEAD lines have the form `<hash> branch <name> of <url>`.
    pub fn fetch_head_branch_to_merge(&self, branch: &str) -> Option<String> {
        let content = self.read_ref_file("FETCH_HEAD")?;
        for line in content.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() >= 4
                && tokens[1] == "branch"
                && tokens[2] == branch
                && tokens[3] == "of"
            {
                return Some(tokens[0].to_string());
            }
        }
        None
    }
}
