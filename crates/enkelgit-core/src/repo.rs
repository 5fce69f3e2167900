//! Repository — the main entry point for enkelgit operations.
//!
//! A Repository ties the object store, ref store, index, and working copy
//! together behind one value holding the discovered roots. Nothing in the
//! core consults the process working directory: "on remote" is a second
//! Repository constructed at the remote's path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::diff::{self, Diff, DiffStatus};
use crate::error::{EnkelError, EnkelResult};
use crate::fsutil::replace_file;
use crate::index::{toc_to_index, Index, IndexMap, Stage};
use crate::merge;
use crate::objects::{self, nest_flat_toc, ObjectKind, ObjectStore, Toc};
use crate::refs::{self, RefStore};
use crate::worktree;

/// The repository metadata directory name.
pub const ENKELGIT_DIR: &str = ".enkelgit";

/// How `update_index` treats the given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexUpdate {
    /// Stage the file whether or not it is already tracked.
    Add,
    /// Restage only if already tracked; an untracked file is an error.
    Refresh,
    /// Drop the file from the index.
    Remove,
}

/// The record of a created commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// Branch name, or "detached HEAD".
    pub head: String,
    pub hash: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    AlreadyOn(String),
    SwitchedToBranch(String),
    DetachedAt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    AlreadyUpToDate,
    FastForward,
    /// Non-fast-forward merge stopped on these conflicted paths; a later
    /// commit completes it.
    Conflicted(Vec<String>),
    /// Non-fast-forward merge that closed cleanly with a merge commit.
    Merged(CommitSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub remote: String,
    pub remote_url: String,
    pub branch: String,
    pub object_count: usize,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    AlreadyUpToDate,
    Pushed {
        remote_url: String,
        branch: String,
        object_count: usize,
    },
}

/// What `status` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Attached branch name; None when HEAD is detached.
    pub branch: Option<String>,
    /// Top-level working-copy entries the index knows nothing about.
    pub untracked: Vec<String>,
    /// Paths with unresolved conflict stages.
    pub conflicted: Vec<String>,
    /// HEAD vs index.
    pub to_be_committed: BTreeMap<String, DiffStatus>,
    /// Index vs working copy.
    pub not_staged: BTreeMap<String, DiffStatus>,
}

/// An enkelgit repository.
#[derive(Debug)]
pub struct Repository {
    /// Working-copy root, or the metadata root itself when bare.
    root: PathBuf,
    /// The metadata directory: `<root>/.enkelgit`, or `root` when bare.
    repo_dir: PathBuf,
    objects: ObjectStore,
    refs: RefStore,
    index: Index,
}

impl Repository {
    // -------------------------------------------------------------------
    // Construction and discovery
    // -------------------------------------------------------------------

    /// Initialize a repository at `root`.
    ///
    /// Refuses to nest inside an existing repository. A bare repository
    /// keeps its metadata at the top level and has no working copy.
    pub fn init(root: &Path, bare: bool) -> EnkelResult<Repository> {
        fs::create_dir_all(root)?;
        if Self::discover(root).is_ok() {
            return Err(EnkelError::AlreadyARepo);
        }
        let repo_dir = if bare {
            root.to_path_buf()
        } else {
            root.join(ENKELGIT_DIR)
        };
        fs::create_dir_all(repo_dir.join("objects"))?;
        fs::create_dir_all(repo_dir.join("refs/heads"))?;
        fs::write(repo_dir.join("HEAD"), "ref: refs/heads/master\n")?;
        Config::new(bare).save(&repo_dir.join("config"))?;
        Self::open(root)
    }

    /// Open the repository rooted exactly at `root`.
    pub fn open(root: &Path) -> EnkelResult<Repository> {
        let root = root.canonicalize().map_err(|_| EnkelError::NotARepo)?;
        let repo_dir = if root.join(ENKELGIT_DIR).is_dir() {
            root.join(ENKELGIT_DIR)
        } else if is_bare_root(&root) {
            root.clone()
        } else {
            return Err(EnkelError::NotARepo);
        };
        Ok(Repository {
            objects: ObjectStore::new(&repo_dir.join("objects")),
            refs: RefStore::new(&repo_dir),
            index: Index::new(&repo_dir.join("index")),
            root,
            repo_dir,
        })
    }

    /// Walk up from `start` until a repository root is found.
    pub fn discover(start: &Path) -> EnkelResult<Repository> {
        let start = start.canonicalize().map_err(|_| EnkelError::NotARepo)?;
        let mut dir = start.as_path();
        loop {
            if is_bare_root(dir) || dir.join(ENKELGIT_DIR).is_dir() {
                return Self::open(dir);
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => return Err(EnkelError::NotARepo),
            }
        }
    }

    /// The working-copy root (or metadata root when bare).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The current configuration, read fresh from disk.
    pub fn config(&self) -> EnkelResult<Config> {
        Config::load(&self.repo_dir.join("config"))
    }

    pub fn is_bare(&self) -> EnkelResult<bool> {
        Ok(self.config()?.bare)
    }

    fn assert_not_bare(&self) -> EnkelResult<()> {
        if self.is_bare()? {
            Err(EnkelError::NotInWorkTree)
        } else {
            Ok(())
        }
    }

    /// Resolve a ref or hash to a commit hash.
    pub fn ref_hash(&self, name: &str) -> Option<String> {
        self.refs.hash(name, &self.objects)
    }

    /// The branch HEAD is attached to, if any.
    pub fn head_branch(&self) -> Option<String> {
        self.refs.head_branch_name()
    }

    /// The flat TOC of a commit.
    pub fn commit_toc(&self, hash: &str) -> Toc {
        self.objects.commit_toc(hash)
    }

    // -------------------------------------------------------------------
    // Staging
    // -------------------------------------------------------------------

    /// Stage every working-copy file under `pathspec`.
    pub fn add(&self, pathspec: &str) -> EnkelResult<Vec<String>> {
        self.assert_not_bare()?;
        let files = worktree::ls_recursive(&self.root, &self.resolve_pathspec(pathspec))?;
        if files.is_empty() {
            return Err(EnkelError::PathDidNotMatch(pathspec.to_string()));
        }
        for file in &files {
            self.update_index(file, IndexUpdate::Add)?;
        }
        Ok(files)
    }

    /// Bring one index entry in line with the working copy.
    ///
    /// `path` is worktree-relative. `Remove` drops the path's index
    /// entries whether or not the file is still on disk (the file itself
    /// is left alone), and refuses conflicted paths. `Add` and `Refresh`
    /// stage the on-disk content; `Refresh` additionally requires the
    /// path to be tracked already.
    pub fn update_index(&self, path: &str, mode: IndexUpdate) -> EnkelResult<()> {
        let on_disk = self.root.join(path);
        let is_on_disk = on_disk.exists();
        let is_in_index = self.index.has_file(path, Stage::Normal)?;

        if is_on_disk && on_disk.is_dir() {
            return Err(EnkelError::IsADirectory(path.to_string()));
        }
        match mode {
            IndexUpdate::Remove => {
                if self.index.is_file_in_conflict(path)? {
                    return Err(EnkelError::Unsupported);
                }
                if is_in_index {
                    self.index.write_rm(path)
                } else {
                    Ok(())
                }
            }
            IndexUpdate::Add | IndexUpdate::Refresh => {
                if !is_on_disk {
                    return Err(EnkelError::DoesNotExist(path.to_string()));
                }
                if mode == IndexUpdate::Refresh && !is_in_index {
                    return Err(EnkelError::CannotAddToIndex(path.to_string()));
                }
                self.index
                    .write_non_conflict(path, &fs::read(&on_disk)?, &self.objects)
            }
        }
    }

    /// Unstage and delete every indexed file under `pathspec`.
    pub fn rm(&self, pathspec: &str, recursive: bool, force: bool) -> EnkelResult<Vec<String>> {
        self.assert_not_bare()?;
        if force {
            return Err(EnkelError::Unsupported);
        }
        let files_to_rm = self.index.matching_files(&self.pathspec_prefix(pathspec))?;
        if files_to_rm.is_empty() {
            return Err(EnkelError::PathDidNotMatch(pathspec.to_string()));
        }
        if self.resolve_pathspec(pathspec).is_dir() && !recursive {
            return Err(EnkelError::NotRemovingRecursively(pathspec.to_string()));
        }
        let changed: Vec<String> = self
            .added_or_modified_files()?
            .into_iter()
            .filter(|p| files_to_rm.contains(p))
            .collect();
        if !changed.is_empty() {
            return Err(EnkelError::FilesHaveChanges(changed));
        }
        for file in &files_to_rm {
            let on_disk = self.root.join(file);
            if on_disk.exists() {
                fs::remove_file(&on_disk)?;
            }
            self.update_index(file, IndexUpdate::Remove)?;
        }
        Ok(files_to_rm)
    }

    // -------------------------------------------------------------------
    // Committing and branching
    // -------------------------------------------------------------------

    /// Commit the staged snapshot.
    ///
    /// While a merge is in progress the prewritten MERGE_MSG is used, the
    /// commit gets two parents, and MERGE_HEAD/MERGE_MSG are removed.
    pub fn commit(&self, message: Option<&str>) -> EnkelResult<CommitSummary> {
        self.assert_not_bare()?;
        let tree_hash = self.objects.write_tree(&nest_flat_toc(&self.index.toc()?))?;
        let head_desc = self
            .refs
            .head_branch_name()
            .unwrap_or_else(|| "detached HEAD".to_string());

        if let Some(head_hash) = self.ref_hash("HEAD") {
            let head_tree = self
                .objects
                .read(&head_hash)
                .and_then(|bytes| objects::tree_of(&bytes));
            if head_tree.as_deref() == Some(tree_hash.as_str()) {
                return Err(EnkelError::NothingToCommit(head_desc));
            }
        }

        let merge_in_progress = self.refs.exists("MERGE_HEAD");
        if merge_in_progress {
            let conflicted = self.index.conflicted_paths()?;
            if !conflicted.is_empty() {
                return Err(EnkelError::UnmergedFiles(conflicted));
            }
        }

        let message = if merge_in_progress {
            fs::read_to_string(self.repo_dir.join("MERGE_MSG"))?
        } else {
            message
                .ok_or_else(|| EnkelError::Other("commit message required".to_string()))?
                .to_string()
        };

        let parents = self.refs.commit_parent_hashes(&self.objects);
        let hash = self.objects.write_commit(&tree_hash, &message, &parents)?;
        self.update_ref("HEAD", &hash)?;
        if merge_in_progress {
            fs::remove_file(self.repo_dir.join("MERGE_MSG"))?;
            self.refs.remove("MERGE_HEAD")?;
        }
        Ok(CommitSummary {
            head: head_desc,
            hash,
            message,
        })
    }

    /// Point `ref_to_update`'s terminal ref at the commit `to` resolves to.
    pub fn update_ref(&self, ref_to_update: &str, to: &str) -> EnkelResult<()> {
        let hash = self
            .ref_hash(to)
            .ok_or_else(|| EnkelError::InvalidObjectName(to.to_string()))?;
        let bytes = self.objects.read(&hash).unwrap_or_default();
        if objects::kind(&bytes) != ObjectKind::Commit {
            return Err(EnkelError::RefPointsAtNonCommit {
                reference: ref_to_update.to_string(),
                hash,
            });
        }
        self.refs.write(&self.refs.terminal_ref(ref_to_update), &hash)
    }

    /// Local branches with a marker for the checked-out one.
    pub fn branches(&self) -> EnkelResult<Vec<(String, bool)>> {
        let current = self.refs.head_branch_name();
        Ok(self
            .refs
            .local_heads()?
            .into_keys()
            .map(|name| {
                let is_current = current.as_deref() == Some(name.as_str());
                (name, is_current)
            })
            .collect())
    }

    /// Create a branch at the current HEAD commit.
    pub fn create_branch(&self, name: &str) -> EnkelResult<()> {
        let head_hash = self.ref_hash("HEAD").ok_or_else(|| {
            let head = self
                .refs
                .head_branch_name()
                .unwrap_or_else(|| "HEAD".to_string());
            EnkelError::InvalidObjectName(head)
        })?;
        if self.refs.exists(&refs::to_local_ref(name)) {
            return Err(EnkelError::BranchAlreadyExists(name.to_string()));
        }
        self.refs.write(&refs::to_local_ref(name), &head_hash)
    }

    /// Switch the working copy, index, and HEAD to another commit.
    pub fn checkout(&self, target: &str) -> EnkelResult<CheckoutOutcome> {
        self.assert_not_bare()?;
        let to_hash = self
            .ref_hash(target)
            .ok_or_else(|| EnkelError::UnknownRef(target.to_string()))?;
        let bytes = self
            .objects
            .read(&to_hash)
            .ok_or_else(|| EnkelError::UnknownRef(target.to_string()))?;
        if objects::kind(&bytes) != ObjectKind::Commit {
            return Err(EnkelError::NotATree(target.to_string()));
        }

        let head_raw = fs::read_to_string(self.repo_dir.join("HEAD")).unwrap_or_default();
        if self.refs.head_branch_name().as_deref() == Some(target) || head_raw.trim() == target {
            return Ok(CheckoutOutcome::AlreadyOn(target.to_string()));
        }

        let clobbered = self.changed_files_commit_would_overwrite(&to_hash)?;
        if !clobbered.is_empty() {
            return Err(EnkelError::LocalChangesWouldBeLost(clobbered));
        }

        let detaching = self.objects.exists(target);
        let from_hash = self.ref_hash("HEAD");
        worktree::apply_diff(
            &self.root,
            &self.objects,
            &self.diff(from_hash.as_deref(), Some(&to_hash))?,
        )?;
        if detaching {
            self.refs.write("HEAD", &to_hash)?;
        } else {
            self.refs
                .write("HEAD", &format!("ref: {}\n", refs::to_local_ref(target)))?;
        }
        self.index
            .write(&toc_to_index(&self.objects.commit_toc(&to_hash)))?;

        if detaching {
            Ok(CheckoutOutcome::DetachedAt(to_hash))
        } else {
            Ok(CheckoutOutcome::SwitchedToBranch(target.to_string()))
        }
    }

    // -------------------------------------------------------------------
    // Diffing
    // -------------------------------------------------------------------

    /// Two-way diff with the spec'd version selection: a commit TOC when a
    /// hash is given, otherwise the index (first slot) or the working copy
    /// (second slot).
    pub fn diff(&self, h1: Option<&str>, h2: Option<&str>) -> EnkelResult<Diff> {
        let a = match h1 {
            Some(hash) => self.objects.commit_toc(hash),
            None => self.index.toc()?,
        };
        let b = match h2 {
            Some(hash) => self.objects.commit_toc(hash),
            None => self.index.working_copy_toc(&self.root)?,
        };
        Ok(diff::toc_diff(&a, &b, None))
    }

    /// The `diff` command: name-status between two optional revisions.
    pub fn diff_refs(
        &self,
        ref1: Option<&str>,
        ref2: Option<&str>,
    ) -> EnkelResult<BTreeMap<String, DiffStatus>> {
        self.assert_not_bare()?;
        let h1 = self.resolve_revision(ref1)?;
        let h2 = self.resolve_revision(ref2)?;
        Ok(diff::name_status(&self.diff(h1.as_deref(), h2.as_deref())?))
    }

    fn resolve_revision(&self, name: Option<&str>) -> EnkelResult<Option<String>> {
        match name {
            None => Ok(None),
            Some(r) => self
                .ref_hash(r)
                .map(Some)
                .ok_or_else(|| EnkelError::UnknownRevision(r.to_string())),
        }
    }

    /// Paths changed both in the working copy and by a checkout of `hash`.
    ///
    /// The safety guard for checkout and merge: overwriting these would
    /// destroy uncommitted work.
    pub fn changed_files_commit_would_overwrite(&self, hash: &str) -> EnkelResult<Vec<String>> {
        let head = self.ref_hash("HEAD");
        let local = diff::name_status(&self.diff(head.as_deref(), None)?);
        let incoming = diff::name_status(&self.diff(head.as_deref(), Some(hash))?);
        Ok(local
            .into_keys()
            .filter(|path| incoming.contains_key(path))
            .collect())
    }

    /// Working-copy paths added or modified relative to HEAD.
    pub fn added_or_modified_files(&self) -> EnkelResult<Vec<String>> {
        let head_toc = match self.ref_hash("HEAD") {
            Some(hash) => self.objects.commit_toc(&hash),
            None => Toc::new(),
        };
        let wc = diff::name_status(&diff::toc_diff(
            &head_toc,
            &self.index.working_copy_toc(&self.root)?,
            None,
        ));
        Ok(wc
            .into_iter()
            .filter(|(_, status)| *status != DiffStatus::Delete)
            .map(|(path, _)| path)
            .collect())
    }

    // -------------------------------------------------------------------
    // Merging
    // -------------------------------------------------------------------

    /// Merge the commit `target` resolves to into HEAD.
    pub fn merge(&self, target: &str) -> EnkelResult<MergeOutcome> {
        self.assert_not_bare()?;
        if self.refs.is_head_detached() {
            return Err(EnkelError::Unsupported);
        }
        let receiver = self.ref_hash("HEAD");
        let giver = match self.ref_hash(target) {
            Some(hash)
                if self
                    .objects
                    .read(&hash)
                    .is_some_and(|bytes| objects::kind(&bytes) == ObjectKind::Commit) =>
            {
                hash
            }
            _ => return Err(EnkelError::ExpectedCommit(target.to_string())),
        };

        if self.objects.is_up_to_date(receiver.as_deref(), &giver) {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }
        let clobbered = self.changed_files_commit_would_overwrite(&giver)?;
        if !clobbered.is_empty() {
            return Err(EnkelError::LocalChangesWouldBeLost(clobbered));
        }

        if merge::can_fast_forward(&self.objects, receiver.as_deref(), &giver) {
            self.write_fast_forward_merge(receiver.as_deref(), &giver)?;
            return Ok(MergeOutcome::FastForward);
        }

        // Receiver must exist here: an unborn HEAD always fast-forwards.
        let receiver = receiver.ok_or(EnkelError::Unsupported)?;
        self.write_non_fast_forward_merge(&receiver, &giver, target)?;
        if merge::has_conflicts(&self.objects, &receiver, &giver) {
            Ok(MergeOutcome::Conflicted(self.index.conflicted_paths()?))
        } else {
            Ok(MergeOutcome::Merged(self.commit(None)?))
        }
    }

    /// Move the current branch to the giver without creating a commit.
    fn write_fast_forward_merge(&self, receiver: Option<&str>, giver: &str) -> EnkelResult<()> {
        let branch = self.refs.head_branch_name().ok_or(EnkelError::Unsupported)?;
        self.refs.write(&refs::to_local_ref(&branch), giver)?;
        self.index
            .write(&toc_to_index(&self.objects.commit_toc(giver)))?;
        if !self.is_bare()? {
            let receiver_toc = receiver
                .map(|hash| self.objects.commit_toc(hash))
                .unwrap_or_default();
            worktree::apply_diff(
                &self.root,
                &self.objects,
                &diff::toc_diff(&receiver_toc, &self.objects.commit_toc(giver), None),
            )?;
        }
        Ok(())
    }

    /// Start a merge that needs a commit: record MERGE_HEAD and MERGE_MSG,
    /// rebuild the index from the merge diff, and materialize the working
    /// copy. A later commit completes the merge.
    fn write_non_fast_forward_merge(
        &self,
        receiver: &str,
        giver: &str,
        giver_ref: &str,
    ) -> EnkelResult<()> {
        self.refs.write("MERGE_HEAD", giver)?;

        let merge_diff = merge::merge_diff(&self.objects, receiver, giver);
        let branch = self.refs.head_branch_name().unwrap_or_default();
        let mut message = format!("Merge {giver_ref} into {branch}");
        let conflicted: Vec<&str> = merge_diff
            .iter()
            .filter(|(_, entry)| entry.status == DiffStatus::Conflict)
            .map(|(path, _)| path.as_str())
            .collect();
        if !conflicted.is_empty() {
            message.push_str("\nConflicts:\n");
            message.push_str(&conflicted.join("\n"));
        }
        replace_file(&self.repo_dir.join("MERGE_MSG"), message.as_bytes())?;

        // The index is rebuilt from scratch: conflicted paths get their
        // stage entries, everything else keeps whichever side survives,
        // deletions are simply omitted.
        self.index.write(&IndexMap::new())?;
        for (path, entry) in &merge_diff {
            match entry.status {
                DiffStatus::Conflict => {
                    if let (Some(receiver_hash), Some(giver_hash)) =
                        (&entry.receiver, &entry.giver)
                    {
                        self.index.write_conflict(
                            path,
                            receiver_hash,
                            giver_hash,
                            entry.base.as_deref(),
                        )?;
                    }
                }
                DiffStatus::Modify => {
                    if let Some(giver_hash) = &entry.giver {
                        let content = self.read_blob(giver_hash)?;
                        self.index.write_non_conflict(path, &content, &self.objects)?;
                    }
                }
                DiffStatus::Add | DiffStatus::Same => {
                    if let Some(hash) = entry.receiver.as_ref().or(entry.giver.as_ref()) {
                        let content = self.read_blob(hash)?;
                        self.index.write_non_conflict(path, &content, &self.objects)?;
                    }
                }
                DiffStatus::Delete => {}
            }
        }

        if !self.is_bare()? {
            worktree::apply_diff(&self.root, &self.objects, &merge_diff)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Remotes
    // -------------------------------------------------------------------

    /// Record a named remote in the config.
    pub fn remote_add(&self, name: &str, url: &str) -> EnkelResult<()> {
        let mut config = self.config()?;
        if config.remotes.contains_key(name) {
            return Err(EnkelError::RemoteAlreadyExists(name.to_string()));
        }
        config.remotes.insert(name.to_string(), url.to_string());
        config.save(&self.repo_dir.join("config"))
    }

    /// Copy a remote branch's objects here and advance the tracking ref.
    pub fn fetch(&self, remote: &str, branch: &str) -> EnkelResult<FetchSummary> {
        let config = self.config()?;
        let url = config
            .remotes
            .get(remote)
            .ok_or_else(|| EnkelError::NotARemoteRepo(remote.to_string()))?
            .clone();
        let remote_repo = Repository::open(&self.resolve_remote_path(&url))
            .map_err(|_| EnkelError::NotARemoteRepo(remote.to_string()))?;

        let new_hash = remote_repo
            .ref_hash(branch)
            .ok_or_else(|| EnkelError::RemoteRefNotFound(branch.to_string()))?;
        let remote_ref = refs::to_remote_ref(remote, branch);
        let old_hash = self.ref_hash(&remote_ref);

        let remote_objects = remote_repo.objects.all()?;
        let object_count = remote_objects.len();
        for bytes in &remote_objects {
            self.objects.write(bytes)?;
        }

        self.update_ref(&remote_ref, &new_hash)?;
        self.refs
            .write("FETCH_HEAD", &format!("{new_hash} branch {branch} of {url}\n"))?;

        Ok(FetchSummary {
            remote: remote.to_string(),
            remote_url: url,
            branch: branch.to_string(),
            object_count,
            forced: merge::is_force_fetch(&self.objects, old_hash.as_deref(), &new_hash),
        })
    }

    /// Fetch a remote branch, then merge FETCH_HEAD.
    pub fn pull(&self, remote: &str, branch: &str) -> EnkelResult<(FetchSummary, MergeOutcome)> {
        self.assert_not_bare()?;
        let fetched = self.fetch(remote, branch)?;
        let merged = self.merge("FETCH_HEAD")?;
        Ok((fetched, merged))
    }

    /// Send this repository's objects to a remote and advance its branch.
    pub fn push(&self, remote: &str, branch: &str, force: bool) -> EnkelResult<PushOutcome> {
        let config = self.config()?;
        let url = config
            .remotes
            .get(remote)
            .ok_or_else(|| EnkelError::NotARemoteRepo(remote.to_string()))?
            .clone();
        let remote_repo = Repository::open(&self.resolve_remote_path(&url))
            .map_err(|_| EnkelError::NotARemoteRepo(remote.to_string()))?;

        if remote_repo
            .refs
            .is_checked_out(branch, remote_repo.is_bare()?)
        {
            return Err(EnkelError::RefusingPushCheckedOut(branch.to_string()));
        }

        let receiver = remote_repo.ref_hash(branch);
        let giver = self
            .ref_hash(branch)
            .ok_or_else(|| EnkelError::InvalidObjectName(branch.to_string()))?;

        if self.objects.is_up_to_date(receiver.as_deref(), &giver) {
            return Ok(PushOutcome::AlreadyUpToDate);
        }
        if !force && !merge::can_fast_forward(&self.objects, receiver.as_deref(), &giver) {
            return Err(EnkelError::PushNonFastForward(url));
        }

        // Objects land on the remote before any ref points at them.
        let local_objects = self.objects.all()?;
        let object_count = local_objects.len();
        for bytes in &local_objects {
            remote_repo.objects.write(bytes)?;
        }
        remote_repo.update_ref(&refs::to_local_ref(branch), &giver)?;
        self.update_ref(&refs::to_remote_ref(remote, branch), &giver)?;

        Ok(PushOutcome::Pushed {
            remote_url: url,
            branch: branch.to_string(),
            object_count,
        })
    }

    /// Copy a repository on the local filesystem.
    ///
    /// The target gets `origin` pointing at the resolved source path; if
    /// the source has a master branch, its history is fetched and the
    /// target fast-forwarded onto it.
    pub fn clone_repo(source: &Path, target: &Path, bare: bool) -> EnkelResult<Repository> {
        let source = source
            .canonicalize()
            .map_err(|_| EnkelError::CloneSourceMissing(source.display().to_string()))?;
        let source_repo = Repository::open(&source)
            .map_err(|_| EnkelError::CloneSourceMissing(source.display().to_string()))?;

        if target.exists() && fs::read_dir(target)?.next().is_some() {
            return Err(EnkelError::TargetNotEmpty(target.display().to_string()));
        }

        let target_repo = Repository::init(target, bare)?;
        target_repo.remote_add("origin", &source.display().to_string())?;
        if let Some(remote_head) = source_repo.ref_hash("master") {
            target_repo.fetch("origin", "master")?;
            target_repo.write_fast_forward_merge(None, &remote_head)?;
        }
        Ok(target_repo)
    }

    // -------------------------------------------------------------------
    // Status
    // -------------------------------------------------------------------

    pub fn status(&self) -> EnkelResult<StatusReport> {
        self.assert_not_bare()?;

        // Untracked listing is top-level only and must also skip paths
        // parked in conflict stages, so it checks every stage's paths.
        let indexed: Vec<String> = self
            .index
            .read()?
            .into_keys()
            .map(|(path, _)| path)
            .collect();
        let mut untracked = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if name != ENKELGIT_DIR && !indexed.iter().any(|p| p == &name) {
                untracked.push(name);
            }
        }
        untracked.sort();

        let head_toc = match self.ref_hash("HEAD") {
            Some(hash) => self.objects.commit_toc(&hash),
            None => Toc::new(),
        };
        let to_be_committed =
            diff::name_status(&diff::toc_diff(&head_toc, &self.index.toc()?, None));
        let not_staged = diff::name_status(&self.diff(None, None)?);

        Ok(StatusReport {
            branch: self.refs.head_branch_name(),
            untracked,
            conflicted: self.index.conflicted_paths()?,
            to_be_committed,
            not_staged,
        })
    }

    // -------------------------------------------------------------------
    // Path helpers
    // -------------------------------------------------------------------

    /// A worktree-relative pathspec as an on-disk path.
    fn resolve_pathspec(&self, pathspec: &str) -> PathBuf {
        match self.pathspec_prefix(pathspec).as_str() {
            "" => self.root.clone(),
            rel => self.root.join(rel),
        }
    }

    /// A pathspec as an index prefix: "." means everything.
    fn pathspec_prefix(&self, pathspec: &str) -> String {
        let trimmed = pathspec.trim_start_matches("./");
        if trimmed == "." {
            String::new()
        } else {
            trimmed.to_string()
        }
    }

    fn resolve_remote_path(&self, url: &str) -> PathBuf {
        let path = Path::new(url);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn read_blob(&self, hash: &str) -> EnkelResult<Vec<u8>> {
        self.objects
            .read(hash)
            .ok_or_else(|| EnkelError::Other(format!("object not found: {hash}")))
    }
}

/// A bare repository root is a directory whose own `config` file declares
/// a `[core]` section.
fn is_bare_root(dir: &Path) -> bool {
    let config_file = dir.join("config");
    config_file.is_file()
        && fs::read_to_string(&config_file)
            .map(|content| content.contains("[core]"))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use tempfile::tempdir;

    fn init_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path(), false).unwrap();
        (dir, repo)
    }

    fn write_file(repo: &Repository, path: &str, content: &str) {
        let full = repo.root().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    #[test]
    fn test_init_creates_structure() {
        let (dir, repo) = init_repo();
        assert!(dir.path().join(".enkelgit/objects").is_dir());
        assert!(dir.path().join(".enkelgit/refs/heads").is_dir());
        assert_eq!(
            fs::read_to_string(dir.path().join(".enkelgit/HEAD")).unwrap(),
            "ref: refs/heads/master\n"
        );
        assert!(!repo.is_bare().unwrap());
    }

    #[test]
    fn test_init_twice_fails() {
        let (dir, _repo) = init_repo();
        assert!(matches!(
            Repository::init(dir.path(), false).unwrap_err(),
            EnkelError::AlreadyARepo
        ));
    }

    #[test]
    fn test_discover_walks_up() {
        let (dir, _repo) = init_repo();
        let nested = dir.path().join("src/deeply/nested");
        fs::create_dir_all(&nested).unwrap();
        let repo = Repository::discover(&nested).unwrap();
        assert_eq!(repo.root(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_discover_outside_any_repo_fails() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Repository::discover(dir.path()).unwrap_err(),
            EnkelError::NotARepo
        ));
    }

    #[test]
    fn test_bare_repo_rejects_worktree_operations() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path(), true).unwrap();
        assert!(repo.is_bare().unwrap());
        assert!(matches!(
            repo.add(".").unwrap_err(),
            EnkelError::NotInWorkTree
        ));
        assert!(matches!(
            repo.status().unwrap_err(),
            EnkelError::NotInWorkTree
        ));
    }

    // --- Scenario: init, add, commit ---

    #[test]
    fn test_init_add_commit() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "hi");
        repo.add("a").unwrap();
        let summary = repo.commit(Some("first")).unwrap();
        assert_eq!(summary.head, "master");

        let c1 = repo.ref_hash("HEAD").unwrap();
        assert_eq!(c1, summary.hash);
        assert_eq!(repo.commit_toc(&c1)["a"], hash_bytes(b"hi"));

        let err = repo.commit(Some("first")).unwrap_err();
        assert!(matches!(err, EnkelError::NothingToCommit(_)));
        assert!(err
            .to_string()
            .contains("nothing to commit, working directory clean"));
    }

    #[test]
    fn test_add_unchanged_file_leaves_index_alone() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "hi");
        repo.add("a").unwrap();
        let before = repo.index.read().unwrap();
        repo.add("a").unwrap();
        assert_eq!(repo.index.read().unwrap(), before);
    }

    #[test]
    fn test_add_of_missing_path_fails() {
        let (_dir, repo) = init_repo();
        assert!(matches!(
            repo.add("no-such-file").unwrap_err(),
            EnkelError::PathDidNotMatch(_)
        ));
    }

    #[test]
    fn test_add_directory_stages_files_inside() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "src/a.rs", "a");
        write_file(&repo, "src/b.rs", "b");
        let staged = repo.add("src").unwrap();
        assert_eq!(staged, vec!["src/a.rs".to_string(), "src/b.rs".to_string()]);
    }

    // --- Scenario: branching and divergence ---

    #[test]
    fn test_branch_checkout_commit() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "hi");
        repo.add("a").unwrap();
        let c1 = repo.commit(Some("first")).unwrap().hash;

        repo.create_branch("feature").unwrap();
        assert_eq!(
            repo.checkout("feature").unwrap(),
            CheckoutOutcome::SwitchedToBranch("feature".to_string())
        );
        write_file(&repo, "a", "hi2");
        repo.add("a").unwrap();
        let c2 = repo.commit(Some("two")).unwrap().hash;

        assert_eq!(repo.ref_hash("master").unwrap(), c1);
        assert_eq!(repo.ref_hash("feature").unwrap(), c2);
        assert!(repo.objects.ancestors(&c2).contains(&c1));

        let branches = repo.branches().unwrap();
        assert_eq!(
            branches,
            vec![("feature".to_string(), true), ("master".to_string(), false)]
        );
    }

    #[test]
    fn test_branch_errors() {
        let (_dir, repo) = init_repo();
        // No commit yet: nothing for the branch to point at.
        assert!(matches!(
            repo.create_branch("feature").unwrap_err(),
            EnkelError::InvalidObjectName(_)
        ));

        write_file(&repo, "a", "hi");
        repo.add("a").unwrap();
        repo.commit(Some("first")).unwrap();

        repo.create_branch("feature").unwrap();
        assert!(matches!(
            repo.create_branch("feature").unwrap_err(),
            EnkelError::BranchAlreadyExists(_)
        ));
        assert!(matches!(
            repo.create_branch("feature2").unwrap_err(),
            EnkelError::InvalidRef(_)
        ));
    }

    #[test]
    fn test_checkout_unknown_and_non_commit_targets() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "hi");
        repo.add("a").unwrap();
        repo.commit(Some("first")).unwrap();

        assert!(matches!(
            repo.checkout("no-such").unwrap_err(),
            EnkelError::UnknownRef(_)
        ));

        let blob = repo.objects.write(b"not a commit").unwrap();
        assert!(matches!(
            repo.checkout(&blob).unwrap_err(),
            EnkelError::NotATree(_)
        ));
    }

    #[test]
    fn test_checkout_detaches_on_hash() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "hi");
        repo.add("a").unwrap();
        let c1 = repo.commit(Some("first")).unwrap().hash;
        write_file(&repo, "a", "hi2");
        repo.add("a").unwrap();
        repo.commit(Some("second")).unwrap();

        assert_eq!(
            repo.checkout(&c1).unwrap(),
            CheckoutOutcome::DetachedAt(c1.clone())
        );
        assert!(repo.refs.is_head_detached());
        assert_eq!(fs::read_to_string(repo.root().join("a")).unwrap(), "hi");
        assert_eq!(
            repo.checkout(&c1).unwrap(),
            CheckoutOutcome::AlreadyOn(c1.clone())
        );

        // Merging into a detached HEAD is refused.
        assert!(matches!(
            repo.merge("master").unwrap_err(),
            EnkelError::Unsupported
        ));
    }

    // --- Scenario: fast-forward merge ---

    #[test]
    fn test_fast_forward_merge() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "hi");
        repo.add("a").unwrap();
        repo.commit(Some("first")).unwrap();

        repo.create_branch("feature").unwrap();
        repo.checkout("feature").unwrap();
        write_file(&repo, "a", "hi2");
        write_file(&repo, "sub/new.txt", "fresh");
        repo.add(".").unwrap();
        let c2 = repo.commit(Some("two")).unwrap().hash;

        repo.checkout("master").unwrap();
        assert_eq!(repo.merge("feature").unwrap(), MergeOutcome::FastForward);

        // Branch, index, and working copy all land on the giver's snapshot.
        assert_eq!(repo.ref_hash("master").unwrap(), c2);
        assert_eq!(repo.index.toc().unwrap(), repo.commit_toc(&c2));
        assert_eq!(
            repo.index.working_copy_toc(repo.root()).unwrap(),
            repo.commit_toc(&c2)
        );
        assert_eq!(fs::read_to_string(repo.root().join("a")).unwrap(), "hi2");

        // Merging an ancestor changes nothing.
        repo.checkout("feature").unwrap();
        assert_eq!(repo.merge("master").unwrap(), MergeOutcome::AlreadyUpToDate);
    }

    // --- Scenario: conflicted merge and resolution ---

    fn divergent_repo() -> (tempfile::TempDir, Repository) {
        let (dir, repo) = init_repo();
        write_file(&repo, "a", "x");
        repo.add("a").unwrap();
        repo.commit(Some("base")).unwrap();

        repo.create_branch("other").unwrap();
        write_file(&repo, "a", "y");
        repo.add("a").unwrap();
        repo.commit(Some("ours")).unwrap();

        repo.checkout("other").unwrap();
        write_file(&repo, "a", "z");
        repo.add("a").unwrap();
        repo.commit(Some("theirs")).unwrap();

        repo.checkout("master").unwrap();
        (dir, repo)
    }

    #[test]
    fn test_conflicted_merge_and_resolution() {
        let (_dir, repo) = divergent_repo();
        let outcome = repo.merge("other").unwrap();
        assert_eq!(outcome, MergeOutcome::Conflicted(vec!["a".to_string()]));

        assert!(repo.refs.exists("MERGE_HEAD"));
        let map = repo.index.read().unwrap();
        assert_eq!(map[&("a".to_string(), Stage::Base)], hash_bytes(b"x"));
        assert_eq!(map[&("a".to_string(), Stage::Receiver)], hash_bytes(b"y"));
        assert_eq!(map[&("a".to_string(), Stage::Giver)], hash_bytes(b"z"));
        assert!(!map.contains_key(&("a".to_string(), Stage::Normal)));

        assert_eq!(
            fs::read_to_string(repo.root().join("a")).unwrap(),
            "<<<<<<\ny\n======\nz\n>>>>>>\n"
        );

        let status = repo.status().unwrap();
        assert_eq!(status.conflicted, vec!["a".to_string()]);

        assert!(matches!(
            repo.commit(Some("too early")).unwrap_err(),
            EnkelError::UnmergedFiles(_)
        ));

        write_file(&repo, "a", "resolved");
        repo.add("a").unwrap();
        let summary = repo.commit(Some("ignored")).unwrap();
        assert!(summary.message.starts_with("Merge other into master"));
        assert!(summary.message.contains("Conflicts:\na"));

        let merge_commit = repo.ref_hash("HEAD").unwrap();
        let parents = objects::parents(&repo.objects.read(&merge_commit).unwrap());
        assert_eq!(parents.len(), 2);
        assert!(!repo.refs.exists("MERGE_HEAD"));
        assert!(!repo.repo_dir.join("MERGE_MSG").exists());
        assert!(repo.index.conflicted_paths().unwrap().is_empty());
    }

    #[test]
    fn test_clean_non_fast_forward_merge_commits() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "x");
        repo.add("a").unwrap();
        repo.commit(Some("base")).unwrap();

        repo.create_branch("other").unwrap();
        write_file(&repo, "ours.txt", "1");
        repo.add("ours.txt").unwrap();
        repo.commit(Some("ours")).unwrap();

        repo.checkout("other").unwrap();
        write_file(&repo, "theirs.txt", "2");
        repo.add("theirs.txt").unwrap();
        repo.commit(Some("theirs")).unwrap();

        let summary = match repo.merge("master").unwrap() {
            MergeOutcome::Merged(summary) => summary,
            other => panic!("expected a merge commit, got {other:?}"),
        };
        assert_eq!(summary.message, "Merge master into other");

        let merge_commit = repo.ref_hash("HEAD").unwrap();
        let parents = objects::parents(&repo.objects.read(&merge_commit).unwrap());
        assert_eq!(parents.len(), 2);
        let toc = repo.commit_toc(&merge_commit);
        assert!(toc.contains_key("a"));
        assert!(toc.contains_key("ours.txt"));
        assert!(toc.contains_key("theirs.txt"));
        assert_eq!(fs::read_to_string(repo.root().join("ours.txt")).unwrap(), "1");
    }

    #[test]
    fn test_merge_of_non_commit_target() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "x");
        repo.add("a").unwrap();
        repo.commit(Some("base")).unwrap();
        assert!(matches!(
            repo.merge("nonsense").unwrap_err(),
            EnkelError::ExpectedCommit(_)
        ));
    }

    // --- Safety guard ---

    #[test]
    fn test_checkout_and_merge_refuse_to_clobber_changes() {
        let (_dir, repo) = divergent_repo();
        write_file(&repo, "a", "dirty");

        let err = repo.checkout("other").unwrap_err();
        assert!(matches!(err, EnkelError::LocalChangesWouldBeLost(_)));
        let err = repo.merge("other").unwrap_err();
        assert!(matches!(err, EnkelError::LocalChangesWouldBeLost(_)));

        // The repository is unchanged: still on master, work intact.
        assert_eq!(repo.head_branch().as_deref(), Some("master"));
        assert_eq!(fs::read_to_string(repo.root().join("a")).unwrap(), "dirty");
        assert!(!repo.refs.exists("MERGE_HEAD"));
    }

    // --- rm ---

    #[test]
    fn test_rm_unstages_and_deletes() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "x");
        repo.add("a").unwrap();
        repo.commit(Some("base")).unwrap();

        repo.rm("a", false, false).unwrap();
        assert!(!repo.root().join("a").exists());
        assert!(repo.index.toc().unwrap().is_empty());

        let summary = repo.commit(Some("drop a")).unwrap();
        assert!(repo.commit_toc(&summary.hash).is_empty());
    }

    #[test]
    fn test_rm_guards() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "sub/a", "x");
        repo.add("sub/a").unwrap();
        repo.commit(Some("base")).unwrap();

        assert!(matches!(
            repo.rm("sub/a", false, true).unwrap_err(),
            EnkelError::Unsupported
        ));
        assert!(matches!(
            repo.rm("sub", false, false).unwrap_err(),
            EnkelError::NotRemovingRecursively(_)
        ));
        assert!(matches!(
            repo.rm("absent", false, false).unwrap_err(),
            EnkelError::PathDidNotMatch(_)
        ));

        write_file(&repo, "sub/a", "changed");
        assert!(matches!(
            repo.rm("sub/a", false, false).unwrap_err(),
            EnkelError::FilesHaveChanges(_)
        ));

        // With -r and clean content the tracked files go.
        write_file(&repo, "sub/a", "x");
        repo.rm("sub", true, false).unwrap();
        assert!(!repo.root().join("sub/a").exists());
        assert!(repo.index.toc().unwrap().is_empty());
    }

    // --- Scenario: diff between commits ---

    #[test]
    fn test_diff_between_commits() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "a", "x");
        write_file(&repo, "b", "y");
        repo.add(".").unwrap();
        let c1 = repo.commit(Some("one")).unwrap().hash;

        write_file(&repo, "a", "x-prime");
        write_file(&repo, "c", "z");
        fs::remove_file(repo.root().join("b")).unwrap();
        repo.add("a").unwrap();
        repo.add("c").unwrap();
        repo.rm("b", false, false).unwrap();
        let c2 = repo.commit(Some("two")).unwrap().hash;

        let ns = repo.diff_refs(Some(&c1), Some(&c2)).unwrap();
        assert_eq!(ns["a"], DiffStatus::Modify);
        assert_eq!(ns["b"], DiffStatus::Delete);
        assert_eq!(ns["c"], DiffStatus::Add);
        assert_eq!(ns.len(), 3);

        assert!(matches!(
            repo.diff_refs(Some("bogus"), None).unwrap_err(),
            EnkelError::UnknownRevision(_)
        ));
    }

    // --- Status ---

    #[test]
    fn test_status_sections() {
        let (_dir, repo) = init_repo();
        write_file(&repo, "committed.txt", "1");
        repo.add("committed.txt").unwrap();
        repo.commit(Some("base")).unwrap();

        write_file(&repo, "staged.txt", "2");
        repo.add("staged.txt").unwrap();
        write_file(&repo, "committed.txt", "edited");
        write_file(&repo, "loose.txt", "3");

        let status = repo.status().unwrap();
        assert_eq!(status.branch.as_deref(), Some("master"));
        assert_eq!(status.untracked, vec!["loose.txt".to_string()]);
        assert!(status.conflicted.is_empty());
        assert_eq!(status.to_be_committed["staged.txt"], DiffStatus::Add);
        assert_eq!(status.not_staged["committed.txt"], DiffStatus::Modify);
    }

    // --- Scenario: remotes ---

    #[test]
    fn test_clone() {
        let dir = tempdir().unwrap();
        let src_path = dir.path().join("src");
        let dst_path = dir.path().join("dst");

        let src = Repository::init(&src_path, false).unwrap();
        write_file(&src, "a", "hi");
        write_file(&src, "sub/b", "there");
        src.add(".").unwrap();
        let c1 = src.commit(Some("first")).unwrap().hash;

        let dst = Repository::clone_repo(&src_path, &dst_path, false).unwrap();
        let config = dst.config().unwrap();
        assert_eq!(config.remotes["origin"], src.root().display().to_string());
        assert_eq!(dst.ref_hash("refs/remotes/origin/master").unwrap(), c1);
        assert_eq!(dst.ref_hash("master").unwrap(), c1);
        assert_eq!(fs::read_to_string(dst.root().join("a")).unwrap(), "hi");
        assert_eq!(fs::read_to_string(dst.root().join("sub/b")).unwrap(), "there");
    }

    #[test]
    fn test_clone_guards() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Repository::clone_repo(&dir.path().join("absent"), &dir.path().join("dst"), false)
                .unwrap_err(),
            EnkelError::CloneSourceMissing(_)
        ));

        let src = Repository::init(&dir.path().join("src"), false).unwrap();
        write_file(&src, "a", "hi");
        src.add("a").unwrap();
        src.commit(Some("first")).unwrap();

        let occupied = dir.path().join("occupied");
        fs::create_dir_all(&occupied).unwrap();
        fs::write(occupied.join("junk"), "x").unwrap();
        assert!(matches!(
            Repository::clone_repo(&dir.path().join("src"), &occupied, false).unwrap_err(),
            EnkelError::TargetNotEmpty(_)
        ));
    }

    #[test]
    fn test_fetch_then_pull_fast_forwards() {
        let dir = tempdir().unwrap();
        let src = Repository::init(&dir.path().join("src"), false).unwrap();
        write_file(&src, "a", "hi");
        src.add("a").unwrap();
        src.commit(Some("first")).unwrap();

        let dst =
            Repository::clone_repo(&dir.path().join("src"), &dir.path().join("dst"), false)
                .unwrap();

        write_file(&src, "a", "hi2");
        src.add("a").unwrap();
        let c2 = src.commit(Some("second")).unwrap().hash;

        let (fetched, merged) = dst.pull("origin", "master").unwrap();
        assert_eq!(fetched.branch, "master");
        assert!(!fetched.forced);
        assert!(fetched.object_count > 0);
        assert_eq!(merged, MergeOutcome::FastForward);
        assert_eq!(dst.ref_hash("master").unwrap(), c2);
        assert_eq!(fs::read_to_string(dst.root().join("a")).unwrap(), "hi2");
    }

    #[test]
    fn test_fetch_guards() {
        let (_dir, repo) = init_repo();
        assert!(matches!(
            repo.fetch("nowhere", "master").unwrap_err(),
            EnkelError::NotARemoteRepo(_)
        ));

        let remote_dir = tempdir().unwrap();
        let _remote = Repository::init(remote_dir.path(), true).unwrap();
        repo.remote_add("origin", remote_dir.path().to_str().unwrap())
            .unwrap();
        assert!(matches!(
            repo.remote_add("origin", "/elsewhere").unwrap_err(),
            EnkelError::RemoteAlreadyExists(_)
        ));
        assert!(matches!(
            repo.fetch("origin", "missing-branch").unwrap_err(),
            EnkelError::RemoteRefNotFound(_)
        ));
    }

    #[test]
    fn test_push_to_bare_remote() {
        let dir = tempdir().unwrap();
        let remote = Repository::init(&dir.path().join("remote"), true).unwrap();
        let local = Repository::init(&dir.path().join("local"), false).unwrap();
        write_file(&local, "a", "hi");
        local.add("a").unwrap();
        let c1 = local.commit(Some("first")).unwrap().hash;

        local
            .remote_add("origin", remote.root().to_str().unwrap())
            .unwrap();
        let outcome = local.push("origin", "master", false).unwrap();
        assert!(matches!(outcome, PushOutcome::Pushed { .. }));

        assert_eq!(remote.ref_hash("master").unwrap(), c1);
        assert_eq!(local.ref_hash("refs/remotes/origin/master").unwrap(), c1);
        assert_eq!(
            local.push("origin", "master", false).unwrap(),
            PushOutcome::AlreadyUpToDate
        );
    }

    #[test]
    fn test_push_refuses_checked_out_branch() {
        let dir = tempdir().unwrap();
        let remote = Repository::init(&dir.path().join("remote"), false).unwrap();
        write_file(&remote, "a", "hi");
        remote.add("a").unwrap();
        remote.commit(Some("first")).unwrap();

        let local = Repository::init(&dir.path().join("local"), false).unwrap();
        write_file(&local, "a", "hi");
        local.add("a").unwrap();
        local.commit(Some("first")).unwrap();
        local
            .remote_add("origin", remote.root().to_str().unwrap())
            .unwrap();

        assert!(matches!(
            local.push("origin", "master", false).unwrap_err(),
            EnkelError::RefusingPushCheckedOut(_)
        ));
    }

    #[test]
    fn test_non_fast_forward_push_needs_force() {
        let dir = tempdir().unwrap();
        let remote = Repository::init(&dir.path().join("remote"), true).unwrap();

        let one = Repository::init(&dir.path().join("one"), false).unwrap();
        write_file(&one, "a", "base");
        one.add("a").unwrap();
        one.commit(Some("base")).unwrap();
        one.remote_add("origin", remote.root().to_str().unwrap())
            .unwrap();
        one.push("origin", "master", false).unwrap();

        // A second repository advances the remote past us.
        let two =
            Repository::clone_repo(&dir.path().join("remote"), &dir.path().join("two"), false)
                .unwrap();
        write_file(&two, "a", "theirs");
        two.add("a").unwrap();
        two.commit(Some("theirs")).unwrap();
        two.push("origin", "master", false).unwrap();

        // Our diverging commit no longer fast-forwards.
        write_file(&one, "a", "ours");
        one.add("a").unwrap();
        let c_ours = one.commit(Some("ours")).unwrap().hash;
        assert!(matches!(
            one.push("origin", "master", false).unwrap_err(),
            EnkelError::PushNonFastForward(_)
        ));

        one.push("origin", "master", true).unwrap();
        assert_eq!(remote.ref_hash("master").unwrap(), c_ours);
    }
}
