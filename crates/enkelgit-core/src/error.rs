//! Error types for enkelgit operations.

use std::fmt;
use std::io;

/// All possible enkelgit errors.
///
/// Variants group into the precondition / reference / state-conflict /
/// path / remote / unsupported families. Every error aborts the current
/// command; none is retried.
#[derive(Debug)]
pub enum EnkelError {
    /// The starting directory is not inside an enkelgit repository.
    NotARepo,
    /// An enkelgit repository already exists here.
    AlreadyARepo,
    /// A work-tree operation was attempted in a bare repository.
    NotInWorkTree,
    /// An I/O error occurred.
    Io(io::Error),
    /// A revision argument resolved to nothing.
    UnknownRevision(String),
    /// A ref name failed the syntactic check.
    InvalidRef(String),
    /// A checkout target matched no known object.
    UnknownRef(String),
    /// A checkout target is not a commit.
    NotATree(String),
    /// A merge giver is missing or not a commit.
    ExpectedCommit(String),
    /// A ref-update target resolved to nothing.
    InvalidObjectName(String),
    /// A ref-update target resolved to a non-commit object.
    RefPointsAtNonCommit { reference: String, hash: String },
    /// The index tree matches HEAD's tree.
    NothingToCommit(String),
    /// Commit attempted while conflict stages remain.
    UnmergedFiles(Vec<String>),
    /// Branch creation target already exists.
    BranchAlreadyExists(String),
    /// Checkout or merge would clobber uncommitted work.
    LocalChangesWouldBeLost(Vec<String>),
    /// A pathspec matched nothing.
    PathDidNotMatch(String),
    /// Staging target is a directory.
    IsADirectory(String),
    /// rm of a directory without -r.
    NotRemovingRecursively(String),
    /// rm of files whose changes are not committed.
    FilesHaveChanges(Vec<String>),
    /// Index update of an untracked on-disk file without the add flag.
    CannotAddToIndex(String),
    /// Index update of a path that is neither on disk nor being removed.
    DoesNotExist(String),
    /// remote add of a name that is already configured.
    RemoteAlreadyExists(String),
    /// A named remote is not configured.
    NotARemoteRepo(String),
    /// The remote has no such branch.
    RemoteRefNotFound(String),
    /// Push target branch is checked out on the remote.
    RefusingPushCheckedOut(String),
    /// Non-fast-forward push without force.
    PushNonFastForward(String),
    /// Clone source is missing or not a repository.
    CloneSourceMissing(String),
    /// Clone target exists and is not empty.
    TargetNotEmpty(String),
    /// Operations the engine deliberately refuses.
    Unsupported,
    /// Generic error with a message.
    Other(String),
}

impl fmt::Display for EnkelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnkelError::NotARepo => write!(f, "not an enkelgit repository"),
            EnkelError::AlreadyARepo => write!(f, ".enkelgit already exists"),
            EnkelError::NotInWorkTree => {
                write!(f, "this operation must be run in a work tree")
            }
            EnkelError::Io(e) => write!(f, "I/O error: {e}"),
            EnkelError::UnknownRevision(r) => {
                write!(f, "ambiguous argument {r}: unknown revision")
            }
            EnkelError::InvalidRef(r) => write!(f, "invalid ref name: {r}"),
            EnkelError::UnknownRef(r) => {
                write!(f, "{r} did not match any file(s) known to enkelgit")
            }
            EnkelError::NotATree(r) => write!(f, "reference is not a tree: {r}"),
            EnkelError::ExpectedCommit(r) => write!(f, "{r}: expected commit type"),
            EnkelError::InvalidObjectName(n) => write!(f, "{n} not a valid object name"),
            EnkelError::RefPointsAtNonCommit { reference, hash } => {
                write!(f, "the ref {reference} points at {hash}\nit is not a commit")
            }
            EnkelError::NothingToCommit(head) => {
                write!(f, "# On {head}\nnothing to commit, working directory clean")
            }
            EnkelError::UnmergedFiles(paths) => {
                for p in paths {
                    writeln!(f, "U {p}")?;
                }
                write!(f, "cannot commit because you have unmerged files")
            }
            EnkelError::BranchAlreadyExists(b) => {
                write!(f, "A branch named {b} already exists")
            }
            EnkelError::LocalChangesWouldBeLost(paths) => {
                writeln!(f, "local changes would be lost")?;
                for p in paths {
                    writeln!(f, "{p}")?;
                }
                Ok(())
            }
            EnkelError::PathDidNotMatch(p) => write!(f, "{p} did not match any files"),
            EnkelError::IsADirectory(p) => {
                write!(f, "{p} is a directory - add files inside instead")
            }
            EnkelError::NotRemovingRecursively(p) => {
                write!(f, "not removing {p} recursively without -r")
            }
            EnkelError::FilesHaveChanges(paths) => {
                writeln!(f, "these files have changes:")?;
                for p in paths {
                    writeln!(f, "{p}")?;
                }
                Ok(())
            }
            EnkelError::CannotAddToIndex(p) => {
                write!(f, "cannot add {p} to index - use --add option")
            }
            EnkelError::DoesNotExist(p) => {
                write!(f, "{p} does not exist and --remove not passed")
            }
            EnkelError::RemoteAlreadyExists(n) => write!(f, "remote {n} already exists"),
            EnkelError::NotARemoteRepo(n) => {
                write!(f, "{n} does not appear to be an enkelgit repository")
            }
            EnkelError::RemoteRefNotFound(b) => write!(f, "couldn't find remote ref {b}"),
            EnkelError::RefusingPushCheckedOut(b) => {
                write!(f, "refusing to update checked out branch {b}")
            }
            EnkelError::PushNonFastForward(path) => {
                write!(f, "failed to push some refs to {path}")
            }
            EnkelError::CloneSourceMissing(path) => {
                write!(f, "repository {path} does not exist")
            }
            EnkelError::TargetNotEmpty(path) => {
                write!(f, "{path} already exists and is not empty")
            }
            EnkelError::Unsupported => write!(f, "unsupported"),
            EnkelError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EnkelError {}

impl From<io::Error> for EnkelError {
    fn from(e: io::Error) -> Self {
        EnkelError::Io(e)
    }
}

/// Convenience alias for Results in enkelgit.
pub type EnkelResult<T> = Result<T, EnkelError>;
