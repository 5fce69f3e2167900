//! enkelgit CLI — the command-line face of the engine.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use enkelgit_core::repo::{
    CheckoutOutcome, CommitSummary, FetchSummary, MergeOutcome, PushOutcome,
};
use enkelgit_core::Repository;

#[derive(Parser)]
#[command(name = "enkelgit", about = "enkelgit — a minimal version-control engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty repository.
    Init {
        /// Create a bare repository (metadata only, no working copy).
        #[arg(long)]
        bare: bool,
    },

    /// Stage working-copy files under a path.
    Add {
        /// File or directory to stage, relative to the repository root.
        path: String,
    },

    /// Unstage and delete indexed files under a path.
    Rm {
        /// File or directory to remove.
        path: String,

        /// Remove directories recursively.
        #[arg(short)]
        r: bool,

        /// Force removal (not supported by this engine).
        #[arg(short)]
        f: bool,
    },

    /// Record the staged snapshot as a commit.
    Commit {
        /// Commit message.
        #[arg(short)]
        m: String,
    },

    /// List branches, or create one at the current HEAD.
    Branch {
        /// Name of the branch to create.
        name: Option<String>,
    },

    /// Switch the working copy to another branch or commit.
    Checkout {
        /// Branch name or commit hash.
        target: String,
    },

    /// Show paths that changed between two revisions.
    Diff {
        ref1: Option<String>,
        ref2: Option<String>,
    },

    /// Manage remotes.
    Remote {
        #[command(subcommand)]
        action: RemoteCommands,
    },

    /// Copy a remote branch's history into this repository.
    Fetch { remote: String, branch: String },

    /// Merge a commit into HEAD.
    Merge {
        /// Branch name, commit hash, or FETCH_HEAD.
        target: String,
    },

    /// Fetch a remote branch, then merge it.
    Pull { remote: String, branch: String },

    /// Send local history to a remote branch.
    Push {
        remote: String,
        branch: String,

        /// Allow a non-fast-forward update.
        #[arg(short)]
        f: bool,
    },

    /// Copy a local repository.
    Clone {
        source: PathBuf,
        target: PathBuf,

        /// Make the copy bare.
        #[arg(long)]
        bare: bool,
    },

    /// Summarize working-copy state.
    Status,
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// Add a named remote pointing at a local path.
    Add { name: String, path: String },
}

fn main() {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("error: cannot determine current directory: {e}");
        process::exit(1);
    });

    let result = match cli.command {
        Commands::Init { bare } => cmd_init(&cwd, bare),
        Commands::Add { path } => cmd_add(&cwd, &path),
        Commands::Rm { path, r, f } => cmd_rm(&cwd, &path, r, f),
        Commands::Commit { m } => cmd_commit(&cwd, &m),
        Commands::Branch { name } => cmd_branch(&cwd, name.as_deref()),
        Commands::Checkout { target } => cmd_checkout(&cwd, &target),
        Commands::Diff { ref1, ref2 } => cmd_diff(&cwd, ref1.as_deref(), ref2.as_deref()),
        Commands::Remote { action } => match action {
            RemoteCommands::Add { name, path } => cmd_remote_add(&cwd, &name, &path),
        },
        Commands::Fetch { remote, branch } => cmd_fetch(&cwd, &remote, &branch),
        Commands::Merge { target } => cmd_merge(&cwd, &target),
        Commands::Pull { remote, branch } => cmd_pull(&cwd, &remote, &branch),
        Commands::Push { remote, branch, f } => cmd_push(&cwd, &remote, &branch, f),
        Commands::Clone {
            source,
            target,
            bare,
        } => cmd_clone(&source, &target, bare),
        Commands::Status => cmd_status(&cwd),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn cmd_init(cwd: &Path, bare: bool) -> CmdResult {
    let repo = Repository::init(cwd, bare)?;
    println!(
        "Initialized empty enkelgit repository in {}",
        repo.root().display()
    );
    Ok(())
}

fn cmd_add(cwd: &Path, path: &str) -> CmdResult {
    Repository::discover(cwd)?.add(path)?;
    Ok(())
}

fn cmd_rm(cwd: &Path, path: &str, recursive: bool, force: bool) -> CmdResult {
    let removed = Repository::discover(cwd)?.rm(path, recursive, force)?;
    for file in removed {
        println!("rm {file}");
    }
    Ok(())
}

fn cmd_commit(cwd: &Path, message: &str) -> CmdResult {
    let summary = Repository::discover(cwd)?.commit(Some(message))?;
    print_commit(&summary);
    Ok(())
}

fn cmd_branch(cwd: &Path, name: Option<&str>) -> CmdResult {
    let repo = Repository::discover(cwd)?;
    match name {
        Some(name) => repo.create_branch(name)?,
        None => {
            for (branch, is_current) in repo.branches()? {
                let marker = if is_current { "* " } else { "  " };
                println!("{marker}{branch}");
            }
        }
    }
    Ok(())
}

fn cmd_checkout(cwd: &Path, target: &str) -> CmdResult {
    match Repository::discover(cwd)?.checkout(target)? {
        CheckoutOutcome::AlreadyOn(name) => println!("Already on {name}"),
        CheckoutOutcome::SwitchedToBranch(name) => println!("Switched to branch {name}"),
        CheckoutOutcome::DetachedAt(hash) => {
            println!("Note: checking out {hash}\nYou are in detached HEAD state.");
        }
    }
    Ok(())
}

fn cmd_diff(cwd: &Path, ref1: Option<&str>, ref2: Option<&str>) -> CmdResult {
    let changes = Repository::discover(cwd)?.diff_refs(ref1, ref2)?;
    for (path, status) in changes {
        println!("{} {path}", status.code());
    }
    Ok(())
}

fn cmd_remote_add(cwd: &Path, name: &str, path: &str) -> CmdResult {
    Repository::discover(cwd)?.remote_add(name, path)?;
    Ok(())
}

fn cmd_fetch(cwd: &Path, remote: &str, branch: &str) -> CmdResult {
    let fetched = Repository::discover(cwd)?.fetch(remote, branch)?;
    print_fetch(&fetched);
    Ok(())
}

fn cmd_merge(cwd: &Path, target: &str) -> CmdResult {
    let outcome = Repository::discover(cwd)?.merge(target)?;
    print_merge(&outcome);
    Ok(())
}

fn cmd_pull(cwd: &Path, remote: &str, branch: &str) -> CmdResult {
    let (fetched, merged) = Repository::discover(cwd)?.pull(remote, branch)?;
    print_fetch(&fetched);
    print_merge(&merged);
    Ok(())
}

fn cmd_push(cwd: &Path, remote: &str, branch: &str, force: bool) -> CmdResult {
    match Repository::discover(cwd)?.push(remote, branch, force)? {
        PushOutcome::AlreadyUpToDate => println!("Already up-to-date"),
        PushOutcome::Pushed {
            remote_url,
            branch,
            object_count,
        } => {
            println!("To {remote_url}");
            println!("Count {object_count}");
            println!("{branch} -> {branch}");
        }
    }
    Ok(())
}

fn cmd_clone(source: &Path, target: &Path, bare: bool) -> CmdResult {
    Repository::clone_repo(source, target, bare)?;
    println!("Cloning into {}", target.display());
    Ok(())
}

fn cmd_status(cwd: &Path) -> CmdResult {
    let status = Repository::discover(cwd)?.status()?;
    match &status.branch {
        Some(branch) => println!("On branch {branch}"),
        None => println!("HEAD detached"),
    }
    if !status.untracked.is_empty() {
        println!("Untracked files:");
        for path in &status.untracked {
            println!("{path}");
        }
    }
    if !status.conflicted.is_empty() {
        println!("Unmerged paths:");
        for path in &status.conflicted {
            println!("{path}");
        }
    }
    if !status.to_be_committed.is_empty() {
        println!("Changes to be committed:");
        for (path, st) in &status.to_be_committed {
            println!("{} {path}", st.code());
        }
    }
    if !status.not_staged.is_empty() {
        println!("Changes not staged for commit:");
        for (path, st) in &status.not_staged {
            println!("{} {path}", st.code());
        }
    }
    Ok(())
}

fn print_commit(summary: &CommitSummary) {
    let first_line = summary.message.lines().next().unwrap_or("");
    println!("[{} {}] {first_line}", summary.head, summary.hash);
}

fn print_fetch(fetched: &FetchSummary) {
    println!("From {}", fetched.remote_url);
    println!("Count {}", fetched.object_count);
    let forced = if fetched.forced { " (forced)" } else { "" };
    println!(
        "{} -> {}/{}{forced}",
        fetched.branch, fetched.remote, fetched.branch
    );
}

fn print_merge(outcome: &MergeOutcome) {
    match outcome {
        MergeOutcome::AlreadyUpToDate => println!("Already up-to-date"),
        MergeOutcome::FastForward => println!("Fast-forward"),
        MergeOutcome::Conflicted(_) => {
            println!("Automatic merge failed. Fix conflicts and commit the result.");
        }
        MergeOutcome::Merged(summary) => print_commit(summary),
    }
}
