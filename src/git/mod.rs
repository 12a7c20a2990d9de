//! Git operations for fetching mods
//!
//! This module handles:
//! - Building HTTPS and SSH URLs from mod names
//! - Fetching a single tag or branch (shallow) and checking it out
//! - Listing remote tags and branches (see [`refs`])
//! - Authentication (see [`auth`])

pub mod auth;
pub mod refs;

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::Path;

use git2::{ErrorClass, FetchOptions, RemoteCallbacks, Repository};

use crate::error::{ModError, Result};

pub use auth::{AuthKind, classify_token, token_from_env};
pub use refs::{RemoteRefs, list_remote_refs};

/// A named reference to check out
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GitRef {
    Tag(String),
    Branch(String),
}

impl GitRef {
    /// Refspec fetching only this reference
    pub fn refspec(&self) -> String {
        match self {
            GitRef::Tag(tag) => format!("+refs/tags/{tag}:refs/tags/{tag}"),
            GitRef::Branch(branch) => {
                format!("+refs/heads/{branch}:refs/remotes/origin/{branch}")
            }
        }
    }

    /// Local reference name after fetching [`GitRef::refspec`]
    pub fn local_name(&self) -> String {
        match self {
            GitRef::Tag(tag) => format!("refs/tags/{tag}"),
            GitRef::Branch(branch) => format!("refs/remotes/origin/{branch}"),
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitRef::Tag(tag) => f.write_str(tag),
            GitRef::Branch(branch) => write!(f, "#{branch}"),
        }
    }
}

/// HTTPS URL for a mod name (`github.com/acme/net`)
pub fn https_url(name: &str) -> String {
    format!("https://{}", name.trim_end_matches('/'))
}

/// SCP-style SSH URL for a mod name (`git@github.com:acme/net.git`)
pub fn ssh_url(name: &str) -> String {
    let name = name.trim_end_matches('/').trim_end_matches(".git");
    match name.split_once('/') {
        Some((host, path)) => format!("git@{host}:{path}.git"),
        None => format!("git@{name}.git"),
    }
}

/// Convert SCP-style SSH URLs (git@host:path) to ssh:// form for libgit2
fn normalize_ssh_url(url: &str) -> Cow<'_, str> {
    if !url.starts_with("git@") {
        return Cow::Borrowed(url);
    }
    match url.split_once(':') {
        Some((host, path)) => {
            let path = path.strip_prefix('/').unwrap_or(path);
            Cow::Owned(format!("ssh://{host}/{path}"))
        }
        None => Cow::Borrowed(url),
    }
}

fn is_local_url(url: &str) -> bool {
    url.starts_with("file://") || url.starts_with('/') || Path::new(url).is_absolute()
}

/// Turn a git2 error into a short user-facing reason
fn interpret_git_error(err: &git2::Error) -> String {
    let class = err.class();
    let message = err.message().to_lowercase();

    if message.contains("not found") || message.contains("404") {
        "Repository or reference not found".to_string()
    } else if message.contains("too many redirects") || message.contains("authentication replays")
    {
        "Repository not found".to_string()
    } else if message.contains("authentication") || message.contains("credentials") {
        "Authentication failed".to_string()
    } else if message.contains("permission denied") || message.contains("access denied") {
        "Permission denied".to_string()
    } else if message.contains("connection")
        || message.contains("network")
        || message.contains("timed out")
    {
        "Network error".to_string()
    } else if class == ErrorClass::Http {
        format!("HTTP error: {}", err.message())
    } else if class == ErrorClass::Ssh {
        format!("SSH error: {}", err.message())
    } else {
        err.message().to_string()
    }
}

/// Fetch `git_ref` from `url` into `target` and check it out
///
/// Only the requested reference is fetched, with depth 1 for remote URLs.
/// The `.git` directory is removed afterwards, leaving a plain tree.
/// Returns the checked-out commit SHA.
pub fn fetch_ref(url: &str, git_ref: &GitRef, target: &Path, auth: &AuthKind) -> Result<String> {
    let clone_failed = |reason: String| ModError::GitCloneFailed {
        url: url.to_string(),
        reason,
    };

    fs::create_dir_all(target).map_err(|e| clone_failed(e.to_string()))?;

    let sha = {
        let repo = Repository::init(target).map_err(|e| clone_failed(interpret_git_error(&e)))?;
        let remote_url = normalize_ssh_url(url);
        let mut remote = repo
            .remote_anonymous(&remote_url)
            .map_err(|e| clone_failed(interpret_git_error(&e)))?;

        let mut callbacks = RemoteCallbacks::new();
        auth::setup_auth_callbacks(&mut callbacks, auth);

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);
        if !is_local_url(url) {
            fetch_options.depth(1);
        }
        let header = auth.http_header().filter(|_| url.starts_with("https://"));
        if let Some(header) = &header {
            fetch_options.custom_headers(&[header.as_str()]);
        }

        remote
            .fetch(&[git_ref.refspec()], Some(&mut fetch_options), None)
            .map_err(|e| clone_failed(format!("{} ({git_ref})", interpret_git_error(&e))))?;

        let commit = repo
            .find_reference(&git_ref.local_name())
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| ModError::GitRefResolveFailed {
                git_ref: git_ref.to_string(),
                reason: e.message().to_string(),
            })?;
        let sha = commit.id().to_string();
        checkout_commit(&repo, &sha)?;
        sha
    };

    let git_dir = target.join(".git");
    if git_dir.exists() {
        fs::remove_dir_all(&git_dir).map_err(|e| clone_failed(e.to_string()))?;
    }
    Ok(sha)
}

/// Checkout a specific commit in the repository (detached HEAD)
pub fn checkout_commit(repo: &Repository, sha: &str) -> Result<()> {
    let checkout_failed = |e: git2::Error| ModError::GitCheckoutFailed {
        sha: sha.to_string(),
        reason: e.message().to_string(),
    };

    let oid = git2::Oid::from_str(sha).map_err(checkout_failed)?;
    let commit = repo.find_commit(oid).map_err(checkout_failed)?;
    repo.set_head_detached(commit.id()).map_err(checkout_failed)?;

    let mut checkout_builder = git2::build::CheckoutBuilder::new();
    checkout_builder.force();
    repo.checkout_head(Some(&mut checkout_builder))
        .map_err(checkout_failed)?;

    Ok(())
}
