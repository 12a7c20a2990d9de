//! Remote reference listing
//!
//! Lists tags and branch heads with `git ls-remote`, without cloning.

use std::collections::BTreeMap;
use std::process::Command;

use crate::error::{ModError, Result};

use super::auth::AuthKind;

/// Tags and branch heads of a remote, each mapped to a commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRefs {
    pub tags: BTreeMap<String, String>,
    pub branches: BTreeMap<String, String>,
}

impl RemoteRefs {
    pub fn tag_commit(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn branch_commit(&self, branch: &str) -> Option<&str> {
        self.branches.get(branch).map(String::as_str)
    }

    /// `(tag, commit)` pairs, for building version lists
    pub fn tag_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(t, c)| (t.as_str(), c.as_str()))
    }
}

fn is_sha(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse `git ls-remote` output
///
/// For annotated tags the peeled `refs/tags/x^{}` line carries the commit and
/// replaces the tag object id.
pub fn parse_ls_remote(stdout: &str) -> RemoteRefs {
    let mut refs = RemoteRefs::default();
    let mut peeled = BTreeMap::new();

    for line in stdout.lines() {
        let mut parts = line.split_whitespace();
        let (Some(sha), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        if !is_sha(sha) {
            continue;
        }

        if let Some(tag) = name.strip_prefix("refs/tags/") {
            match tag.strip_suffix("^{}") {
                Some(tag) => {
                    peeled.insert(tag.to_string(), sha.to_string());
                }
                None => {
                    refs.tags.insert(tag.to_string(), sha.to_string());
                }
            }
        } else if let Some(branch) = name.strip_prefix("refs/heads/") {
            refs.branches.insert(branch.to_string(), sha.to_string());
        }
    }

    refs.tags.extend(peeled);
    refs
}

/// `git ls-remote` invocation for `url`
///
/// Credentials travel as an `http.extraHeader` set through the environment,
/// never on the command line.
fn ls_remote_command(url: &str, auth: &AuthKind) -> Command {
    let mut cmd = Command::new("git");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    if std::env::var_os("GIT_SSH_COMMAND").is_none() {
        cmd.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
    }
    if let Some(header) = auth.http_header().filter(|_| url.starts_with("https://")) {
        cmd.env("GIT_CONFIG_COUNT", "1")
            .env("GIT_CONFIG_KEY_0", "http.extraHeader")
            .env("GIT_CONFIG_VALUE_0", header);
    }
    cmd.args(["ls-remote", "--tags", "--heads"]).arg(url);
    cmd
}

/// List tags and branch heads of `url`
pub fn list_remote_refs(url: &str, auth: &AuthKind) -> Result<RemoteRefs> {
    let mut cmd = ls_remote_command(url, auth);
    let output = cmd.output().map_err(|e| ModError::GitOperationFailed {
        message: format!("git ls-remote {url} failed to start: {e}"),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ModError::GitRefResolveFailed {
            git_ref: url.to_string(),
            reason: auth.redact(stderr.trim()),
        });
    }

    Ok(parse_ls_remote(&String::from_utf8_lossy(&output.stdout)))
}
