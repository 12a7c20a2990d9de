//! Error types and handling for moddeps
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for mod dependency operations
#[derive(Error, Diagnostic, Debug)]
pub enum ModError {
    // Constraint errors
    #[error("Invalid argument '{arg}': {reason}")]
    #[diagnostic(
        code(moddeps::constraint::invalid_argument),
        help("Valid forms: name, name@version, name@tag, name#branch, or a local mod directory")
    )]
    InvalidArgument { arg: String, reason: String },

    #[error("Invalid version constraint '{constraint}': {reason}")]
    #[diagnostic(code(moddeps::constraint::invalid))]
    InvalidConstraint { constraint: String, reason: String },

    // Resolution errors
    #[error("Failed to resolve dependency '{name}': {reason}")]
    #[diagnostic(code(moddeps::resolve::failed))]
    DependencyResolutionFailure { name: String, reason: String },

    #[error("Failed to list versions of '{name}' over both HTTPS and SSH")]
    #[diagnostic(
        code(moddeps::resolve::remote_unreachable),
        help("HTTPS: {https}\nSSH: {ssh}\nCheck the mod name and GITHUB_TOKEN")
    )]
    RemoteUnreachable {
        name: String,
        https: String,
        ssh: String,
    },

    #[error("No version of '{name}' satisfies constraint '{constraint}'")]
    #[diagnostic(
        code(moddeps::resolve::unsatisfiable),
        help("Check the available tags of the mod repository")
    )]
    NoSatisfyingVersion { name: String, constraint: String },

    // Git errors
    #[error("Git operation failed: {message}")]
    #[diagnostic(code(moddeps::git::operation_failed))]
    GitOperationFailed { message: String },

    #[error("Failed to clone repository: {url}")]
    #[diagnostic(
        code(moddeps::git::clone_failed),
        help("{reason}")
    )]
    GitCloneFailed { url: String, reason: String },

    #[error("Failed to resolve git ref '{git_ref}': {reason}")]
    #[diagnostic(code(moddeps::git::ref_resolve_failed))]
    GitRefResolveFailed { git_ref: String, reason: String },

    #[error("Failed to checkout commit '{sha}': {reason}")]
    #[diagnostic(code(moddeps::git::checkout_failed))]
    GitCheckoutFailed { sha: String, reason: String },

    // Mod definition errors
    #[error("No mod definition file found in {path}")]
    #[diagnostic(
        code(moddeps::modfile::missing),
        help("A mod repository must contain a mod.yaml at its root")
    )]
    MissingModDefinition { path: String },

    #[error("Failed to parse mod definition: {path}")]
    #[diagnostic(code(moddeps::modfile::parse_failed), help("{reason}"))]
    ModfileParseFailed { path: String, reason: String },

    #[error("Workspace not found at: {path}")]
    #[diagnostic(
        code(moddeps::workspace::not_found),
        help("Run moddeps from a directory containing mod.yaml, or pass --workspace")
    )]
    WorkspaceNotFound { path: String },

    // Lock errors
    #[error("Failed to parse lock file: {path}")]
    #[diagnostic(code(moddeps::lock::parse_failed), help("{reason}"))]
    LockParseFailed { path: String, reason: String },

    #[error("Failed to write lock file: {path}")]
    #[diagnostic(code(moddeps::lock::write_failed), help("{reason}"))]
    LockWriteFailed { path: String, reason: String },

    // Staging errors
    #[error("Failed to stage mod: {message}")]
    #[diagnostic(code(moddeps::staging::failed))]
    StagingFailed { message: String },

    #[error("Failed to commit staged mods into {path}")]
    #[diagnostic(
        code(moddeps::staging::commit_failed),
        help("{reason}")
    )]
    CommitFailed { path: String, reason: String },

    // Aggregated failures
    #[error("{failed} of {total} {} failed to {action}", plural_dependencies(.total))]
    #[diagnostic(code(moddeps::install::failed))]
    DependencyInstallFailed {
        action: &'static str,
        failed: usize,
        total: usize,
        #[related]
        errors: Vec<ModError>,
    },

    #[error("Operation cancelled")]
    #[diagnostic(code(moddeps::cancelled))]
    Cancelled,

    // File system errors
    #[error("Failed to read file: {path}")]
    #[diagnostic(code(moddeps::fs::read_failed), help("{reason}"))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(moddeps::fs::write_failed), help("{reason}"))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(moddeps::fs::io_error))]
    IoError { message: String },
}

fn plural_dependencies(total: &usize) -> &'static str {
    if *total == 1 {
        "dependency"
    } else {
        "dependencies"
    }
}

impl From<std::io::Error> for ModError {
    fn from(err: std::io::Error) -> Self {
        ModError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ModError {
    fn from(err: serde_yaml::Error) -> Self {
        ModError::ModfileParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ModError {
    fn from(err: serde_json::Error) -> Self {
        ModError::LockParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<git2::Error> for ModError {
    fn from(err: git2::Error) -> Self {
        ModError::GitOperationFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, ModError>;
