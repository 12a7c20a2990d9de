//! Git authentication
//!
//! A GitHub token from `GITHUB_TOKEN` is applied to HTTPS transports. Its
//! prefix decides how it is sent: personal tokens as basic-auth username,
//! app and OAuth tokens as a bearer header. SSH uses the agent or keys from
//! `~/.ssh/`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use git2::{Cred, CredentialType, Error, ErrorClass, RemoteCallbacks};

use crate::config::TOKEN_ENV;

/// How HTTPS requests are authenticated
#[derive(Clone, PartialEq, Eq, Default)]
pub enum AuthKind {
    #[default]
    Anonymous,
    /// Token sent as the basic-auth username
    Basic(String),
    /// Token sent as `Authorization: Bearer`
    Bearer(String),
}

// Tokens never appear in debug output.
impl std::fmt::Debug for AuthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthKind::Anonymous => f.write_str("Anonymous"),
            AuthKind::Basic(_) => f.write_str("Basic(***)"),
            AuthKind::Bearer(_) => f.write_str("Bearer(***)"),
        }
    }
}

const BEARER_PREFIXES: [&str; 4] = ["gho_", "ghu_", "ghs_", "ghr_"];

/// Pick the auth scheme for a token
pub fn classify_token(token: Option<&str>) -> AuthKind {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return AuthKind::Anonymous;
    };
    if BEARER_PREFIXES.iter().any(|p| token.starts_with(p)) {
        AuthKind::Bearer(token.to_string())
    } else {
        // ghp_, github_pat_ and unrecognised tokens
        AuthKind::Basic(token.to_string())
    }
}

/// Auth scheme for the token in the environment
pub fn token_from_env() -> AuthKind {
    classify_token(std::env::var(TOKEN_ENV).ok().as_deref())
}

impl AuthKind {
    /// HTTP `Authorization` header carrying the token
    ///
    /// Basic auth sends the token as the username with an empty password.
    pub fn http_header(&self) -> Option<String> {
        match self {
            AuthKind::Anonymous => None,
            AuthKind::Basic(token) => {
                let credentials = STANDARD.encode(format!("{token}:"));
                Some(format!("Authorization: Basic {credentials}"))
            }
            AuthKind::Bearer(token) => Some(format!("Authorization: Bearer {token}")),
        }
    }

    /// Replace the token in `text` so it can be shown to users
    pub fn redact(&self, text: &str) -> String {
        match self {
            AuthKind::Basic(token) | AuthKind::Bearer(token) => text.replace(token.as_str(), "***"),
            AuthKind::Anonymous => text.to_string(),
        }
    }
}

fn auth_failed(message: &str) -> Error {
    Error::new(git2::ErrorCode::Auth, ErrorClass::Http, message)
}

fn try_ssh_credentials(username: &str) -> std::result::Result<Cred, Error> {
    let home = dirs::home_dir().unwrap_or_default();
    let ssh_dir = home.join(".ssh");

    for key_name in &["id_ed25519", "id_rsa", "id_ecdsa"] {
        let private_key = ssh_dir.join(key_name);
        let public_key = ssh_dir.join(format!("{key_name}.pub"));

        if !private_key.exists() {
            continue;
        }

        let public_key_path = public_key.exists().then_some(public_key.as_path());

        if let Ok(cred) = Cred::ssh_key(username, public_key_path, &private_key, None) {
            return Ok(cred);
        }
    }

    Err(auth_failed("SSH key not found"))
}

/// Install credential callbacks for `auth`
///
/// libgit2 calls back again after a rejected credential, so each kind is
/// offered once to avoid looping on a bad token.
pub fn setup_auth_callbacks(callbacks: &mut RemoteCallbacks<'_>, auth: &AuthKind) {
    let auth = auth.clone();
    let mut attempts = 0u32;
    callbacks.credentials(move |_url, username_from_url, allowed_types| {
        attempts += 1;
        if attempts > 3 {
            return Err(auth_failed("authentication failed"));
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            return Cred::ssh_key_from_agent(username).or_else(|_| try_ssh_credentials(username));
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return match &auth {
                AuthKind::Basic(token) => Cred::userpass_plaintext(token, ""),
                _ => Err(auth_failed("repository requires credentials; set GITHUB_TOKEN")),
            };
        }

        if allowed_types.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        Err(auth_failed("authentication failed"))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_personal_tokens_as_basic() {
        assert_eq!(
            classify_token(Some("ghp_abc")),
            AuthKind::Basic("ghp_abc".to_string())
        );
        assert_eq!(
            classify_token(Some("github_pat_xyz")),
            AuthKind::Basic("github_pat_xyz".to_string())
        );
        assert_eq!(
            classify_token(Some("opaque")),
            AuthKind::Basic("opaque".to_string())
        );
    }

    #[test]
    fn test_classify_app_tokens_as_bearer() {
        for token in ["gho_1", "ghu_2", "ghs_3", "ghr_4"] {
            assert_eq!(
                classify_token(Some(token)),
                AuthKind::Bearer(token.to_string())
            );
        }
    }

    #[test]
    fn test_classify_missing_token_is_anonymous() {
        assert_eq!(classify_token(None), AuthKind::Anonymous);
        assert_eq!(classify_token(Some("  ")), AuthKind::Anonymous);
    }

    #[test]
    fn test_basic_header_encodes_token_as_username() {
        let auth = AuthKind::Basic("ghp_abc".to_string());
        // base64("ghp_abc:")
        assert_eq!(
            auth.http_header().as_deref(),
            Some("Authorization: Basic Z2hwX2FiYzo=")
        );
        assert!(AuthKind::Anonymous.http_header().is_none());
    }

    #[test]
    fn test_bearer_header_and_redaction() {
        let auth = AuthKind::Bearer("ghs_secret".to_string());
        assert_eq!(
            auth.http_header().as_deref(),
            Some("Authorization: Bearer ghs_secret")
        );
        assert_eq!(auth.redact("fatal: ghs_secret rejected"), "fatal: *** rejected");
        assert!(!format!("{auth:?}").contains("secret"));
    }
}
