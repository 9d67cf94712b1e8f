//! Bearer-token credentials.
//!
//! Tokens are opaque to the routing engine: it only asks a
//! [`CredentialValidator`] whether a presented secret is good.

use rand::RngCore;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::RwLock;
use subtle::ConstantTimeEq;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::lock_utils::{read_lock_or_recover, write_lock_or_recover};

/// Random bytes per issued token (rendered as twice as many hex chars)
pub const TOKEN_BYTES: usize = 32;

/// A bearer secret. Wiped from memory when dropped and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Decides whether a presented secret is a valid credential
pub trait CredentialValidator: Send + Sync {
    fn validate(&self, secret: &Secret) -> bool;
}

impl<F> CredentialValidator for F
where
    F: Fn(&Secret) -> bool + Send + Sync,
{
    fn validate(&self, secret: &Secret) -> bool {
        self(secret)
    }
}

/// In-memory set of issued tokens
#[derive(Default)]
pub struct TokenRegistry {
    tokens: RwLock<Vec<Secret>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate, register and return a fresh random token
    pub fn issue(&self) -> Secret {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = Secret::new(hex::encode(bytes));
        bytes.zeroize();

        self.add(token.clone());
        token
    }

    /// Register an externally provisioned token
    pub fn add(&self, token: Secret) {
        write_lock_or_recover(&self.tokens, "token registry").push(token);
    }

    pub fn len(&self) -> usize {
        read_lock_or_recover(&self.tokens, "token registry").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialValidator for TokenRegistry {
    /// Compares against every registered token without short-circuiting
    fn validate(&self, secret: &Secret) -> bool {
        let presented = secret.expose().as_bytes();
        let tokens = read_lock_or_recover(&self.tokens, "token registry");

        let mut matched = false;
        for token in tokens.iter() {
            let known = token.expose().as_bytes();
            let equal = known.len() == presented.len() && bool::from(known.ct_eq(presented));
            matched |= equal;
        }
        matched
    }
}

/// Extract the secret from an `Authorization: Bearer <token>` header value
pub fn parse_bearer(header: &str) -> Option<Secret> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(Secret::new(token))
}

/// Write a token to `path`, readable only by the owner on unix
pub fn write_token_file<P: AsRef<Path>>(path: P, token: &Secret) -> anyhow::Result<()> {
    let path = path.as_ref();
    fs::write(path, token.expose())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    info!("Credential written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_shape() {
        let registry = TokenRegistry::new();
        let token = registry.issue();

        assert_eq!(token.expose().len(), TOKEN_BYTES * 2);
        assert!(token.expose().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_tokens_are_unique() {
        let registry = TokenRegistry::new();
        let a = registry.issue();
        let b = registry.issue();
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate() {
        let registry = TokenRegistry::new();
        let token = registry.issue();

        assert!(registry.validate(&token));
        assert!(!registry.validate(&Secret::new("not-a-token")));
        assert!(!registry.validate(&Secret::new(&token.expose()[..10])));
        assert!(!TokenRegistry::new().validate(&token));
    }

    #[test]
    fn test_debug_hides_secret() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc123").unwrap().expose(), "abc123");
        assert_eq!(parse_bearer("bearer  abc123 ").unwrap().expose(), "abc123");
        assert!(parse_bearer("Basic abc123").is_none());
        assert!(parse_bearer("Bearer ").is_none());
        assert!(parse_bearer("abc123").is_none());
    }

    #[test]
    fn test_write_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creator_token.txt");
        let token = Secret::new("deadbeef");

        write_token_file(&path, &token).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "deadbeef");
    }
}
