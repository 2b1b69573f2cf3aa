//! Bearer secrets for the write surface.
//!
//! Secrets are injected at construction, never read from ambient process
//! state, so tests can supply distinct values per case. Comparison hashes
//! both sides and uses a constant-time equality check.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// A configured bearer secret.
///
/// Fail closed: an unset or empty secret matches nothing, so a deployment
/// without the secret configured rejects every request rather than
/// accepting all of them.
#[derive(Clone)]
pub struct SecretToken {
    digest: Option<[u8; 32]>,
}

impl SecretToken {
    pub fn new(secret: Option<String>) -> Self {
        let digest = secret
            .filter(|value| !value.is_empty())
            .map(|value| hash(value.as_bytes()));
        Self { digest }
    }

    /// Whether the presented bearer token equals the configured secret.
    pub fn matches(&self, presented: Option<&str>) -> bool {
        let (Some(expected), Some(presented)) = (self.digest.as_ref(), presented) else {
            return false;
        };
        let presented = hash(presented.as_bytes());
        expected.ct_eq(&presented).unwrap_u8() == 1
    }
}

fn hash(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_token_is_accepted() {
        let secret = SecretToken::new(Some("s3cret".to_string()));
        assert!(secret.matches(Some("s3cret")));
        assert!(!secret.matches(Some("s3cret ")));
        assert!(!secret.matches(Some("other")));
        assert!(!secret.matches(None));
    }

    #[test]
    fn unset_secret_fails_closed() {
        let secret = SecretToken::new(None);
        assert!(!secret.matches(Some("anything")));
        assert!(!secret.matches(Some("")));
        assert!(!secret.matches(None));
    }

    #[test]
    fn empty_secret_fails_closed() {
        let secret = SecretToken::new(Some(String::new()));
        assert!(!secret.matches(Some("")));
        assert!(!secret.matches(Some("anything")));
    }
}
