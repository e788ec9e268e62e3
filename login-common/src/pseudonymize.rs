use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

/// A per-field secret appended to values before hashing.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt(String);

impl Salt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Salts end up in config structs that may be logged.
impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt(<redacted>)")
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct EmptySaltError;

impl fmt::Display for EmptySaltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "salt must not be empty")
    }
}

impl FromStr for Salt {
    type Err = EmptySaltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(EmptySaltError)
        } else {
            Ok(Salt(s.to_owned()))
        }
    }
}

/// Hash `value` followed by `salt` with SHA-256 and return the lowercase hex digest.
pub fn pseudonymize(value: &str, salt: &Salt) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.update(salt.as_str().as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salt(s: &str) -> Salt {
        s.parse().expect("non-empty salt")
    }

    #[test]
    fn test_pseudonymize_is_deterministic() {
        let salt = salt("30");
        let hashed = pseudonymize("127.0.0.1", &salt);
        let hashed_again = pseudonymize("127.0.0.1", &salt);

        assert_eq!(hashed, hashed_again);
        assert_ne!(hashed, "127.0.0.1");
        assert_eq!(hashed.len(), 64);
        assert!(hashed
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_pseudonymize_known_digest() {
        // sha256("abc"), the value is hashed with the salt appended.
        assert_eq!(
            pseudonymize("ab", &salt("c")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_pseudonymize_distinct_inputs() {
        let salt = salt("s1");
        let digests: std::collections::HashSet<String> = (0..1000)
            .map(|i| pseudonymize(&format!("10.0.{}.{}", i / 256, i % 256), &salt))
            .collect();

        assert_eq!(digests.len(), 1000);
    }

    #[test]
    fn test_pseudonymize_salt_scopes_digest() {
        assert_ne!(
            pseudonymize("device123", &salt("s1")),
            pseudonymize("device123", &salt("s2"))
        );
    }

    #[test]
    fn test_salt_parsing() {
        assert_eq!("".parse::<Salt>(), Err(EmptySaltError));
        assert_eq!(salt("pepper").as_str(), "pepper");
        assert_eq!(format!("{:?}", salt("pepper")), "Salt(<redacted>)");
    }
}
