use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of a phrase for invalidation purposes.
///
/// First 64 bits of SHA-256 over the trimmed phrase. Not used for anything
/// security-related; collisions only cost a missed invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhraseHash(u64);

impl PhraseHash {
    /// Hash a phrase, ignoring surrounding whitespace.
    pub fn of(phrase: &str) -> Self {
        let digest = Sha256::digest(phrase.trim().as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(prefix))
    }

    /// Raw value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PhraseHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::str::FromStr for PhraseHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16)
            .map(PhraseHash)
            .map_err(|e| format!("Invalid phrase hash {}: {}", s, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_ignores_surrounding_whitespace() {
        assert_eq!(
            PhraseHash::of("Der Patient ist bewusstlos."),
            PhraseHash::of("  Der Patient ist bewusstlos.\n")
        );
    }

    #[test]
    fn test_hash_distinguishes_content() {
        assert_ne!(
            PhraseHash::of("Der Patient ist bewusstlos."),
            PhraseHash::of("Die Patientin ist bewusstlos.")
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        // SHA-256("") starts with e3b0c44298fc1c14
        assert_eq!(PhraseHash::of("").to_string(), "e3b0c44298fc1c14");
        assert_eq!(PhraseHash::of("   ").value(), 0xe3b0c44298fc1c14);
    }

    #[test]
    fn test_display_parse() {
        let hash = PhraseHash::of("Der Patient ist bewusstlos.");
        let parsed: PhraseHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
        assert!("xyz".parse::<PhraseHash>().is_err());
    }
}
