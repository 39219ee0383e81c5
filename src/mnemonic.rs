//! Mnemonic - 12-word BIP39 phrases (English word list) and phrase → seed.
//!
//! Entropy comes straight from the OS CSPRNG. Words are checked against the
//! word list before the checksum so callers can point at the first bad word.
//!
//! Reference: https://github.com/bitcoin/bips/blob/master/bip-0039.mediawiki

use bip39::Language;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Words per phrase. 12 words = 128 bits entropy + 4 bits checksum.
pub const WORD_COUNT: usize = 12;

const ENTROPY_BYTES: usize = 16;

/// Errors from the mnemonic engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MnemonicError {
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),

    /// `position` is 1-based.
    #[error("Invalid mnemonic: unknown word '{word}' at position {position}")]
    UnknownWord { position: usize, word: String },

    #[error("Invalid mnemonic: expected {expected} words, got {got}")]
    BadWordCount { expected: usize, got: usize },

    #[error("Invalid mnemonic: checksum mismatch")]
    ChecksumMismatch,
}

impl MnemonicError {
    /// True for user-input problems (re-prompt), false for the fatal entropy failure.
    pub fn is_invalid_mnemonic(&self) -> bool {
        !matches!(self, MnemonicError::EntropyUnavailable(_))
    }
}

/// A validated 12-word phrase. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic {
    inner: bip39::Mnemonic,
}

impl Mnemonic {
    /// Draw 128 bits from the OS RNG and encode them as a fresh phrase.
    pub fn generate() -> Result<Self, MnemonicError> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        OsRng
            .try_fill_bytes(&mut entropy)
            .map_err(|e| MnemonicError::EntropyUnavailable(e.to_string()))?;

        let inner = bip39::Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| MnemonicError::EntropyUnavailable(e.to_string()));
        entropy.zeroize();

        Ok(Self { inner: inner? })
    }

    /// Validate an already-split word sequence.
    ///
    /// Checks, in order: every word is in the list, the count is 12, the checksum matches.
    pub fn validate<S: AsRef<str>>(words: &[S]) -> Result<Self, MnemonicError> {
        for (i, word) in words.iter().enumerate() {
            let word = word.as_ref();
            if Language::English.find_word(word).is_none() {
                return Err(MnemonicError::UnknownWord { position: i + 1, word: word.to_string() });
            }
        }

        if words.len() != WORD_COUNT {
            return Err(MnemonicError::BadWordCount { expected: WORD_COUNT, got: words.len() });
        }

        let phrase = words.iter().map(|w| w.as_ref()).collect::<Vec<_>>().join(" ");
        match bip39::Mnemonic::parse_in_normalized(Language::English, &phrase) {
            Ok(inner) => Ok(Self { inner }),
            Err(bip39::Error::UnknownWord(i)) => Err(MnemonicError::UnknownWord {
                position: i + 1,
                word: words.get(i).map(|w| w.as_ref().to_string()).unwrap_or_default(),
            }),
            Err(bip39::Error::BadWordCount(got)) => {
                Err(MnemonicError::BadWordCount { expected: WORD_COUNT, got })
            }
            Err(_) => Err(MnemonicError::ChecksumMismatch),
        }
    }

    /// Parse a raw user string: any whitespace separates words, case is ignored.
    pub fn parse(phrase: &str) -> Result<Self, MnemonicError> {
        let words: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
        Self::validate(&words)
    }

    /// Space-separated phrase. Treat as secret.
    pub fn phrase(&self) -> String {
        self.inner.to_string()
    }

    pub fn words(&self) -> Vec<&'static str> {
        self.inner.words().collect()
    }

    /// BIP39 seed (PBKDF2-HMAC-SHA512, 2048 rounds). Same inputs, same seed.
    pub fn to_seed(&self, passphrase: &str) -> Seed {
        Seed(self.inner.to_seed_normalized(passphrase))
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mnemonic({} words, redacted)", self.inner.word_count())
    }
}

/// 64-byte BIP39 seed, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(redacted)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_12_words() {
        let m = Mnemonic::generate().unwrap();
        assert_eq!(m.words().len(), WORD_COUNT);
        assert!(Mnemonic::parse(&m.phrase()).is_ok());
    }

    #[test]
    fn test_generate_is_random() {
        let a = Mnemonic::generate().unwrap();
        let b = Mnemonic::generate().unwrap();
        assert_ne!(a.phrase(), b.phrase());
    }

    #[test]
    fn test_parse_normalizes_input() {
        let messy = format!("  {}  ", TEST_MNEMONIC.to_uppercase().replace(' ', "\t "));
        let m = Mnemonic::parse(&messy).unwrap();
        assert_eq!(m.phrase(), TEST_MNEMONIC);
    }

    #[test]
    fn test_unknown_word_reports_first_offender() {
        let words = ["abandon", "abandon", "bitcoinz", "notaword", "abandon", "abandon",
                     "abandon", "abandon", "abandon", "abandon", "abandon", "about"];
        let err = Mnemonic::validate(&words).unwrap_err();
        assert_eq!(err, MnemonicError::UnknownWord { position: 3, word: "bitcoinz".into() });
        assert!(err.is_invalid_mnemonic());
    }

    #[test]
    fn test_word_count_enforced() {
        let err = Mnemonic::parse("abandon abandon abandon").unwrap_err();
        assert_eq!(err, MnemonicError::BadWordCount { expected: 12, got: 3 });

        // Valid 24-word phrase is still rejected: the wallet is fixed at 12
        let long = format!("{} {}", "abandon ".repeat(23).trim(), "art");
        assert!(matches!(
            Mnemonic::parse(&long),
            Err(MnemonicError::BadWordCount { got: 24, .. })
        ));
    }

    #[test]
    fn test_checksum_mismatch() {
        let err = Mnemonic::parse(&"abandon ".repeat(12)).unwrap_err();
        assert_eq!(err, MnemonicError::ChecksumMismatch);
    }

    #[test]
    fn test_seed_known_vector() {
        // BIP39 reference vector (passphrase "TREZOR")
        let m = Mnemonic::parse(TEST_MNEMONIC).unwrap();
        let seed = m.to_seed("TREZOR");
        assert_eq!(
            hex::encode(seed.as_bytes()),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn test_seed_deterministic() {
        let m1 = Mnemonic::parse(TEST_MNEMONIC).unwrap();
        let m2 = Mnemonic::parse(TEST_MNEMONIC).unwrap();
        assert_eq!(m1.to_seed("").as_bytes(), m2.to_seed("").as_bytes());
        assert_ne!(m1.to_seed("").as_bytes(), m1.to_seed("x").as_bytes());
    }

    #[test]
    fn test_debug_is_redacted() {
        let m = Mnemonic::parse(TEST_MNEMONIC).unwrap();
        let dbg = format!("{:?} {:?}", m, m.to_seed(""));
        assert!(!dbg.contains("abandon"));
        assert!(dbg.contains("redacted"));
    }
}
