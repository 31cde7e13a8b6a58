//! Generated-key credential source.
//!
//! Each key character is derived from 8 fresh entropy bytes `r` as
//! `b'!' + ((r * KEY_MULTIPLIER) ^ seed) % 94`, which keeps keys inside the
//! printable ASCII range `!`..=`~`. This is a reversible transform of the
//! random input, not a KDF.

use core::fmt;
use std::time::Instant;

use zeroize::Zeroizing;

use crate::codec::{ct_eq, SubmissionTransform};
use crate::entropy::{EntropyError, SharedEntropy};

/// Odd 64-bit multiplier applied to each random draw.
pub const KEY_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

/// First printable ASCII character.
pub const PRINTABLE_FIRST: u8 = b'!';

/// Number of printable characters from `!` to `~`.
pub const PRINTABLE_RANGE: u64 = 94;

const DRAW_LEN: usize = 8;

/// The most recently generated key of a slot. Wiped on drop.
#[derive(Default)]
pub struct GeneratedKey {
    key: Zeroizing<Vec<u8>>,
    issued_at: Option<Instant>,
}

impl fmt::Debug for GeneratedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKey")
            .field("key", &format_args!("<{} bytes redacted>", self.key.len()))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl GeneratedKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key has been issued yet.
    pub fn is_issued(&self) -> bool {
        !self.key.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// When the stored key was generated.
    pub fn issued_at(&self) -> Option<Instant> {
        self.issued_at
    }

    /// Replaces the stored key with a fresh one of `len` characters.
    ///
    /// On entropy failure the previous key is left in place.
    pub fn regenerate(
        &mut self,
        len: usize,
        seed: u64,
        entropy: &SharedEntropy,
    ) -> Result<(), EntropyError> {
        let mut draws = Zeroizing::new(vec![0u8; len * DRAW_LEN]);
        entropy.fill(&mut draws)?;

        let mut key = Zeroizing::new(Vec::with_capacity(len));
        for chunk in draws.chunks_exact(DRAW_LEN) {
            let mut raw = [0u8; DRAW_LEN];
            raw.copy_from_slice(chunk);
            key.push(fold_char(u64::from_le_bytes(raw), seed));
        }
        self.key = key;
        self.issued_at = Some(Instant::now());
        Ok(())
    }

    /// Compares a submission against the stored key after undoing
    /// `transform`.
    pub fn matches(&self, submitted: &[u8], seed: u64, transform: SubmissionTransform) -> bool {
        let unfolded = Zeroizing::new(transform.fold(submitted, seed));
        self.is_issued() && ct_eq(&self.key, &unfolded)
    }
}

#[inline(always)]
fn fold_char(random: u64, seed: u64) -> u8 {
    let v = (random.wrapping_mul(KEY_MULTIPLIER) ^ seed) % PRINTABLE_RANGE;
    PRINTABLE_FIRST + v as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::EntropySource;

    struct MockEntropy {
        counter: u8,
    }

    impl EntropySource for MockEntropy {
        fn name(&self) -> &'static str { "Mock" }
        fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
            for byte in dest.iter_mut() {
                *byte = self.counter;
                self.counter = self.counter.wrapping_add(1);
            }
            Ok(())
        }
    }

    struct Broken;

    impl EntropySource for Broken {
        fn name(&self) -> &'static str { "Broken" }
        fn fill(&mut self, _dest: &mut [u8]) -> Result<(), EntropyError> {
            Err(EntropyError::CollectionFailed)
        }
    }

    fn mock() -> SharedEntropy {
        SharedEntropy::new(Box::new(MockEntropy { counter: 0 }))
    }

    #[test]
    fn test_key_is_printable_and_sized() {
        let entropy = mock();
        let mut key = GeneratedKey::new();
        assert!(!key.is_issued());
        key.regenerate(16, 0xDEAD_BEEF, &entropy).unwrap();
        assert_eq!(key.as_bytes().len(), 16);
        assert!(key.as_bytes().iter().all(|&c| (b'!'..=b'~').contains(&c)));
    }

    #[test]
    fn test_fold_char_formula() {
        let r = 0x0102_0304_0506_0708u64;
        let seed = 42;
        let expected = b'!' + ((r.wrapping_mul(KEY_MULTIPLIER) ^ seed) % 94) as u8;
        assert_eq!(fold_char(r, seed), expected);
        assert_eq!(fold_char(0, 0), b'!');
    }

    #[test]
    fn test_successive_keys_differ() {
        let entropy = SharedEntropy::default();
        let mut key = GeneratedKey::new();
        key.regenerate(16, 7, &entropy).unwrap();
        let first = key.as_bytes().to_vec();
        key.regenerate(16, 7, &entropy).unwrap();
        assert_ne!(first, key.as_bytes());
        assert!(!key.matches(&first, 7, SubmissionTransform::Direct));
    }

    #[test]
    fn test_matches_with_transform() {
        let entropy = mock();
        let seed = 0x1122_3344_5566_7788;
        let mut key = GeneratedKey::new();
        key.regenerate(12, seed, &entropy).unwrap();
        let plain = key.as_bytes().to_vec();
        let folded = SubmissionTransform::XorFold.fold(&plain, seed);

        assert!(key.matches(&plain, seed, SubmissionTransform::Direct));
        assert!(key.matches(&folded, seed, SubmissionTransform::XorFold));
        assert!(!key.matches(&plain, seed, SubmissionTransform::XorFold));
    }

    #[test]
    fn test_entropy_failure_keeps_previous_key() {
        let mut key = GeneratedKey::new();
        key.regenerate(4, 0, &mock()).unwrap();
        let before = key.as_bytes().to_vec();
        let broken = SharedEntropy::new(Box::new(Broken));
        assert_eq!(key.regenerate(4, 0, &broken), Err(EntropyError::CollectionFailed));
        assert_eq!(key.as_bytes(), &before[..]);
    }

    #[test]
    fn test_debug_redacts_key() {
        let mut key = GeneratedKey::new();
        key.regenerate(16, 3, &mock()).unwrap();
        let plain = String::from_utf8(key.as_bytes().to_vec()).unwrap();
        let shown = format!("{:?}", key);
        assert!(!shown.contains(&plain));
        assert!(shown.contains("16 bytes redacted"));
        assert!(key.issued_at().is_some());
    }

    #[test]
    fn test_unissued_key_never_matches() {
        let key = GeneratedKey::new();
        assert!(!key.matches(b"", 0, SubmissionTransform::Direct));
    }
}
