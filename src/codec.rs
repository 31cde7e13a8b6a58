#![forbid(unsafe_code)]
//! Credential codec: stateless comparison and slicing helpers.
//!
//! Nothing here touches slot state. Comparisons run in time proportional to
//! the credential length only, never to the position of the first
//! differing byte.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of bytes accepted in a single validation submission.
pub const MAX_SUBMISSION_LEN: usize = 4096;

/// Transform applied to a generated-mode submission before comparison.
///
/// `XorFold` XORs byte `i` with byte `i % 8` of the little-endian seed. The
/// fold is its own inverse, so a caller prepares a response with
/// [`SubmissionTransform::fold`] and the engine undoes it with the same call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SubmissionTransform {
    /// Submission is compared as-is.
    #[default]
    Direct,
    /// Submission is XOR-folded with the generation seed.
    XorFold,
}

impl SubmissionTransform {
    /// Applies the transform to `input`.
    pub fn fold(&self, input: &[u8], seed: u64) -> Vec<u8> {
        match self {
            SubmissionTransform::Direct => input.to_vec(),
            SubmissionTransform::XorFold => {
                let mask = seed.to_le_bytes();
                input
                    .iter()
                    .enumerate()
                    .map(|(i, &b)| b ^ mask[i % mask.len()])
                    .collect()
            }
        }
    }
}

/// Constant-time equality. Slices of different length compare unequal.
#[inline(always)]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Returns the window of `credential` starting at `offset`, at most `max_len`
/// bytes long. `None` once `offset` has reached the end.
pub fn read_window(credential: &[u8], offset: usize, max_len: usize) -> Option<&[u8]> {
    if offset >= credential.len() {
        return None;
    }
    let end = offset + max_len.min(credential.len() - offset);
    Some(&credential[offset..end])
}

/// Checks a submission length against the issued credential length.
pub fn length_matches(expected: usize, submitted: usize) -> bool {
    submitted <= MAX_SUBMISSION_LEN && submitted == expected
}
