//! Password-list credential source.

use std::time::Instant;

use zeroize::Zeroizing;

use crate::codec::ct_eq;
use crate::error::OtpError;

/// Per-slot position in the shared password list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListCursor {
    cursor: Option<usize>,
    issued_at: Option<Instant>,
}

impl ListCursor {
    /// A cursor that has not issued anything yet.
    pub fn new() -> Self {
        Self { cursor: None, issued_at: None }
    }

    pub fn position(&self) -> Option<usize> {
        self.cursor
    }

    /// When the entry under the cursor was issued.
    pub fn issued_at(&self) -> Option<Instant> {
        self.issued_at
    }

    /// Moves to the next entry, wrapping at the end of the list.
    ///
    /// # Errors
    /// `Unavailable` if the list is empty.
    pub fn advance(&mut self, list: &[Zeroizing<String>]) -> Result<usize, OtpError> {
        if list.is_empty() {
            return Err(OtpError::Unavailable);
        }
        let next = match self.cursor {
            None => 0,
            Some(c) => (c + 1) % list.len(),
        };
        self.cursor = Some(next);
        self.issued_at = Some(Instant::now());
        Ok(next)
    }

    /// The entry under the cursor, or `None` if nothing was issued or the
    /// list has shrunk below the cursor since.
    pub fn current<'a>(&self, list: &'a [Zeroizing<String>]) -> Option<&'a [u8]> {
        self.cursor
            .and_then(|c| list.get(c))
            .map(|p| p.as_bytes())
    }

    /// Exact comparison against the current entry.
    pub fn matches(&self, list: &[Zeroizing<String>], submitted: &[u8]) -> Result<bool, OtpError> {
        let expected = self.current(list).ok_or(OtpError::InvalidState)?;
        Ok(ct_eq(expected, submitted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::password_list;

    fn list(items: &[&str]) -> Vec<Zeroizing<String>> {
        password_list(items.iter().map(|s| s.to_string()).collect()).to_vec()
    }

    #[test]
    fn test_cycles_in_order_and_wraps() {
        let l = list(&["a", "bb", "ccc"]);
        let mut cursor = ListCursor::new();
        let visited: Vec<usize> = (0..7).map(|_| cursor.advance(&l).unwrap()).collect();
        assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_empty_list_is_unavailable() {
        let mut cursor = ListCursor::new();
        assert_eq!(cursor.advance(&[]), Err(OtpError::Unavailable));
        assert_eq!(cursor.position(), None);
        assert_eq!(cursor.issued_at(), None);
    }

    #[test]
    fn test_current_after_shrink() {
        let long = list(&["a", "b", "c"]);
        let short = list(&["x"]);
        let mut cursor = ListCursor::new();
        cursor.advance(&long).unwrap();
        cursor.advance(&long).unwrap();
        assert_eq!(cursor.current(&long), Some(&b"b"[..]));
        assert_eq!(cursor.current(&short), None);
        assert_eq!(cursor.matches(&short, b"b"), Err(OtpError::InvalidState));

        // Next advance wraps back into range.
        assert_eq!(cursor.advance(&short), Ok(0));
    }

    #[test]
    fn test_advance_stamps_issue_time() {
        let l = list(&["a", "b"]);
        let mut cursor = ListCursor::new();
        let before = Instant::now();
        cursor.advance(&l).unwrap();
        let first = cursor.issued_at().unwrap();
        assert!(first >= before);
        cursor.advance(&l).unwrap();
        assert!(cursor.issued_at().unwrap() >= first);
    }

    #[test]
    fn test_matches() {
        let l = list(&["secret"]);
        let mut cursor = ListCursor::new();
        assert_eq!(cursor.matches(&l, b"secret"), Err(OtpError::InvalidState));
        cursor.advance(&l).unwrap();
        assert_eq!(cursor.matches(&l, b"secret"), Ok(true));
        assert_eq!(cursor.matches(&l, b"secreT"), Ok(false));
    }
}
