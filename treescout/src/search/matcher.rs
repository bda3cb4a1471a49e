use memchr::memmem;
use tracing::trace;

/// Bytes that separate tokens within a line
pub const DELIMITERS: &[u8] = b" ,.-";

/// Counts needle occurrences inside the tokens of a line.
///
/// A line is split on [`DELIMITERS`] and each token is searched on its own, so a needle that
/// itself contains a delimiter can never match. Every non-overlapping occurrence inside a
/// token counts: the token `ababab` holds the needle `ab` three times.
#[derive(Debug, Clone)]
pub struct NeedleMatcher {
    finder: memmem::Finder<'static>,
}

impl NeedleMatcher {
    /// Creates a matcher for the given needle.
    ///
    /// The needle must not be empty; the engine validates this before any matcher is built.
    pub fn new(needle: impl AsRef<[u8]>) -> Self {
        let needle = needle.as_ref();
        debug_assert!(!needle.is_empty(), "needle must not be empty");
        Self {
            finder: memmem::Finder::new(needle).into_owned(),
        }
    }

    /// Splits a line into non-empty tokens
    pub fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> {
        line.split(|b| DELIMITERS.contains(b))
            .filter(|token| !token.is_empty())
    }

    /// Counts non-overlapping needle occurrences within one token
    pub fn count_in_token(&self, token: &[u8]) -> u64 {
        if self.finder.needle().is_empty() || token.len() < self.finder.needle().len() {
            return 0;
        }
        self.finder.find_iter(token).count() as u64
    }

    /// Counts needle occurrences across all tokens of a line
    pub fn count_in_line(&self, line: &[u8]) -> u64 {
        let count: u64 = Self::tokens(line)
            .map(|token| self.count_in_token(token))
            .sum();
        if count > 0 {
            trace!(
                "Found {} occurrence(s) in line: {}",
                count,
                String::from_utf8_lossy(line)
            );
        }
        count
    }
}
