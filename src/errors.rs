//! Typed error definitions for block and feed operations.
//!
//! NO PANICS in decode/verify/append paths reachable with attacker-controlled
//! bytes - all errors are typed and recoverable.

use thiserror::Error;

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors raised by block codec and feed operations. Never a panic substitute -
/// every variant here corresponds to a documented failure mode of the wire
/// format or the feed invariants, not an internal bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("unknown header type 0x{tag:02x} at offset {offset}")]
    UnknownHeader { tag: u8, offset: usize },

    #[error("duplicate header type 0x{tag:02x} at offset {offset}")]
    DuplicateHeader { tag: u8, offset: usize },

    #[error("signature verification failed")]
    VerifyFailed,

    #[error("malformed block: {0}")]
    DecodeGeneric(String),

    #[error("feed is full: sequence counter would overflow u16")]
    FeedFull,

    #[error("allocation refused: requested {requested} bytes exceeds ceiling {ceiling}")]
    AllocFailed { requested: usize, ceiling: usize },

    #[error("cannot encode a block with an empty body")]
    EmptyBody,
}

impl FeedError {
    /// Stable error code, useful for logging and cross-language test vectors.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownHeader { .. } => "EUNKHDR",
            Self::DuplicateHeader { .. } => "EDUPHDR",
            Self::VerifyFailed => "EVERFAIL",
            Self::DecodeGeneric(_) => "EFAILED",
            Self::FeedFull => "EFEEDFULL",
            Self::AllocFailed { .. } => "EALLOC",
            Self::EmptyBody => "EEMPTYBODY",
        }
    }
}

/// Outcome of comparing two feeds. Not an error type - `Diverged` and
/// `Unrelated` are structural results a caller branches on, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Feeds contain the same blocks.
    Equal,
    /// A has `n` blocks B does not share.
    AAheadBy(u32),
    /// B has `n` blocks A does not share.
    ABehindBy(u32),
    /// Feeds share a common ancestor but then disagree.
    Diverged,
    /// Feeds share no ancestry at all.
    Unrelated,
}

impl DiffOutcome {
    /// Signed delta matching the C ancestor's convention: negative when A
    /// holds more unshared blocks, positive when B does, zero when equal.
    /// Returns `None` for `Diverged`/`Unrelated`, which carry no block count.
    pub fn delta(&self) -> Option<i64> {
        match *self {
            Self::Equal => Some(0),
            Self::AAheadBy(n) => Some(-(n as i64)),
            Self::ABehindBy(n) => Some(n as i64),
            Self::Diverged | Self::Unrelated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(FeedError::VerifyFailed.code(), "EVERFAIL");
        assert_eq!(
            FeedError::UnknownHeader { tag: 0x99, offset: 64 }.code(),
            "EUNKHDR"
        );
        assert_eq!(
            FeedError::DuplicateHeader { tag: 0x10, offset: 64 }.code(),
            "EDUPHDR"
        );
    }

    #[test]
    fn diff_outcome_delta_matches_convention() {
        assert_eq!(DiffOutcome::Equal.delta(), Some(0));
        assert_eq!(DiffOutcome::AAheadBy(3).delta(), Some(-3));
        assert_eq!(DiffOutcome::ABehindBy(2).delta(), Some(2));
        assert_eq!(DiffOutcome::Diverged.delta(), None);
        assert_eq!(DiffOutcome::Unrelated.delta(), None);
    }
}
