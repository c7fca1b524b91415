//! Command tags and message sequence numbers.

use std::num::NonZeroU32;
use std::str::FromStr;

/// IMAP command tag.
///
/// The server echoes the tag on the completion response of the command it
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    /// Creates a new tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message sequence number.
///
/// Numbers start at 1 and shift down when earlier messages are expunged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNum(pub NonZeroU32);

impl SeqNum {
    /// Creates a sequence number, or `None` for 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for SeqNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SeqNum {
    type Err = std::num::ParseIntError;

    /// Parses a decimal sequence number; `"0"` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<NonZeroU32>().map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_sequence_number() {
        assert!(SeqNum::new(0).is_none());
        assert!("0".parse::<SeqNum>().is_err());
    }

    #[test]
    fn parse_from_message_id() {
        let seq: SeqNum = "42".parse().unwrap();
        assert_eq!(seq.get(), 42);
        assert_eq!(seq.to_string(), "42");
        assert!("abc".parse::<SeqNum>().is_err());
        assert!("-1".parse::<SeqNum>().is_err());
    }

    #[test]
    fn ordering() {
        assert!(SeqNum::new(2).unwrap() < SeqNum::new(10).unwrap());
    }

    #[test]
    fn tag_display() {
        assert_eq!(Tag::new("A0001").to_string(), "A0001");
    }
}
