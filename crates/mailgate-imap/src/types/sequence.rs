//! Sequence sets for message ranges.

use super::SeqNum;

/// Sequence set for specifying message ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// Single sequence number.
    Single(SeqNum),
    /// Range of sequence numbers (inclusive).
    Range(SeqNum, SeqNum),
    /// Range from start to end of mailbox.
    RangeFrom(SeqNum),
    /// All messages (*).
    All,
    /// Multiple sequence specifications.
    Set(Vec<Self>),
}

impl SequenceSet {
    /// Creates a sequence set from a single number.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        SeqNum::new(n).map(Self::Single)
    }

    /// Creates a range sequence set.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        Some(Self::Range(SeqNum::new(start)?, SeqNum::new(end)?))
    }

    /// Builds a compact set from arbitrary numbers, merging consecutive runs.
    ///
    /// Returns `None` when `numbers` is empty, since IMAP has no empty set.
    #[must_use]
    pub fn from_numbers(numbers: &[SeqNum]) -> Option<Self> {
        let mut sorted = numbers.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut parts = Vec::new();
        let mut iter = sorted.into_iter();
        let mut start = iter.next()?;
        let mut end = start;
        for n in iter {
            if n.get() == end.get() + 1 {
                end = n;
            } else {
                parts.push(Self::span(start, end));
                start = n;
                end = n;
            }
        }
        parts.push(Self::span(start, end));

        if parts.len() == 1 {
            parts.pop()
        } else {
            Some(Self::Set(parts))
        }
    }

    const fn span(start: SeqNum, end: SeqNum) -> Self {
        if start.get() == end.get() {
            Self::Single(start)
        } else {
            Self::Range(start, end)
        }
    }
}

impl std::fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => write!(f, "*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn seqs(ns: &[u32]) -> Vec<SeqNum> {
        ns.iter().map(|n| SeqNum::new(*n).unwrap()).collect()
    }

    #[test]
    fn display_forms() {
        assert_eq!(SequenceSet::single(1).unwrap().to_string(), "1");
        assert_eq!(SequenceSet::range(1, 10).unwrap().to_string(), "1:10");
        assert_eq!(
            SequenceSet::RangeFrom(SeqNum::new(5).unwrap()).to_string(),
            "5:*"
        );
        assert_eq!(SequenceSet::All.to_string(), "*");
        assert!(SequenceSet::single(0).is_none());
        assert!(SequenceSet::range(0, 3).is_none());
    }

    #[test]
    fn from_numbers_merges_runs() {
        let set = SequenceSet::from_numbers(&seqs(&[7, 3, 1, 2, 9, 8, 3])).unwrap();
        assert_eq!(set.to_string(), "1:3,7:9");
    }

    #[test]
    fn from_numbers_single() {
        let set = SequenceSet::from_numbers(&seqs(&[4])).unwrap();
        assert_eq!(set, SequenceSet::single(4).unwrap());
    }

    #[test]
    fn from_numbers_empty() {
        assert!(SequenceSet::from_numbers(&[]).is_none());
    }

    #[test]
    fn from_numbers_isolated() {
        let set = SequenceSet::from_numbers(&seqs(&[10, 2, 5])).unwrap();
        assert_eq!(set.to_string(), "2,5,10");
    }
}
