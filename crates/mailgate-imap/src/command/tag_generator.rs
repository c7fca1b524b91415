//! Command tag generator.

/// Generates sequential tags `A0001`, `A0002`, ... for one connection.
///
/// The counter wraps instead of overflowing; tags only need to be unique
/// among commands in flight, and this client has at most one.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Returns the next tag.
    pub fn next_tag(&mut self) -> String {
        self.counter = self.counter.wrapping_add(1);
        format!("{}{:04}", self.prefix, self.counter)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_sequential() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next_tag(), "A0001");
        assert_eq!(tags.next_tag(), "A0002");
    }

    #[test]
    fn custom_prefix() {
        let mut tags = TagGenerator::new('M');
        assert_eq!(tags.next_tag(), "M0001");
    }

    #[test]
    fn wraps_without_panicking() {
        let mut tags = TagGenerator {
            counter: u32::MAX,
            prefix: 'A',
        };
        assert_eq!(tags.next_tag(), "A0000");
        assert_eq!(tags.next_tag(), "A0001");
    }

    #[test]
    fn wide_counters_are_not_truncated() {
        let mut tags = TagGenerator {
            counter: 12_344,
            prefix: 'A',
        };
        assert_eq!(tags.next_tag(), "A12345");
    }
}
